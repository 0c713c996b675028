//! Normalization of raw research output: key-point dedup across sources and
//! tag canonicalization.

use std::collections::HashSet;

use leadscout_common::{normalize_tag, trigram_similarity};

/// Similarity threshold above which two key points are the same point.
const KEY_POINT_SIMILARITY: f64 = 0.85;

/// Clip text to a byte budget without splitting a character. Provider
/// content regularly exceeds model context; every prompt builder and
/// summary field cuts through here so they all cut the same way.
pub fn clip_text(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = 0;
    for (i, c) in text.char_indices() {
        let next = i + c.len_utf8();
        if next > max_bytes {
            break;
        }
        end = next;
    }
    &text[..end]
}

/// Whether `point` is a near-duplicate of anything already kept.
pub fn is_duplicate_point(kept: &[String], point: &str) -> bool {
    kept.iter()
        .any(|existing| trigram_similarity(existing, point) >= KEY_POINT_SIMILARITY)
}

/// Merge key points across sources, dropping near-duplicates. First
/// occurrence wins so provider ordering stays visible in the output.
pub fn dedup_key_points<I: IntoIterator<Item = String>>(points: I) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();

    for point in points {
        let trimmed = point.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !is_duplicate_point(&kept, trimmed) {
            kept.push(trimmed.to_string());
        }
    }

    kept
}

/// Canonicalize tags: lowercase, strip punctuation, trivially singularize,
/// dedup preserving order. Single-character leftovers are dropped.
pub fn normalize_tags<I: IntoIterator<Item = String>>(tags: I) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for tag in tags {
        let normalized = normalize_tag(&tag);
        if normalized.len() < 2 {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }

    out
}

/// Derive tags from a topic plus the most frequent meaningful words in the
/// key points. Deterministic given inputs.
pub fn derive_tags(topic: &str, key_points: &[String]) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "the", "and", "for", "with", "that", "this", "are", "is", "of", "in", "to", "a", "an",
        "on", "as", "by", "from", "their", "have", "has", "will", "more", "its", "be", "or",
        "they", "can", "at", "it",
    ];

    let mut tags: Vec<String> = topic.split_whitespace().map(String::from).collect();

    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for point in key_points {
        for word in point.split_whitespace() {
            let cleaned = normalize_tag(word);
            if cleaned.len() >= 4 && !STOPWORDS.contains(&cleaned.as_str()) {
                *counts.entry(cleaned).or_insert(0) += 1;
            }
        }
    }

    let mut frequent: Vec<(String, usize)> =
        counts.into_iter().filter(|(_, n)| *n >= 2).collect();
    // BTreeMap iteration is alphabetical; sort by count desc with the
    // alphabetical order as a stable tiebreak.
    frequent.sort_by(|a, b| b.1.cmp(&a.1));
    tags.extend(frequent.into_iter().take(8).map(|(w, _)| w));

    normalize_tags(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_respects_char_boundaries() {
        let text = "résumé review";
        let clipped = clip_text(text, 3);
        assert!(clipped.len() <= 3);
        assert!(text.starts_with(clipped));
        assert_eq!(clip_text("short", 100), "short");
        assert_eq!(clip_text("abc", 0), "");
    }

    #[test]
    fn near_duplicate_key_points_collapse() {
        let points = vec![
            "School districts are rapidly adopting AI tutoring tools".to_string(),
            "School districts are rapidly adopting AI tutoring tools.".to_string(),
            "Embassy staff rotate postings every three years".to_string(),
        ];
        let deduped = dedup_key_points(points);
        assert_eq!(deduped.len(), 2);
        assert!(deduped[0].starts_with("School districts"));
    }

    #[test]
    fn first_occurrence_wins() {
        let base = "District technology leaders report accelerating AI tutoring adoption in classrooms";
        let points = vec![base.to_string(), format!("{base} today")];
        let deduped = dedup_key_points(points);
        assert_eq!(deduped, vec![base.to_string()]);
    }

    #[test]
    fn tags_are_lowercased_singularized_deduped() {
        let tags = vec![
            "Schools".to_string(),
            "school".to_string(),
            "EdTech!".to_string(),
            "x".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["school", "edtech"]);
    }

    #[test]
    fn derived_tags_start_with_topic_words() {
        let key_points = vec![
            "Tutoring platforms expand across districts".to_string(),
            "Tutoring outcomes improve with adaptive tools".to_string(),
        ];
        let tags = derive_tags("AI education", &key_points);
        assert!(tags.contains(&"ai".to_string()) || tags.contains(&"education".to_string()));
        assert!(tags.contains(&"tutoring".to_string()));
    }
}
