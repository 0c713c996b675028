use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of arbitrary content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize a research topic for dedup hashing: lowercase, collapse
/// whitespace, strip punctuation that doesn't change meaning.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a keyword tag: lowercase, strip punctuation, trivial
/// singularization (trailing `s` on words longer than 3 chars, leaving
/// `-ss` endings alone).
pub fn normalize_tag(tag: &str) -> String {
    let cleaned: String = tag
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.len() > 3 && trimmed.ends_with('s') && !trimmed.ends_with("ss") {
        trimmed[..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extract the registrable-ish domain from a URL. Strips scheme, `www.`,
/// path, and port. Returns the input unchanged when it doesn't parse.
pub fn extract_domain(url: &str) -> String {
    let stripped = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or(url.trim());
    let host = stripped
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(stripped)
        .split(':')
        .next()
        .unwrap_or(stripped);
    host.strip_prefix("www.").unwrap_or(host).to_lowercase()
}

/// Lowercased character-trigram set similarity in [0, 1].
/// Used for key-point dedup across research sources.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return if a.trim().eq_ignore_ascii_case(b.trim()) {
            1.0
        } else {
            0.0
        };
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

fn trigrams(text: &str) -> std::collections::HashSet<[char; 3]> {
    let chars: Vec<char> = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    chars.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_normalization_is_stable() {
        assert_eq!(
            normalize_topic("AI in K-12  Education!"),
            normalize_topic("ai in k12 education")
        );
    }

    #[test]
    fn tag_singularization() {
        assert_eq!(normalize_tag("Schools"), "school");
        assert_eq!(normalize_tag("business"), "business");
        assert_eq!(normalize_tag("AI"), "ai");
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(
            extract_domain("https://www.psychologytoday.com/us/therapists/dc"),
            "psychologytoday.com"
        );
        assert_eq!(extract_domain("http://example.com:8080/x?y=1"), "example.com");
    }

    #[test]
    fn trigram_similarity_detects_near_duplicates() {
        let a = "School districts are adopting AI tutoring tools rapidly";
        let b = "School districts are adopting AI tutoring tools rapidly.";
        assert!(trigram_similarity(a, b) >= 0.85);

        let c = "Embassy staff rotations happen every three years";
        assert!(trigram_similarity(a, c) < 0.5);
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
