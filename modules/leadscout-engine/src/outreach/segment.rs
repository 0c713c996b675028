//! Deterministic prospect segmentation.
//!
//! Referral-network and thought-leadership are primary segments fitted to a
//! 50/50 target; stealth-founder is a small overlay (canonically 5%, a
//! config knob because source material disagrees between 5% and 10%) layered
//! on top of a primary assignment. Assignment is stable: affinity first,
//! ties by influence score descending then prospect id ascending.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use leadscout_common::types::{DiscoveredProspect, Segment};

#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    pub referral_share: f64,
    pub thought_leadership_share: f64,
    /// Overlay share. Canonical 0.05.
    pub stealth_founder_share: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            referral_share: 0.50,
            thought_leadership_share: 0.50,
            stealth_founder_share: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Primary segment per prospect id.
    pub assignments: Vec<(String, Segment)>,
    /// Prospect ids additionally targeted with stealth-founder outreach.
    pub stealth_overlay: Vec<String>,
    /// Counts as reported: primary buckets plus the overlay.
    pub counts: BTreeMap<String, usize>,
}

const REFERRAL_VOCAB: &[&str] = &[
    "therapist", "psychologist", "psychiatrist", "counselor", "clinical", "admissions",
    "treatment", "social worker", "school", "residential", "mental health",
];

const THOUGHT_VOCAB: &[&str] = &[
    "ceo", "founder", "executive", "director", "vp", "president", "superintendent", "educator",
    "teacher", "professor", "product", "edtech", "principal", "dean",
];

const STEALTH_VOCAB: &[&str] = &["founder", "investor", "angel", "venture", "stealth", "builder", "operator"];

const REFERRAL_CATEGORIES: &[&str] = &[
    "psychologists", "psychiatrists", "therapists", "treatment_centers", "private_schools",
    "school_counselors",
];

fn vocabulary_hits(text: &str, vocabulary: &[&str]) -> usize {
    let lower = text.to_lowercase();
    vocabulary.iter().filter(|term| lower.contains(*term)).count()
}

/// Affinity scores derived from role/category vocabulary. Deterministic.
fn affinities(prospect: &DiscoveredProspect) -> (f64, f64, f64) {
    let text = format!(
        "{} {} {}",
        prospect.job_title.as_deref().unwrap_or_default(),
        prospect.organization.as_deref().unwrap_or_default(),
        prospect.category,
    );

    let mut referral = vocabulary_hits(&text, REFERRAL_VOCAB) as f64;
    let thought = vocabulary_hits(&text, THOUGHT_VOCAB) as f64;
    let stealth = vocabulary_hits(&text, STEALTH_VOCAB) as f64;

    if REFERRAL_CATEGORIES.contains(&prospect.category.as_str()) {
        referral += 1.0;
    }

    (referral, thought, stealth)
}

/// Assign primary segments fitted to the configured ratio, preserving each
/// prospect's primary affinity where capacity allows, then mark the stealth
/// overlay.
pub fn segment_prospects(
    prospects: &[DiscoveredProspect],
    config: &SegmentationConfig,
) -> SegmentationResult {
    let n = prospects.len();
    let primary_total = config.referral_share + config.thought_leadership_share;
    let referral_target = if primary_total > 0.0 {
        ((n as f64) * config.referral_share / primary_total).round() as usize
    } else {
        n / 2
    };

    // Order by strength of preference so strongly-affiliated prospects claim
    // their bucket first; ties by influence desc then id asc keep the
    // assignment stable across runs.
    let mut ordered: Vec<(&DiscoveredProspect, f64, f64, f64)> = prospects
        .iter()
        .map(|p| {
            let (r, t, s) = affinities(p);
            (p, r, t, s)
        })
        .collect();
    ordered.sort_by(|a, b| {
        let pref_a = (a.1 - a.2).abs();
        let pref_b = (b.1 - b.2).abs();
        pref_b
            .partial_cmp(&pref_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.0.influence_score
                    .partial_cmp(&a.0.influence_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.0.prospect_id.cmp(&b.0.prospect_id))
    });

    let mut referral_count = 0usize;
    let mut assignments = Vec::with_capacity(n);

    for (prospect, referral, thought, _) in &ordered {
        let prefers_referral = referral >= thought;
        let referral_open = referral_count < referral_target;
        let thought_open = (assignments.len() - referral_count) < n - referral_target;

        let segment = if prefers_referral && referral_open {
            Segment::ReferralNetwork
        } else if !prefers_referral && thought_open {
            Segment::ThoughtLeadership
        } else if referral_open {
            Segment::ReferralNetwork
        } else {
            Segment::ThoughtLeadership
        };

        if segment == Segment::ReferralNetwork {
            referral_count += 1;
        }
        assignments.push((prospect.prospect_id.clone(), segment));
    }

    // Stealth overlay: the top share by stealth affinity.
    let overlay_target = ((n as f64) * config.stealth_founder_share).round() as usize;
    let mut stealth_ranked: Vec<(&DiscoveredProspect, f64)> =
        ordered.iter().map(|(p, _, _, s)| (*p, *s)).collect();
    stealth_ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.0.influence_score
                    .partial_cmp(&a.0.influence_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.0.prospect_id.cmp(&b.0.prospect_id))
    });
    let stealth_overlay: Vec<String> = stealth_ranked
        .into_iter()
        .take(overlay_target)
        .map(|(p, _)| p.prospect_id.clone())
        .collect();

    // Restore input order for the assignment list.
    let order_index: BTreeMap<&str, usize> = prospects
        .iter()
        .enumerate()
        .map(|(i, p)| (p.prospect_id.as_str(), i))
        .collect();
    assignments.sort_by_key(|(id, _)| order_index.get(id.as_str()).copied().unwrap_or(usize::MAX));

    let mut counts = BTreeMap::new();
    counts.insert(
        Segment::ReferralNetwork.to_string(),
        assignments
            .iter()
            .filter(|(_, s)| *s == Segment::ReferralNetwork)
            .count(),
    );
    counts.insert(
        Segment::ThoughtLeadership.to_string(),
        assignments
            .iter()
            .filter(|(_, s)| *s == Segment::ThoughtLeadership)
            .count(),
    );
    counts.insert(Segment::StealthFounder.to_string(), stealth_overlay.len());

    info!(
        total = n,
        referral = counts[&Segment::ReferralNetwork.to_string()],
        thought_leadership = counts[&Segment::ThoughtLeadership.to_string()],
        stealth_overlay = stealth_overlay.len(),
        "Segmentation complete"
    );

    SegmentationResult {
        assignments,
        stealth_overlay,
        counts,
    }
}
