//! Prospect-target extraction from research sources. Candidates come out of
//! the LLM; relevance scoring is deterministic code so identical extractions
//! always rank identically.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{Pillar, ProspectTarget};

use crate::providers::ProviderSet;

/// What the LLM returns for each candidate person mentioned in the research.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TargetCandidate {
    pub name: String,
    pub role: String,
    pub organization: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TargetExtractionResponse {
    #[serde(default)]
    pub candidates: Vec<TargetCandidate>,
}

const TARGET_SYSTEM_PROMPT: &str = "\
You extract people mentioned in research material who could become outreach \
prospects. Return every named person with a professional role. Include their \
organization and a URL when the text provides one. Never invent people; only \
extract what the text states.";

/// Default number of targets kept per insight.
pub const DEFAULT_TARGET_LIMIT: usize = 20;

/// Credential tokens that mark professional authority in a role string.
const CREDENTIAL_TOKENS: &[&str] = &[
    "phd", "psyd", "md", "lcsw", "lmft", "licensed", "board-certified", "certified", "dr.",
    "professor",
];

/// Extract candidates from combined source text. An unavailable LLM yields
/// no candidates rather than failing the workflow.
pub async fn extract_candidates(
    providers: &ProviderSet,
    source_text: &str,
) -> Vec<TargetCandidate> {
    if source_text.trim().is_empty() {
        return Vec::new();
    }

    let truncated = super::normalize::clip_text(source_text, 24_000);
    let user_prompt = format!("Extract prospect candidates from this research:\n\n{truncated}");

    match providers
        .extract::<TargetExtractionResponse>(TARGET_SYSTEM_PROMPT, &user_prompt)
        .await
    {
        Ok(response) => response.candidates,
        Err(LeadScoutError::Unavailable(_)) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "Target extraction failed, continuing without targets");
            Vec::new()
        }
    }
}

/// Deterministic relevance in [0, 1]:
/// role ∩ pillar audience vocabulary (0.5), org+url pair (0.3), credential
/// tokens (0.2).
pub fn score_candidate(candidate: &TargetCandidate, pillar: Pillar) -> f64 {
    let role = candidate.role.to_lowercase();

    let vocab_hit = pillar
        .audience_vocabulary()
        .iter()
        .any(|term| role.contains(term));
    let mut score: f64 = if vocab_hit { 0.5 } else { 0.0 };

    if !candidate.organization.trim().is_empty() && candidate.url.is_some() {
        score += 0.3;
    }

    if CREDENTIAL_TOKENS.iter().any(|t| role.contains(t)) {
        score += 0.2;
    }

    score.clamp(0.0, 1.0)
}

/// Score, rank, and keep the top-K candidates distinct by
/// `(name, organization)`.
pub fn select_targets(
    candidates: Vec<TargetCandidate>,
    pillar: Pillar,
    limit: usize,
) -> Vec<ProspectTarget> {
    let mut scored: Vec<(f64, TargetCandidate)> = candidates
        .into_iter()
        .map(|c| (score_candidate(&c, pillar), c))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.name.cmp(&b.1.name))
    });

    let mut seen: std::collections::HashSet<(String, String)> = std::collections::HashSet::new();
    let mut targets: Vec<ProspectTarget> = Vec::new();

    for (score, candidate) in scored {
        let key = (
            candidate.name.to_lowercase(),
            candidate.organization.to_lowercase(),
        );
        if !seen.insert(key.clone()) {
            continue;
        }
        // Near-identical names at the same organization are extraction noise
        // ("Jane Smith" vs "Jane Smyth"), not two people.
        let near_duplicate = targets.iter().any(|t| {
            t.organization.to_lowercase() == key.1
                && strsim::jaro_winkler(&t.name.to_lowercase(), &key.0) > 0.95
        });
        if near_duplicate {
            continue;
        }
        targets.push(ProspectTarget {
            name: candidate.name,
            role: candidate.role,
            organization: candidate.organization,
            url: candidate.url,
            pillar_relevance: vec![pillar],
            relevance_score: score,
        });
        if targets.len() >= limit {
            break;
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, role: &str, org: &str, url: Option<&str>) -> TargetCandidate {
        TargetCandidate {
            name: name.to_string(),
            role: role.to_string(),
            organization: org.to_string(),
            url: url.map(String::from),
        }
    }

    #[test]
    fn vocabulary_match_dominates_score() {
        let therapist = candidate("Jane Smith", "Licensed Therapist", "Acme", None);
        let plumber = candidate("Bob Jones", "Plumber", "Pipes Inc", None);
        assert!(
            score_candidate(&therapist, Pillar::Referral)
                > score_candidate(&plumber, Pillar::Referral)
        );
    }

    #[test]
    fn org_url_pair_and_credentials_add_points() {
        let bare = candidate("Jane Smith", "Therapist", "", None);
        let org_url = candidate("Jane Smith", "Therapist", "Acme", Some("https://acme.com"));
        let credentialed = candidate("Jane Smith", "Therapist, PhD", "Acme", Some("https://acme.com"));

        let a = score_candidate(&bare, Pillar::Referral);
        let b = score_candidate(&org_url, Pillar::Referral);
        let c = score_candidate(&credentialed, Pillar::Referral);
        assert!(b > a);
        assert!(c > b);
        assert!(c <= 1.0);
    }

    #[test]
    fn selection_dedups_by_name_and_org() {
        let candidates = vec![
            candidate("Jane Smith", "Therapist", "Acme", None),
            candidate("jane smith", "Clinical Therapist", "acme", None),
            candidate("Bob Jones", "Counselor", "Beta", None),
        ];
        let targets = select_targets(candidates, Pillar::Referral, 20);
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn near_identical_names_at_same_org_collapse() {
        let candidates = vec![
            candidate("Jane Smith", "Therapist", "Acme", None),
            candidate("Jane Smyth", "Therapist", "Acme", None),
        ];
        let targets = select_targets(candidates, Pillar::Referral, 20);
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn selection_respects_limit_and_ordering() {
        let mut candidates = Vec::new();
        for i in 0..30 {
            candidates.push(candidate(
                &format!("Person Number{i}"),
                if i % 2 == 0 { "Therapist" } else { "Baker" },
                &format!("Org{i}"),
                None,
            ));
        }
        let targets = select_targets(candidates, Pillar::Referral, 20);
        assert_eq!(targets.len(), 20);
        // Vocabulary matches outrank the rest.
        assert!(targets[0].relevance_score >= targets[19].relevance_score);
        assert!(targets[0].role.contains("Therapist"));
    }
}
