//! Influence scoring. Deterministic: the same draft always scores the same,
//! so re-running discovery never reshuffles an approval queue.

use super::extract::ProspectDraft;
use super::queries::category_profile;

/// Seniority tiers by title token. Highest matching tier wins.
const SENIOR_TOKENS: &[&str] = &[
    "founder", "ceo", "president", "executive director", "head of school", "superintendent",
    "ambassador", "owner",
];
const MID_TOKENS: &[&str] = &[
    "director", "principal", "dean", "chief", "partner", "consul", "clinical director",
    "athletic director",
];
const JUNIOR_TOKENS: &[&str] = &[
    "manager", "coordinator", "counselor", "therapist", "psychologist", "psychiatrist",
    "coach", "teacher", "officer",
];

/// `influence_score = f(category_weight, seniority, contact completeness,
/// org specificity)` in [0, 100].
pub fn influence_score(draft: &ProspectDraft, category: &str) -> f64 {
    let category_weight = category_profile(category).weight;

    // Category contributes up to 30 points.
    let category_points = 30.0 * category_weight;

    // Seniority contributes up to 30.
    let title = draft
        .job_title
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let seniority_points = if SENIOR_TOKENS.iter().any(|t| title.contains(t)) {
        30.0
    } else if MID_TOKENS.iter().any(|t| title.contains(t)) {
        20.0
    } else if JUNIOR_TOKENS.iter().any(|t| title.contains(t)) {
        10.0
    } else {
        0.0
    };

    // Contact completeness contributes up to 25.
    let mut contact_points = 0.0;
    if draft.email.is_some() {
        contact_points += 15.0;
    }
    if draft.phone.is_some() {
        contact_points += 10.0;
    }

    // Organization specificity contributes up to 15: a multi-word named org
    // beats a bare domain stem.
    let org_points = match draft.organization.as_deref() {
        Some(org) if org.split_whitespace().count() >= 2 => 15.0,
        Some(_) => 8.0,
        None => 0.0,
    };

    (category_points + seniority_points + contact_points + org_points).clamp(0.0, 100.0)
}

/// Component scores for outreach prioritization, each in [0, 1], derived
/// from the same observable inputs.
pub fn component_scores(draft: &ProspectDraft, category: &str) -> leadscout_common::types::ProspectScores {
    let influence = influence_score(draft, category);
    let title = draft
        .job_title
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    // Referral capacity: gatekeeper roles that send families/clients onward.
    let referral_capacity = if ["admissions", "counselor", "consultant", "referral"]
        .iter()
        .any(|t| title.contains(t))
    {
        0.9
    } else if ["director", "therapist", "psychologist", "psychiatrist"]
        .iter()
        .any(|t| title.contains(t))
    {
        0.7
    } else {
        0.4
    };

    // Signal strength: how complete the extraction was.
    let mut signal: f64 = 0.2;
    if draft.email.is_some() {
        signal += 0.3;
    }
    if draft.phone.is_some() {
        signal += 0.2;
    }
    if draft.organization.is_some() {
        signal += 0.2;
    }
    if draft.job_title.is_some() {
        signal += 0.1;
    }

    leadscout_common::types::ProspectScores {
        fit: influence / 100.0,
        referral_capacity,
        signal_strength: signal.min(1.0),
    }
}
