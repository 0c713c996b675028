//! Outreach prioritization: one weighted score over the discovery-time
//! component scores, with configurable floor filters.

use leadscout_common::types::DiscoveredProspect;

#[derive(Debug, Clone)]
pub struct PriorityConfig {
    pub min_fit: f64,
    pub min_referral_capacity: f64,
    pub min_signal_strength: f64,
    pub min_priority: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            min_fit: 0.0,
            min_referral_capacity: 0.0,
            min_signal_strength: 0.0,
            min_priority: 0.0,
        }
    }
}

/// `priority = 0.5·fit + 0.3·referral_capacity + 0.2·signal_strength`.
pub fn priority_score(prospect: &DiscoveredProspect) -> f64 {
    0.5 * prospect.scores.fit
        + 0.3 * prospect.scores.referral_capacity
        + 0.2 * prospect.scores.signal_strength
}

/// Filter by the configured minima and sort by priority descending; ties by
/// prospect id ascending so re-runs produce identical queues.
pub fn prioritize(
    mut prospects: Vec<DiscoveredProspect>,
    config: &PriorityConfig,
) -> Vec<(f64, DiscoveredProspect)> {
    prospects.retain(|p| {
        p.scores.fit >= config.min_fit
            && p.scores.referral_capacity >= config.min_referral_capacity
            && p.scores.signal_strength >= config.min_signal_strength
            && priority_score(p) >= config.min_priority
    });

    let mut scored: Vec<(f64, DiscoveredProspect)> = prospects
        .into_iter()
        .map(|p| (priority_score(&p), p))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.prospect_id.cmp(&b.1.prospect_id))
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadscout_common::types::{ApprovalStatus, ContactInfo, ProspectScores};

    fn prospect(id: &str, fit: f64, referral: f64, signal: f64) -> DiscoveredProspect {
        DiscoveredProspect {
            prospect_id: id.to_string(),
            user_id: "u1".to_string(),
            name: "Jane Smith".to_string(),
            organization: None,
            job_title: None,
            source_url: String::new(),
            source: "serper".to_string(),
            category: "psychologists".to_string(),
            contact: ContactInfo::default(),
            influence_score: 50.0,
            segment: None,
            approval_status: ApprovalStatus::Pending,
            scores: ProspectScores {
                fit,
                referral_capacity: referral,
                signal_strength: signal,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn weights_are_half_point_three_point_two() {
        let p = prospect("p1", 1.0, 1.0, 1.0);
        assert!((priority_score(&p) - 1.0).abs() < 1e-9);

        let p = prospect("p2", 1.0, 0.0, 0.0);
        assert!((priority_score(&p) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn minima_filter_and_order_desc() {
        let prospects = vec![
            prospect("p1", 0.9, 0.9, 0.9),
            prospect("p2", 0.2, 0.9, 0.9),
            prospect("p3", 0.8, 0.5, 0.5),
        ];
        let config = PriorityConfig {
            min_fit: 0.5,
            ..Default::default()
        };
        let ranked = prioritize(prospects, &config);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].1.prospect_id, "p1");
        assert_eq!(ranked[1].1.prospect_id, "p3");
    }

    #[test]
    fn ties_break_by_prospect_id() {
        let prospects = vec![
            prospect("p2", 0.5, 0.5, 0.5),
            prospect("p1", 0.5, 0.5, 0.5),
        ];
        let ranked = prioritize(prospects, &PriorityConfig::default());
        assert_eq!(ranked[0].1.prospect_id, "p1");
    }
}
