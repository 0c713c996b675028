//! Weekly cadence building: deterministic slot assignment for connection
//! requests and follow-ups, Mon–Fri, proportional to the segment mix.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use leadscout_common::types::{DiscoveredProspect, Segment};

/// Send windows per weekday.
const TIME_SLOTS: &[&str] = &["09:00", "11:30", "14:00", "16:30"];
const WEEKDAYS: &[&str] = &["monday", "tuesday", "wednesday", "thursday", "friday"];

#[derive(Debug, Clone, Copy)]
pub struct CadenceTargets {
    pub connection_requests: usize,
    pub followups: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachKind {
    ConnectionRequest,
    Followup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceEntry {
    pub day: String,
    pub date: NaiveDate,
    pub time_of_day: String,
    pub prospect_id: String,
    pub outreach_type: OutreachKind,
    pub step_index: usize,
    pub variant_index: usize,
}

/// Build the week's plan. Deterministic given `(user_id, week_start,
/// prospects)`: segment allocation by largest remainder against the actual
/// segment mix, prospects cycled in influence-desc order, slots filled
/// Mon–Fri round-robin.
pub fn weekly_cadence(
    user_id: &str,
    week_start: NaiveDate,
    prospects: &[(DiscoveredProspect, Segment)],
    targets: CadenceTargets,
) -> Vec<CadenceEntry> {
    if prospects.is_empty() {
        return Vec::new();
    }

    // Monday of the given week, whatever date the caller handed us.
    let monday = week_start
        - chrono::Duration::days(week_start.weekday().num_days_from_monday() as i64);

    let mut by_segment: BTreeMap<String, Vec<&DiscoveredProspect>> = BTreeMap::new();
    for (prospect, segment) in prospects {
        by_segment
            .entry(segment.to_string())
            .or_default()
            .push(prospect);
    }
    for list in by_segment.values_mut() {
        list.sort_by(|a, b| {
            b.influence_score
                .partial_cmp(&a.influence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.prospect_id.cmp(&b.prospect_id))
        });
    }

    let total = targets.connection_requests + targets.followups;
    let allocations = allocate_proportionally(&by_segment, total);

    // Interleave kinds per segment: connection requests first in the ratio
    // the caller asked for.
    let mut entries = Vec::with_capacity(total);
    let mut slot = 0usize;
    let mut remaining_cr = targets.connection_requests;
    let mut remaining_fu = targets.followups;

    for (segment, allocation) in &allocations {
        let list = &by_segment[segment];
        for i in 0..*allocation {
            // Alternate kinds, draining whichever pool is larger first so
            // both hit zero together at the end of the week.
            let kind = if remaining_cr > 0 && (remaining_fu == 0 || remaining_cr >= remaining_fu) {
                remaining_cr -= 1;
                OutreachKind::ConnectionRequest
            } else {
                remaining_fu -= 1;
                OutreachKind::Followup
            };

            let prospect = list[i % list.len()];
            let day_index = slot % WEEKDAYS.len();
            let time_index = (slot / WEEKDAYS.len()) % TIME_SLOTS.len();

            let (step_index, variant_index) = match kind {
                OutreachKind::ConnectionRequest => {
                    (0, stable_variant(user_id, monday, &prospect.prospect_id, 2))
                }
                OutreachKind::Followup => {
                    (1, stable_variant(user_id, monday, &prospect.prospect_id, 3))
                }
            };

            entries.push(CadenceEntry {
                day: WEEKDAYS[day_index].to_string(),
                date: monday + chrono::Duration::days(day_index as i64),
                time_of_day: TIME_SLOTS[time_index].to_string(),
                prospect_id: prospect.prospect_id.clone(),
                outreach_type: kind,
                step_index,
                variant_index,
            });
            slot += 1;
        }
    }

    entries
}

/// Largest-remainder allocation of `total` slots across segments,
/// proportional to each segment's prospect count. BTreeMap ordering makes
/// the remainder distribution deterministic.
fn allocate_proportionally(
    by_segment: &BTreeMap<String, Vec<&DiscoveredProspect>>,
    total: usize,
) -> Vec<(String, usize)> {
    let population: usize = by_segment.values().map(|v| v.len()).sum();
    if population == 0 {
        return Vec::new();
    }

    let mut allocations: Vec<(String, usize, f64)> = by_segment
        .iter()
        .map(|(segment, list)| {
            let exact = total as f64 * list.len() as f64 / population as f64;
            (segment.clone(), exact.floor() as usize, exact.fract())
        })
        .collect();

    let assigned: usize = allocations.iter().map(|(_, n, _)| n).sum();
    let mut leftover = total - assigned;

    allocations.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    for allocation in allocations.iter_mut() {
        if leftover == 0 {
            break;
        }
        allocation.1 += 1;
        leftover -= 1;
    }

    allocations.sort_by(|a, b| a.0.cmp(&b.0));
    allocations
        .into_iter()
        .map(|(segment, n, _)| (segment, n))
        .collect()
}

/// Deterministic variant pick: FNV-1a over the slot identity.
fn stable_variant(user_id: &str, monday: NaiveDate, prospect_id: &str, variants: usize) -> usize {
    let key = format!("{user_id}|{monday}|{prospect_id}");
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in key.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % variants.max(1) as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadscout_common::types::{ApprovalStatus, ContactInfo, ProspectScores};

    fn prospect(id: usize) -> DiscoveredProspect {
        DiscoveredProspect {
            prospect_id: format!("p{id:03}"),
            user_id: "u1".to_string(),
            name: format!("Person {id}"),
            organization: None,
            job_title: None,
            source_url: String::new(),
            source: "serper".to_string(),
            category: "psychologists".to_string(),
            contact: ContactInfo::default(),
            influence_score: 50.0 + (id % 10) as f64,
            segment: None,
            approval_status: ApprovalStatus::Approved,
            scores: ProspectScores::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn population(n: usize) -> Vec<(DiscoveredProspect, Segment)> {
        (0..n)
            .map(|i| {
                let segment = if i % 21 == 20 {
                    Segment::StealthFounder
                } else if i % 2 == 0 {
                    Segment::ReferralNetwork
                } else {
                    Segment::ThoughtLeadership
                };
                (prospect(i), segment)
            })
            .collect()
    }

    #[test]
    fn entry_count_matches_targets_exactly() {
        let week = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let entries = weekly_cadence(
            "u1",
            week,
            &population(100),
            CadenceTargets {
                connection_requests: 40,
                followups: 30,
            },
        );
        assert_eq!(entries.len(), 70);

        let crs = entries
            .iter()
            .filter(|e| e.outreach_type == OutreachKind::ConnectionRequest)
            .count();
        assert_eq!(crs, 40);
    }

    #[test]
    fn all_slots_are_weekdays_with_valid_times() {
        let week = NaiveDate::from_ymd_opt(2026, 7, 29).unwrap(); // a Wednesday
        let entries = weekly_cadence(
            "u1",
            week,
            &population(20),
            CadenceTargets {
                connection_requests: 10,
                followups: 5,
            },
        );
        for entry in &entries {
            assert!(WEEKDAYS.contains(&entry.day.as_str()));
            assert!(TIME_SLOTS.contains(&entry.time_of_day.as_str()));
            // Dates land inside the Mon–Fri of that week.
            let monday = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
            assert!(entry.date >= monday && entry.date < monday + chrono::Duration::days(5));
        }
    }

    #[test]
    fn allocation_respects_segment_mix() {
        let week = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let entries = weekly_cadence(
            "u1",
            week,
            &population(100),
            CadenceTargets {
                connection_requests: 40,
                followups: 30,
            },
        );

        let mut per_segment: BTreeMap<String, usize> = BTreeMap::new();
        let pop = population(100);
        let segment_of: BTreeMap<String, Segment> = pop
            .iter()
            .map(|(p, s)| (p.prospect_id.clone(), *s))
            .collect();
        for entry in &entries {
            *per_segment
                .entry(segment_of[&entry.prospect_id].to_string())
                .or_insert(0) += 1;
        }

        // ~48/48/4 prospects → roughly proportional 70-way split.
        assert!((30..=38).contains(&per_segment["referral_network"]));
        assert!((30..=38).contains(&per_segment["thought_leadership"]));
        assert!(per_segment["stealth_founder"] <= 6);
    }

    #[test]
    fn cadence_is_deterministic() {
        let week = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let targets = CadenceTargets {
            connection_requests: 12,
            followups: 8,
        };
        let a = weekly_cadence("u1", week, &population(30), targets);
        let b = weekly_cadence("u1", week, &population(30), targets);
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[test]
    fn small_prospect_pools_cycle() {
        let week = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let entries = weekly_cadence(
            "u1",
            week,
            &population(3),
            CadenceTargets {
                connection_requests: 6,
                followups: 0,
            },
        );
        assert_eq!(entries.len(), 6);
    }
}
