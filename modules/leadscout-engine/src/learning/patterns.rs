//! Learning-pattern aggregation: windowed metrics grouped per pattern key,
//! upserted idempotently. Updates for the same `(pattern_type, pattern_key)`
//! are serialized through a per-key lock plus a compare-and-set on
//! `last_updated`, so concurrent workers never lose history entries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    LearningPattern, PatternType, ProspectMetric, SuccessMetric,
};
use leadscout_store::UserStore;

use crate::deps::Services;

/// Bounded performance history length.
const HISTORY_CAP: usize = 12;
/// Default analysis window.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
/// CAS retries before surfacing a consistency failure.
const CAS_ATTEMPTS: u32 = 3;

/// One metric observation attributed to a pattern key.
#[derive(Debug, Clone)]
struct Observation {
    pattern_type: PatternType,
    pattern_key: String,
    success_metric: SuccessMetric,
    value: f64,
    variant: String,
}

#[derive(Debug, Default, Clone)]
pub struct PatternUpdateSummary {
    pub patterns_written: usize,
    pub patterns_unchanged: usize,
}

pub struct LearningCore {
    services: Services,
    locks: Mutex<HashMap<(PatternType, String), Arc<Mutex<()>>>>,
}

impl LearningCore {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Scan the window's metrics and upsert every derived pattern. Passing a
    /// `pattern_type` restricts the update to that family. Idempotent: a
    /// second call over identical inputs writes nothing.
    pub async fn update_patterns(
        &self,
        user_id: &str,
        pattern_type: Option<PatternType>,
        window_days: i64,
    ) -> Result<PatternUpdateSummary, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let now = self.services.clock.now();
        let since = now - Duration::days(window_days);

        let mut observations = Vec::new();
        observations.extend(self.content_observations(&user, since).await?);
        observations.extend(self.outreach_observations(&user, since).await?);

        if let Some(only) = pattern_type {
            observations.retain(|o| o.pattern_type == only);
        }

        let grouped = group_observations(observations);
        let mut summary = PatternUpdateSummary::default();

        for ((ptype, key), group) in grouped {
            match self.upsert_pattern(&user, ptype, &key, &group).await {
                Ok(true) => summary.patterns_written += 1,
                Ok(false) => summary.patterns_unchanged += 1,
                Err(e) => {
                    warn!(pattern_type = %ptype, pattern_key = %key, error = %e, "Pattern upsert failed");
                    return Err(e);
                }
            }
        }

        info!(
            user_id,
            written = summary.patterns_written,
            unchanged = summary.patterns_unchanged,
            "Learning pattern update complete"
        );
        Ok(summary)
    }

    /// Targeted update after an engagement event: refresh only the
    /// outreach-sequence pattern the metric belongs to.
    pub async fn update_sequence_pattern(
        &self,
        user: &UserStore,
        metric: &ProspectMetric,
    ) -> Result<(), LeadScoutError> {
        let group = vec![Observation {
            pattern_type: PatternType::OutreachSequence,
            pattern_key: metric.sequence_id.clone(),
            success_metric: SuccessMetric::ReplyRate,
            value: metric.reply_rate,
            variant: metric.prospect_id.clone(),
        }];
        self.upsert_pattern(user, PatternType::OutreachSequence, &metric.sequence_id, &group)
            .await?;
        Ok(())
    }

    async fn content_observations(
        &self,
        user: &UserStore,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Observation>, LeadScoutError> {
        let metrics = user.content_metrics_since(since).await?;
        let mut observations = Vec::new();

        for metric in &metrics {
            observations.push(Observation {
                pattern_type: PatternType::ContentPillar,
                pattern_key: metric.pillar.to_string(),
                success_metric: SuccessMetric::EngagementRate,
                value: metric.engagement_rate,
                variant: metric.content_id.clone(),
            });

            for hashtag in &metric.top_hashtags {
                observations.push(Observation {
                    pattern_type: PatternType::Hashtag,
                    pattern_key: hashtag.to_lowercase(),
                    success_metric: SuccessMetric::EngagementRate,
                    value: metric.engagement_rate,
                    variant: metric.content_id.clone(),
                });
            }

            for segment in &metric.audience_segment {
                observations.push(Observation {
                    pattern_type: PatternType::AudienceSegment,
                    pattern_key: segment.clone(),
                    success_metric: SuccessMetric::EngagementRate,
                    value: metric.engagement_rate,
                    variant: metric.content_id.clone(),
                });
            }

            // Topic patterns need the draft the post came from.
            if let Some(draft) = user.get_draft(&metric.content_id).await? {
                observations.push(Observation {
                    pattern_type: PatternType::Topic,
                    pattern_key: draft.topic.to_lowercase(),
                    success_metric: SuccessMetric::EngagementRate,
                    value: metric.engagement_rate,
                    variant: metric.content_id.clone(),
                });
            }
        }

        Ok(observations)
    }

    async fn outreach_observations(
        &self,
        user: &UserStore,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Observation>, LeadScoutError> {
        let metrics = user.prospect_metrics_since(since).await?;
        Ok(metrics
            .into_iter()
            .filter(|m| !m.dm_sent.is_empty())
            .map(|m| Observation {
                pattern_type: PatternType::OutreachSequence,
                pattern_key: m.sequence_id.clone(),
                success_metric: SuccessMetric::ReplyRate,
                value: m.reply_rate,
                variant: m.prospect_id,
            })
            .collect())
    }

    /// Serialized read-modify-write for one pattern key. Returns whether a
    /// write happened (false = identical inputs, no-op).
    async fn upsert_pattern(
        &self,
        user: &UserStore,
        pattern_type: PatternType,
        pattern_key: &str,
        group: &[Observation],
    ) -> Result<bool, LeadScoutError> {
        if group.is_empty() {
            return Ok(false);
        }

        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry((pattern_type, pattern_key.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        let average = group.iter().map(|o| o.value).sum::<f64>() / group.len() as f64;
        let average = (average * 100.0).round() / 100.0;
        let best = group
            .iter()
            .max_by(|a, b| {
                a.value
                    .partial_cmp(&b.value)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.variant.cmp(&a.variant))
            })
            .map(|o| o.variant.clone())
            .unwrap_or_default();

        for attempt in 0..CAS_ATTEMPTS {
            let existing = user.get_pattern(pattern_type, pattern_key).await?;

            if let Some(current) = &existing {
                let unchanged = (current.average_performance - average).abs() < f64::EPSILON
                    && current.sample_size == group.len() as u64
                    && current.best_performance_variant == best;
                if unchanged {
                    return Ok(false);
                }
            }

            let mut history = existing
                .as_ref()
                .map(|p| p.performance_history.clone())
                .unwrap_or_default();
            history.push(average);
            if history.len() > HISTORY_CAP {
                let start = history.len() - HISTORY_CAP;
                history.drain(..start);
            }

            let pattern = LearningPattern {
                pattern_id: existing
                    .as_ref()
                    .map(|p| p.pattern_id.clone())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                user_id: user.user_id().to_string(),
                pattern_type,
                pattern_key: pattern_key.to_string(),
                success_metric: group[0].success_metric,
                average_performance: average,
                best_performance_variant: best.clone(),
                sample_size: group.len() as u64,
                performance_history: history,
                last_updated: self.services.clock.now(),
            };

            let expected = existing.as_ref().map(|p| p.last_updated);
            if user.save_pattern_if_unchanged(&pattern, expected).await? {
                return Ok(true);
            }
            warn!(
                pattern_key,
                attempt = attempt + 1,
                "Pattern CAS lost, re-reading"
            );
        }

        Err(LeadScoutError::Consistency(format!(
            "learning_patterns/{pattern_type}:{pattern_key}"
        )))
    }
}

fn group_observations(
    observations: Vec<Observation>,
) -> BTreeMap<(PatternType, String), Vec<Observation>> {
    let mut grouped: BTreeMap<(PatternType, String), Vec<Observation>> = BTreeMap::new();
    for observation in observations {
        grouped
            .entry((observation.pattern_type, observation.pattern_key.clone()))
            .or_default()
            .push(observation);
    }
    grouped
}
