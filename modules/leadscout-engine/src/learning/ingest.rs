//! Metric ingestion. Rates are recomputed server-side on every write;
//! whatever the client sends for a derived field is ignored.

use serde::{Deserialize, Serialize};
use tracing::info;

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{ContentMetric, MetricCounts, Pillar, ProspectMetric, ResponseType};
use leadscout_store::UserStore;

/// Wire input for a content-metric update. `engagement_rate` is accepted for
/// wire compatibility and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMetricUpdate {
    pub content_id: String,
    pub pillar: Pillar,
    pub platform: String,
    pub post_type: String,
    pub metrics: MetricCounts,
    #[serde(default)]
    pub top_hashtags: Vec<String>,
    #[serde(default)]
    pub audience_segment: Vec<String>,
    #[serde(default)]
    pub engagement_rate: Option<f64>,
}

/// `round((likes+comments+shares)/max(impressions,1)·100, 2)`, and 0 when
/// there are no impressions.
pub fn engagement_rate(metrics: &MetricCounts) -> f64 {
    if metrics.impressions == 0 {
        return 0.0;
    }
    let interactions = (metrics.likes + metrics.comments + metrics.shares) as f64;
    let rate = interactions / metrics.impressions.max(1) as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Recompute the derived rates on a prospect metric in place. Clamped to
/// [0, 100]; zero DMs means zero rates, not NaN.
pub fn recompute_prospect_rates(metric: &mut ProspectMetric) {
    let dms = metric.dm_sent.len();
    if dms == 0 {
        metric.reply_rate = 0.0;
        metric.meeting_rate = 0.0;
        return;
    }

    let positive = metric
        .dm_sent
        .iter()
        .filter(|dm| dm.response_type == Some(ResponseType::Positive))
        .count();
    metric.reply_rate = (positive as f64 / dms as f64 * 100.0).clamp(0.0, 100.0);
    metric.meeting_rate =
        (metric.meetings_booked.len() as f64 / dms as f64 * 100.0).clamp(0.0, 100.0);
}

/// Persist a content-metric update as its own document (the
/// `(content_id, created_at desc)` index serves history reads).
pub async fn update_content_metric(
    user: &UserStore,
    update: ContentMetricUpdate,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<ContentMetric, LeadScoutError> {
    let metric = ContentMetric {
        content_id: update.content_id.clone(),
        user_id: user.user_id().to_string(),
        pillar: update.pillar,
        platform: update.platform,
        post_type: update.post_type,
        engagement_rate: engagement_rate(&update.metrics),
        metrics: update.metrics,
        top_hashtags: update.top_hashtags,
        audience_segment: update.audience_segment,
        created_at: now,
    };

    let doc_id = uuid::Uuid::new_v4().to_string();
    user.save_content_metric(&doc_id, &metric).await?;

    info!(
        content_id = %metric.content_id,
        engagement_rate = metric.engagement_rate,
        "Content metric updated"
    );
    Ok(metric)
}

/// Direct prospect-metric write (the bulk-update surface, as opposed to the
/// per-event engagement tracker). Derived rates are recomputed before the
/// write regardless of what the caller set.
pub async fn update_prospect_metric(
    user: &UserStore,
    mut metric: ProspectMetric,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<ProspectMetric, LeadScoutError> {
    recompute_prospect_rates(&mut metric);
    metric.updated_at = now;
    user.save_prospect_metric(&metric).await?;

    info!(
        prospect_id = %metric.prospect_id,
        reply_rate = metric.reply_rate,
        meeting_rate = metric.meeting_rate,
        "Prospect metric updated"
    );
    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadscout_common::types::DmRecord;

    #[test]
    fn engagement_rate_literal_case() {
        let metrics = MetricCounts {
            likes: 45,
            comments: 12,
            shares: 8,
            impressions: 500,
            ..Default::default()
        };
        assert_eq!(engagement_rate(&metrics), 13.00);
    }

    #[test]
    fn zero_impressions_means_zero_rate() {
        let metrics = MetricCounts {
            likes: 45,
            comments: 12,
            shares: 8,
            impressions: 0,
            ..Default::default()
        };
        assert_eq!(engagement_rate(&metrics), 0.0);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        let metrics = MetricCounts {
            likes: 1,
            comments: 0,
            shares: 0,
            impressions: 3,
            ..Default::default()
        };
        assert_eq!(engagement_rate(&metrics), 33.33);
    }

    fn dm(id: &str, response: Option<ResponseType>) -> DmRecord {
        DmRecord {
            message_id: id.to_string(),
            sent_at: Utc::now(),
            response_received_at: response.map(|_| Utc::now()),
            response_type: response,
        }
    }

    #[test]
    fn prospect_rates_from_dm_outcomes() {
        let mut metric = ProspectMetric {
            prospect_id: "p1".to_string(),
            user_id: "u1".to_string(),
            sequence_id: "s1".to_string(),
            connection_request_sent: None,
            connection_accepted: None,
            dm_sent: vec![
                dm("m1", Some(ResponseType::Positive)),
                dm("m2", Some(ResponseType::Negative)),
                dm("m3", None),
                dm("m4", Some(ResponseType::Positive)),
            ],
            meetings_booked: vec![],
            reply_rate: 99.0,
            meeting_rate: 99.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        recompute_prospect_rates(&mut metric);
        assert_eq!(metric.reply_rate, 50.0);
        assert_eq!(metric.meeting_rate, 0.0);
    }

    #[test]
    fn zero_dms_means_zero_rates() {
        let mut metric = ProspectMetric {
            prospect_id: "p1".to_string(),
            user_id: "u1".to_string(),
            sequence_id: "s1".to_string(),
            connection_request_sent: None,
            connection_accepted: None,
            dm_sent: vec![],
            meetings_booked: vec![],
            reply_rate: 42.0,
            meeting_rate: 42.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        recompute_prospect_rates(&mut metric);
        assert_eq!(metric.reply_rate, 0.0);
        assert_eq!(metric.meeting_rate, 0.0);
    }

    #[tokio::test]
    async fn client_supplied_rate_is_ignored() {
        let store = std::sync::Arc::new(leadscout_store::MemoryStore::new());
        let user = UserStore::new(store, "u1");
        let update = ContentMetricUpdate {
            content_id: "c1".to_string(),
            pillar: Pillar::ThoughtLeadership,
            platform: "linkedin".to_string(),
            post_type: "text".to_string(),
            metrics: MetricCounts {
                likes: 45,
                comments: 12,
                shares: 8,
                impressions: 500,
                ..Default::default()
            },
            top_hashtags: vec![],
            audience_segment: vec![],
            engagement_rate: Some(99.9),
        };
        let stored = update_content_metric(&user, update, Utc::now()).await.unwrap();
        assert_eq!(stored.engagement_rate, 13.00);
    }
}
