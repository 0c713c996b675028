//! Weekly performance report: aggregates over `[week_start, week_end)` plus
//! deterministic templated recommendations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{ContentMetric, Pillar, ProspectMetric, ResponseType};

use crate::deps::Services;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachSummary {
    pub connection_requests_sent: usize,
    pub connections_accepted: usize,
    pub connection_accept_rate: f64,
    pub dms_sent: usize,
    pub dm_reply_rate: f64,
    pub meetings_booked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub user_id: String,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub total_posts: usize,
    pub avg_engagement_rate: f64,
    pub best_pillar: Option<Pillar>,
    pub top_hashtags: Vec<String>,
    pub top_audience_segments: Vec<String>,
    pub outreach_summary: OutreachSummary,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct ReportBuilder {
    services: Services,
}

impl ReportBuilder {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Build and persist the report for `[week_start, week_end)`.
    pub async fn weekly_report(
        &self,
        user_id: &str,
        week_start: DateTime<Utc>,
        week_end: DateTime<Utc>,
    ) -> Result<WeeklyReport, LeadScoutError> {
        let user = self.services.user_store(user_id);

        let content: Vec<ContentMetric> = user
            .content_metrics_since(week_start)
            .await?
            .into_iter()
            .filter(|m| m.created_at < week_end)
            .collect();
        let outreach: Vec<ProspectMetric> = user
            .prospect_metrics_since(week_start)
            .await?
            .into_iter()
            .filter(|m| m.updated_at < week_end)
            .collect();

        let report = build_report(
            user_id,
            week_start,
            week_end,
            &content,
            &outreach,
            self.services.clock.now(),
        );

        let report_id = format!("week-{}", week_start.format("%Y-%m-%d"));
        user.save_weekly_report(
            &report_id,
            serde_json::to_value(&report)
                .map_err(|e| LeadScoutError::Validation(e.to_string()))?,
        )
        .await?;

        info!(
            user_id,
            posts = report.total_posts,
            avg_engagement = report.avg_engagement_rate,
            "Weekly report generated"
        );
        Ok(report)
    }
}

/// Pure aggregation; separated from the store plumbing for testability.
pub fn build_report(
    user_id: &str,
    week_start: DateTime<Utc>,
    week_end: DateTime<Utc>,
    content: &[ContentMetric],
    outreach: &[ProspectMetric],
    now: DateTime<Utc>,
) -> WeeklyReport {
    // Latest observation per post wins; earlier same-week updates are
    // superseded.
    let mut latest: BTreeMap<&str, &ContentMetric> = BTreeMap::new();
    for metric in content {
        let entry = latest.entry(metric.content_id.as_str()).or_insert(metric);
        if metric.created_at > entry.created_at {
            *entry = metric;
        }
    }
    let posts: Vec<&ContentMetric> = latest.into_values().collect();

    let total_posts = posts.len();
    let avg_engagement_rate = if total_posts == 0 {
        0.0
    } else {
        round2(posts.iter().map(|m| m.engagement_rate).sum::<f64>() / total_posts as f64)
    };

    // Per-pillar averages for best-pillar and recommendations.
    let mut pillar_rates: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for post in &posts {
        pillar_rates
            .entry(post.pillar.to_string())
            .or_default()
            .push(post.engagement_rate);
    }
    let pillar_avgs: BTreeMap<String, f64> = pillar_rates
        .iter()
        .map(|(p, rates)| (p.clone(), rates.iter().sum::<f64>() / rates.len() as f64))
        .collect();
    let best_pillar = pillar_avgs
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .and_then(|(name, _)| name.parse::<Pillar>().ok());

    // Hashtags and audience segments ranked by total engagement volume.
    let top_hashtags = rank_by_engagement(&posts, |m| m.top_hashtags.clone());
    let top_audience_segments = rank_by_engagement(&posts, |m| m.audience_segment.clone());

    // Outreach aggregates.
    let connection_requests_sent = outreach
        .iter()
        .filter(|m| m.connection_request_sent.is_some())
        .count();
    let connections_accepted = outreach
        .iter()
        .filter(|m| m.connection_accepted.is_some())
        .count();
    let dms_sent: usize = outreach.iter().map(|m| m.dm_sent.len()).sum();
    let positive_replies: usize = outreach
        .iter()
        .flat_map(|m| &m.dm_sent)
        .filter(|dm| dm.response_type == Some(ResponseType::Positive))
        .count();
    let meetings_booked: usize = outreach.iter().map(|m| m.meetings_booked.len()).sum();

    let outreach_summary = OutreachSummary {
        connection_requests_sent,
        connections_accepted,
        connection_accept_rate: rate(connections_accepted, connection_requests_sent),
        dms_sent,
        dm_reply_rate: rate(positive_replies, dms_sent),
        meetings_booked,
    };

    let recommendations = build_recommendations(
        avg_engagement_rate,
        &pillar_avgs,
        &top_hashtags,
        &outreach_summary,
    );

    WeeklyReport {
        user_id: user_id.to_string(),
        week_start,
        week_end,
        total_posts,
        avg_engagement_rate,
        best_pillar,
        top_hashtags,
        top_audience_segments,
        outreach_summary,
        recommendations,
        generated_at: now,
    }
}

/// Simple deterministic rules - the point is a stable, explainable nudge,
/// not a model.
fn build_recommendations(
    avg_overall: f64,
    pillar_avgs: &BTreeMap<String, f64>,
    top_hashtags: &[String],
    outreach: &OutreachSummary,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    for (pillar, avg) in pillar_avgs {
        if avg_overall > 0.0 && *avg > 1.2 * avg_overall {
            recommendations.push(format!(
                "Increase {pillar} posts — averaging {:.2}% vs {:.2}% overall",
                avg, avg_overall
            ));
        }
    }

    if let Some(hashtag) = top_hashtags.first() {
        recommendations.push(format!("Keep using {hashtag} — it led engagement this week"));
    }

    if outreach.dms_sent >= 10 && outreach.dm_reply_rate < 5.0 {
        recommendations.push(
            "Reply rate is under 5% — rotate in fresh DM variants next week".to_string(),
        );
    }

    if outreach.connection_requests_sent >= 10 && outreach.connection_accept_rate < 20.0 {
        recommendations.push(
            "Connection accept rate is low — tighten targeting before raising volume".to_string(),
        );
    }

    recommendations
}

fn rank_by_engagement<F>(posts: &[&ContentMetric], keys: F) -> Vec<String>
where
    F: Fn(&ContentMetric) -> Vec<String>,
{
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for post in posts {
        let volume = post.metrics.likes + post.metrics.comments + post.metrics.shares;
        for key in keys(post) {
            *totals.entry(key.to_lowercase()).or_insert(0) += volume;
        }
    }
    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(5).map(|(k, _)| k).collect()
}

fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
