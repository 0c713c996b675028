//! Per-user collection names. The persisted layout is
//! `users/{uid}/{collection}/{id}`.

pub const RESEARCH_INSIGHTS: &str = "research_insights";
pub const PROSPECTS: &str = "prospects";
pub const OUTREACH_SEQUENCES: &str = "outreach_sequences";
pub const CONTENT_DRAFTS: &str = "content_drafts";
pub const CONTENT_METRICS: &str = "content_metrics";
pub const PROSPECT_METRICS: &str = "prospect_metrics";
pub const LEARNING_PATTERNS: &str = "learning_patterns";
pub const ACTIVITIES: &str = "activities";
pub const WEBHOOKS: &str = "webhooks";
pub const SCHEDULED_TOPICS: &str = "scheduled_topics";
pub const WEEKLY_REPORTS: &str = "weekly_reports";
