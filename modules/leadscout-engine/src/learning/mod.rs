pub mod ingest;
pub mod patterns;
pub mod report;

pub use ingest::{engagement_rate, recompute_prospect_rates, ContentMetricUpdate};
pub use patterns::{LearningCore, PatternUpdateSummary, DEFAULT_WINDOW_DAYS};
pub use report::{ReportBuilder, WeeklyReport};
