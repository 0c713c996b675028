//! Scheduled-topic automation: periodic replay of the research pipeline and
//! the weekly-report cron.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{Frequency, Pillar, ScheduledTopicPlan};

use crate::deps::Services;
use crate::learning::ReportBuilder;
use crate::research::ResearchPipeline;

/// Gap between staggered topic replays. Batch mode stretches it.
const STAGGER: Duration = Duration::from_millis(250);
const BATCH_STAGGER: Duration = Duration::from_millis(1500);

/// A report older than this is due for regeneration.
const REPORT_STALE_DAYS: i64 = 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunScheduledSummary {
    pub plans_run: usize,
    pub topics_run: usize,
    pub cache_hits: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyReportSummary {
    pub reports_generated: usize,
    pub users_skipped: usize,
}

pub struct Scheduler {
    services: Services,
}

impl Scheduler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Persist a scheduled-topic plan. The plan is due immediately; the
    /// first `run_scheduled` tick picks it up.
    pub async fn schedule_topics(
        &self,
        user_id: &str,
        topics: Vec<String>,
        frequency: Frequency,
        pillar: Pillar,
    ) -> Result<ScheduledTopicPlan, LeadScoutError> {
        if topics.is_empty() {
            return Err(LeadScoutError::Validation("no topics given".to_string()));
        }

        let now = self.services.clock.now();
        let plan = ScheduledTopicPlan {
            plan_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topics,
            frequency,
            pillar,
            created_at: now,
            last_run_at: None,
            next_due_at: now,
        };

        self.services.user_store(user_id).save_plan(&plan).await?;
        info!(user_id, plan_id = %plan.plan_id, frequency = %frequency, topics = plan.topics.len(), "Topics scheduled");
        Ok(plan)
    }

    /// Replay the research pipeline for every due plan at this frequency.
    /// Topics run sequentially with a stagger so provider budgets survive
    /// the burst; a failing topic doesn't stop the rest.
    pub async fn run_scheduled(
        &self,
        user_id: &str,
        frequency: Frequency,
    ) -> Result<RunScheduledSummary, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let now = self.services.clock.now();
        let due = user.due_plans(frequency, now).await?;

        let mut summary = RunScheduledSummary::default();
        let pipeline = ResearchPipeline::new(self.services.clone());
        let stagger = if self.services.batch_mode {
            BATCH_STAGGER
        } else {
            STAGGER
        };

        for mut plan in due {
            summary.plans_run += 1;

            for (i, topic) in plan.topics.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(stagger).await;
                }
                match pipeline
                    .complete_workflow(user_id, topic, plan.pillar, None)
                    .await
                {
                    Ok(insight) => {
                        summary.topics_run += 1;
                        // An unchanged updated_at from before this run means
                        // the pipeline answered from cache.
                        if insight.updated_at < now {
                            summary.cache_hits += 1;
                        }
                    }
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Scheduled research failed");
                        summary.failures.push(format!("{topic}: {e}"));
                    }
                }
            }

            let run_at = self.services.clock.now();
            plan.last_run_at = Some(run_at);
            plan.next_due_at = run_at + chrono::Duration::hours(frequency.interval_hours());
            user.save_plan(&plan).await?;
        }

        info!(
            user_id,
            frequency = %frequency,
            plans = summary.plans_run,
            topics = summary.topics_run,
            failures = summary.failures.len(),
            "Scheduled research run complete"
        );
        Ok(summary)
    }

    /// Weekly-report cron body: regenerate for every listed user whose last
    /// report is older than six days. The caller owns user enumeration —
    /// the store is strictly per-user.
    pub async fn run_weekly_reports(
        &self,
        user_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<WeeklyReportSummary, LeadScoutError> {
        let builder = ReportBuilder::new(self.services.clone());
        let mut summary = WeeklyReportSummary::default();

        for user_id in user_ids {
            let user = self.services.user_store(user_id);
            let last = user.last_weekly_report_at().await?;
            let stale = match last {
                Some(t) => now - t > chrono::Duration::days(REPORT_STALE_DAYS),
                None => true,
            };
            if !stale {
                summary.users_skipped += 1;
                continue;
            }

            let week_start = now - chrono::Duration::days(7);
            match builder.weekly_report(user_id, week_start, now).await {
                Ok(_) => summary.reports_generated += 1,
                Err(e) => warn!(user_id = %user_id, error = %e, "Weekly report failed"),
            }
        }

        info!(
            generated = summary.reports_generated,
            skipped = summary.users_skipped,
            "Weekly report cron complete"
        );
        Ok(summary)
    }
}
