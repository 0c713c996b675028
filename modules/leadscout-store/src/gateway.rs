use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use leadscout_common::types::*;

use crate::collections;
use crate::query::{Filter, Query};
use crate::store::DocStore;

/// Typed per-user view over the document store. All engine persistence goes
/// through here so collection names and document shapes live in one place.
#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn DocStore>,
    user_id: String,
}

fn to_doc<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize document")
}

fn from_doc<T: DeserializeOwned>(doc: Value) -> Result<T> {
    serde_json::from_value(doc).context("Failed to deserialize document")
}

fn from_docs<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>> {
    docs.into_iter().map(from_doc).collect()
}

impl UserStore {
    pub fn new(store: Arc<dyn DocStore>, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn raw(&self) -> Arc<dyn DocStore> {
        self.store.clone()
    }

    // --- Insights ---

    pub async fn save_insight(&self, insight: &Insight) -> Result<()> {
        self.store
            .put(
                &self.user_id,
                collections::RESEARCH_INSIGHTS,
                &insight.insight_id,
                to_doc(insight)?,
            )
            .await
    }

    pub async fn get_insight(&self, insight_id: &str) -> Result<Option<Insight>> {
        let doc = self
            .store
            .get(&self.user_id, collections::RESEARCH_INSIGHTS, insight_id)
            .await?;
        doc.map(from_doc).transpose()
    }

    /// The research cache lookup: an existing *ready* insight with this hash.
    pub async fn find_ready_insight_by_hash(&self, dedup_hash: &str) -> Result<Option<Insight>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::RESEARCH_INSIGHTS,
                Query::new()
                    .filter(Filter::eq("dedup_hash", dedup_hash))
                    .filter(Filter::eq("status", "ready_for_content_generation"))
                    .limit(1),
            )
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    /// Guarded insight write: the stored status must still be `expected`,
    /// otherwise the caller lost the race and must re-read. Keeps
    /// `ready_for_content_generation` from reverting to `collecting`.
    pub async fn save_insight_if_status(
        &self,
        insight: &Insight,
        expected: InsightStatus,
    ) -> Result<bool> {
        self.store
            .update_if(
                &self.user_id,
                collections::RESEARCH_INSIGHTS,
                &insight.insight_id,
                "status",
                Some(to_doc(&expected)?),
                to_doc(insight)?,
            )
            .await
    }

    /// Auto-linking query: ready insights for a pillar, most relevant first.
    pub async fn ready_insights_for_pillar(
        &self,
        pillar: Pillar,
        limit: usize,
    ) -> Result<Vec<Insight>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::RESEARCH_INSIGHTS,
                Query::new()
                    .filter(Filter::eq("pillar", pillar.to_string()))
                    .filter(Filter::eq("status", "ready_for_content_generation"))
                    .order_by_desc("engagement_signals.relevance_score")
                    .limit(limit),
            )
            .await?;
        from_docs(docs)
    }

    pub async fn ready_insights_for_audience(
        &self,
        audience: &str,
        limit: usize,
    ) -> Result<Vec<Insight>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::RESEARCH_INSIGHTS,
                Query::new()
                    .filter(Filter::array_contains("audiences", audience))
                    .filter(Filter::eq("status", "ready_for_content_generation"))
                    .order_by_desc("engagement_signals.relevance_score")
                    .limit(limit),
            )
            .await?;
        from_docs(docs)
    }

    // --- Prospects ---

    pub async fn save_prospect(&self, prospect: &DiscoveredProspect) -> Result<()> {
        self.store
            .put(
                &self.user_id,
                collections::PROSPECTS,
                &prospect.prospect_id,
                to_doc(prospect)?,
            )
            .await
    }

    pub async fn get_prospect(&self, prospect_id: &str) -> Result<Option<DiscoveredProspect>> {
        let doc = self
            .store
            .get(&self.user_id, collections::PROSPECTS, prospect_id)
            .await?;
        doc.map(from_doc).transpose()
    }

    pub async fn list_prospects(
        &self,
        approval: Option<ApprovalStatus>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProspect>> {
        let mut query = Query::new().order_by_desc("created_at").limit(limit);
        if let Some(status) = approval {
            query = query.filter(Filter::eq("approval_status", to_doc(&status)?));
        }
        let docs = self
            .store
            .query(&self.user_id, collections::PROSPECTS, query)
            .await?;
        from_docs(docs)
    }

    pub async fn get_prospects_by_ids(&self, ids: &[String]) -> Result<Vec<DiscoveredProspect>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.get_prospect(id).await? {
                out.push(p);
            }
        }
        Ok(out)
    }

    // --- Outreach sequences ---

    pub async fn save_sequence(&self, sequence: &OutreachSequence) -> Result<()> {
        self.store
            .put(
                &self.user_id,
                collections::OUTREACH_SEQUENCES,
                &sequence.sequence_id,
                to_doc(sequence)?,
            )
            .await
    }

    pub async fn get_sequence(&self, sequence_id: &str) -> Result<Option<OutreachSequence>> {
        let doc = self
            .store
            .get(&self.user_id, collections::OUTREACH_SEQUENCES, sequence_id)
            .await?;
        doc.map(from_doc).transpose()
    }

    pub async fn latest_sequence_for_prospect(
        &self,
        prospect_id: &str,
    ) -> Result<Option<OutreachSequence>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::OUTREACH_SEQUENCES,
                Query::new()
                    .filter(Filter::eq("prospect_id", prospect_id))
                    .order_by_desc("created_at")
                    .limit(1),
            )
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    // --- Content drafts ---

    pub async fn save_draft(&self, draft: &ContentDraft) -> Result<()> {
        self.store
            .put(
                &self.user_id,
                collections::CONTENT_DRAFTS,
                &draft.draft_id,
                to_doc(draft)?,
            )
            .await
    }

    pub async fn get_draft(&self, draft_id: &str) -> Result<Option<ContentDraft>> {
        let doc = self
            .store
            .get(&self.user_id, collections::CONTENT_DRAFTS, draft_id)
            .await?;
        doc.map(from_doc).transpose()
    }

    // --- Content metrics ---

    /// Append-style metric write; each update is its own document so the
    /// `(content_id, created_at desc)` index serves history queries.
    pub async fn save_content_metric(&self, id: &str, metric: &ContentMetric) -> Result<()> {
        self.store
            .put(&self.user_id, collections::CONTENT_METRICS, id, to_doc(metric)?)
            .await
    }

    pub async fn content_metrics_since(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ContentMetric>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::CONTENT_METRICS,
                Query::new()
                    .filter(Filter::gte("created_at", to_doc(&since)?))
                    .order_by_desc("created_at"),
            )
            .await?;
        from_docs(docs)
    }

    pub async fn latest_content_metric(&self, content_id: &str) -> Result<Option<ContentMetric>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::CONTENT_METRICS,
                Query::new()
                    .filter(Filter::eq("content_id", content_id))
                    .order_by_desc("created_at")
                    .limit(1),
            )
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    // --- Prospect metrics ---

    /// One evolving document per (prospect, sequence).
    pub fn prospect_metric_id(prospect_id: &str, sequence_id: &str) -> String {
        format!("{prospect_id}_{sequence_id}")
    }

    pub async fn save_prospect_metric(&self, metric: &ProspectMetric) -> Result<()> {
        let id = Self::prospect_metric_id(&metric.prospect_id, &metric.sequence_id);
        self.store
            .put(&self.user_id, collections::PROSPECT_METRICS, &id, to_doc(metric)?)
            .await
    }

    pub async fn get_prospect_metric(
        &self,
        prospect_id: &str,
        sequence_id: &str,
    ) -> Result<Option<ProspectMetric>> {
        let id = Self::prospect_metric_id(prospect_id, sequence_id);
        let doc = self
            .store
            .get(&self.user_id, collections::PROSPECT_METRICS, &id)
            .await?;
        doc.map(from_doc).transpose()
    }

    pub async fn prospect_metrics_since(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ProspectMetric>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::PROSPECT_METRICS,
                Query::new()
                    .filter(Filter::gte("updated_at", to_doc(&since)?))
                    .order_by_desc("updated_at"),
            )
            .await?;
        from_docs(docs)
    }

    // --- Learning patterns ---

    /// Deterministic document ID keyed by (pattern_type, pattern_key) - the
    /// upsert identity that makes pattern updates idempotent.
    pub fn pattern_doc_id(pattern_type: PatternType, pattern_key: &str) -> String {
        let sanitized: String = pattern_key
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{pattern_type}:{sanitized}")
    }

    pub async fn get_pattern(
        &self,
        pattern_type: PatternType,
        pattern_key: &str,
    ) -> Result<Option<LearningPattern>> {
        let id = Self::pattern_doc_id(pattern_type, pattern_key);
        let doc = self
            .store
            .get(&self.user_id, collections::LEARNING_PATTERNS, &id)
            .await?;
        doc.map(from_doc).transpose()
    }

    /// Compare-and-set on `last_updated` - `expected` is the value read
    /// before the modify step, `None` for a fresh pattern.
    pub async fn save_pattern_if_unchanged(
        &self,
        pattern: &LearningPattern,
        expected_last_updated: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<bool> {
        let id = Self::pattern_doc_id(pattern.pattern_type, &pattern.pattern_key);
        self.store
            .update_if(
                &self.user_id,
                collections::LEARNING_PATTERNS,
                &id,
                "last_updated",
                expected_last_updated.map(|t| to_doc(&t)).transpose()?,
                to_doc(pattern)?,
            )
            .await
    }

    pub async fn list_patterns(
        &self,
        pattern_type: Option<PatternType>,
        limit: usize,
    ) -> Result<Vec<LearningPattern>> {
        let mut query = Query::new().order_by_desc("average_performance").limit(limit);
        if let Some(pt) = pattern_type {
            query = query.filter(Filter::eq("pattern_type", pt.to_string()));
        }
        let docs = self
            .store
            .query(&self.user_id, collections::LEARNING_PATTERNS, query)
            .await?;
        from_docs(docs)
    }

    // --- Activities ---

    pub async fn append_activity(&self, event: &ActivityEvent) -> Result<()> {
        self.store
            .put(&self.user_id, collections::ACTIVITIES, &event.id, to_doc(event)?)
            .await
    }

    pub async fn list_activities(&self, limit: usize) -> Result<Vec<ActivityEvent>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::ACTIVITIES,
                Query::new().order_by_desc("timestamp").limit(limit),
            )
            .await?;
        from_docs(docs)
    }

    // --- Webhooks ---

    pub async fn save_webhook(&self, webhook: &Webhook) -> Result<()> {
        self.store
            .put(&self.user_id, collections::WEBHOOKS, &webhook.id, to_doc(webhook)?)
            .await
    }

    pub async fn get_webhook(&self, id: &str) -> Result<Option<Webhook>> {
        let doc = self.store.get(&self.user_id, collections::WEBHOOKS, id).await?;
        doc.map(from_doc).transpose()
    }

    pub async fn delete_webhook(&self, id: &str) -> Result<()> {
        self.store.delete(&self.user_id, collections::WEBHOOKS, id).await
    }

    pub async fn list_webhooks(&self, active_only: bool) -> Result<Vec<Webhook>> {
        let mut query = Query::new();
        if active_only {
            query = query.filter(Filter::eq("active", true));
        }
        let docs = self
            .store
            .query(&self.user_id, collections::WEBHOOKS, query)
            .await?;
        from_docs(docs)
    }

    // --- Scheduled topics ---

    pub async fn save_plan(&self, plan: &ScheduledTopicPlan) -> Result<()> {
        self.store
            .put(
                &self.user_id,
                collections::SCHEDULED_TOPICS,
                &plan.plan_id,
                to_doc(plan)?,
            )
            .await
    }

    pub async fn due_plans(
        &self,
        frequency: Frequency,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ScheduledTopicPlan>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::SCHEDULED_TOPICS,
                Query::new()
                    .filter(Filter::eq("frequency", to_doc(&frequency)?))
                    .filter(Filter::lte("next_due_at", to_doc(&now)?)),
            )
            .await?;
        from_docs(docs)
    }

    // --- Weekly reports ---

    pub async fn save_weekly_report(&self, id: &str, report: Value) -> Result<()> {
        self.store
            .put(&self.user_id, collections::WEEKLY_REPORTS, id, report)
            .await
    }

    pub async fn last_weekly_report_at(&self) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let docs = self
            .store
            .query(
                &self.user_id,
                collections::WEEKLY_REPORTS,
                Query::new().order_by_desc("generated_at").limit(1),
            )
            .await?;
        Ok(docs
            .into_iter()
            .next()
            .and_then(|d| d.get("generated_at").and_then(|v| v.as_str()).map(String::from))
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&chrono::Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use leadscout_common::insight_dedup_hash;

    fn user_store() -> UserStore {
        UserStore::new(Arc::new(MemoryStore::new()), "u1")
    }

    #[tokio::test]
    async fn insight_cache_lookup_only_matches_ready() {
        let store = user_store();
        let hash = insight_dedup_hash("AI in K-12 Education", Pillar::ThoughtLeadership);
        let mut insight = Insight::new(
            "u1",
            "AI in K-12 Education",
            Pillar::ThoughtLeadership,
            &hash,
            Utc::now(),
        );
        store.save_insight(&insight).await.unwrap();

        assert!(store
            .find_ready_insight_by_hash(&hash)
            .await
            .unwrap()
            .is_none());

        insight.status = InsightStatus::ReadyForContentGeneration;
        store.save_insight(&insight).await.unwrap();

        let found = store.find_ready_insight_by_hash(&hash).await.unwrap();
        assert_eq!(found.unwrap().insight_id, insight.insight_id);
    }

    #[tokio::test]
    async fn status_guard_prevents_ready_reverting() {
        let store = user_store();
        let mut insight = Insight::new("u1", "t", Pillar::Referral, "h", Utc::now());
        insight.status = InsightStatus::ReadyForContentGeneration;
        store.save_insight(&insight).await.unwrap();

        let mut stale = insight.clone();
        stale.status = InsightStatus::Collecting;
        let ok = store
            .save_insight_if_status(&stale, InsightStatus::Processing)
            .await
            .unwrap();
        assert!(!ok, "stale writer must lose");
    }

    #[tokio::test]
    async fn pattern_doc_id_is_deterministic() {
        let a = UserStore::pattern_doc_id(PatternType::Hashtag, "#EdTech");
        let b = UserStore::pattern_doc_id(PatternType::Hashtag, "#EdTech");
        assert_eq!(a, b);
        assert_eq!(a, "hashtag:_edtech");
    }

    #[tokio::test]
    async fn webhooks_crud() {
        let store = user_store();
        let hook = Webhook::new(
            "u1",
            "https://example.com/hook",
            vec![ActivityType::Prospect],
            Utc::now(),
        );
        store.save_webhook(&hook).await.unwrap();
        assert_eq!(store.list_webhooks(true).await.unwrap().len(), 1);

        let mut disabled = hook.clone();
        disabled.active = false;
        store.save_webhook(&disabled).await.unwrap();
        assert!(store.list_webhooks(true).await.unwrap().is_empty());

        store.delete_webhook(&hook.id).await.unwrap();
        assert!(store.get_webhook(&hook.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn due_plans_filters_by_frequency_and_time() {
        let store = user_store();
        let now = Utc::now();
        let plan = ScheduledTopicPlan {
            plan_id: "pl1".to_string(),
            user_id: "u1".to_string(),
            topics: vec!["AI tutoring".to_string()],
            frequency: Frequency::Weekly,
            pillar: Pillar::ThoughtLeadership,
            created_at: now,
            last_run_at: None,
            next_due_at: now - chrono::Duration::hours(1),
        };
        store.save_plan(&plan).await.unwrap();

        assert_eq!(store.due_plans(Frequency::Weekly, now).await.unwrap().len(), 1);
        assert!(store.due_plans(Frequency::Daily, now).await.unwrap().is_empty());

        let future = ScheduledTopicPlan {
            plan_id: "pl2".to_string(),
            next_due_at: now + chrono::Duration::hours(1),
            ..plan
        };
        store.save_plan(&future).await.unwrap();
        assert_eq!(store.due_plans(Frequency::Weekly, now).await.unwrap().len(), 1);
    }
}
