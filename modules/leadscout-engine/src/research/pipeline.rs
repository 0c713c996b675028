use std::time::Duration;

use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    ActivityEvent, ActivityType, EngagementSignals, Insight, InsightStatus, Pillar,
    ResearchProvider, ResearchSource,
};
use leadscout_common::insight_dedup_hash;
use leadscout_store::UserStore;

use crate::deps::Services;
use crate::providers::{ScrapeOpts, SearchOpts};

use super::normalize::{clip_text, derive_tags, is_duplicate_point};
use super::targets::{extract_candidates, select_targets, DEFAULT_TARGET_LIMIT};
use super::topic_intel;

/// Outer deadline for a research workflow.
const RESEARCH_DEADLINE: Duration = Duration::from_secs(90);
/// Top search hits scraped by the firecrawl source.
const SCRAPE_TOP_K: usize = 3;
/// Batch mode cap on items per provider.
const BATCH_ITEM_CAP: usize = 5;
/// Snippet-only source keeps this many hits.
const SNIPPET_HITS: usize = 5;

pub struct ResearchPipeline {
    services: Services,
}

impl ResearchPipeline {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// The six-step research workflow: trigger with dedup-hash cache,
    /// multi-source fan-out, normalization, prospect-target extraction,
    /// guarded storage transitions, and activity integration.
    ///
    /// A cache hit returns the existing insight without touching any
    /// provider. Partial provider failure degrades; only zero successful
    /// sources fails the workflow.
    pub async fn complete_workflow(
        &self,
        user_id: &str,
        topic: &str,
        pillar: Pillar,
        industry: Option<&str>,
    ) -> Result<Insight, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let hash = insight_dedup_hash(topic, pillar);

        // Step A: trigger. The hash lookup runs before any provider call so
        // a cache hit costs nothing.
        if let Some(existing) = user.find_ready_insight_by_hash(&hash).await? {
            info!(
                user_id,
                topic,
                insight_id = %existing.insight_id,
                "Research cache hit"
            );
            return Ok(existing);
        }

        let now = self.services.clock.now();
        let mut insight = Insight::new(user_id, topic, pillar, &hash, now);
        user.save_insight(&insight).await?;

        info!(user_id, topic, pillar = %pillar, insight_id = %insight.insight_id, "Research workflow started");

        let work = self.run_workflow(&user, &mut insight, topic, pillar, industry);
        match tokio::time::timeout(RESEARCH_DEADLINE, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(user_id, topic, "Research workflow deadline exceeded");
                insight.status = InsightStatus::Failed;
                insight.updated_at = self.services.clock.now();
                user.save_insight(&insight).await?;

                let event = ActivityEvent::new(
                    user_id,
                    ActivityType::Error,
                    "Research workflow cancelled",
                    &format!("\"{topic}\" exceeded the research deadline"),
                    self.services.clock.now(),
                )
                .with_metadata("cancelled", serde_json::json!(true))
                .with_metadata("insight_id", serde_json::json!(insight.insight_id));
                if let Err(e) = self.services.realtime.publish(event).await {
                    warn!(error = %e, "Failed to publish cancellation activity");
                }

                Err(LeadScoutError::Cancelled)
            }
        }
    }

    async fn run_workflow(
        &self,
        user: &UserStore,
        insight: &mut Insight,
        topic: &str,
        pillar: Pillar,
        industry: Option<&str>,
    ) -> Result<Insight, LeadScoutError> {
        // Step B: multi-source fan-out.
        let (sources, first_error) = self.gather_sources(user, topic, pillar, industry).await;

        if sources.is_empty() {
            insight.status = InsightStatus::Failed;
            insight.updated_at = self.services.clock.now();
            user.save_insight(insight).await?;
            return Err(first_error
                .unwrap_or_else(|| LeadScoutError::Unavailable("no research sources".to_string())));
        }

        // Step C: normalize. Dedup key points across the source union while
        // keeping each point attached to the source that contributed it
        // first.
        insight.sources = dedup_across_sources(sources);
        let merged: Vec<String> = insight
            .sources
            .iter()
            .flat_map(|s| s.key_points.iter().cloned())
            .collect();
        insight.tags = derive_tags(topic, &merged);

        // Step E (first half): processing while targets extract. Guarded —
        // a ready insight never reverts.
        insight.status = InsightStatus::Processing;
        insight.updated_at = self.services.clock.now();
        if !user
            .save_insight_if_status(insight, InsightStatus::Collecting)
            .await?
        {
            // Lost the race: another worker finished this hash first.
            if let Some(done) = user.find_ready_insight_by_hash(&insight.dedup_hash).await? {
                return Ok(done);
            }
            return Err(LeadScoutError::Consistency(format!(
                "research_insights/{}",
                insight.insight_id
            )));
        }

        // Step D: prospect-target extraction.
        let combined = combined_source_text(&insight.sources);
        let candidates = extract_candidates(&self.services.providers, &combined).await;
        insight.prospect_targets = select_targets(candidates, pillar, DEFAULT_TARGET_LIMIT);

        insight.engagement_signals = engagement_signals(insight);

        // Step E (second half): ready.
        insight.status = InsightStatus::ReadyForContentGeneration;
        insight.updated_at = self.services.clock.now();
        if !user
            .save_insight_if_status(insight, InsightStatus::Processing)
            .await?
        {
            if let Some(done) = user.find_ready_insight_by_hash(&insight.dedup_hash).await? {
                return Ok(done);
            }
            return Err(LeadScoutError::Consistency(format!(
                "research_insights/{}",
                insight.insight_id
            )));
        }

        info!(
            insight_id = %insight.insight_id,
            sources = insight.sources.len(),
            targets = insight.prospect_targets.len(),
            tags = insight.tags.len(),
            "Research workflow complete"
        );

        // Step F: the insight is queryable and announced.
        let event = ActivityEvent::new(
            &insight.user_id,
            ActivityType::Insight,
            "Research insight ready",
            &format!("\"{topic}\" is ready for content generation"),
            self.services.clock.now(),
        )
        .with_metadata("insight_id", serde_json::json!(insight.insight_id))
        .with_metadata("pillar", serde_json::json!(pillar.to_string()));
        if let Err(e) = self.services.realtime.publish(event).await {
            warn!(error = %e, "Failed to publish insight activity");
        }

        Ok(insight.clone())
    }

    /// Launch up to three provider tasks concurrently. Batch mode staggers
    /// starts by 1–2 s and caps per-provider items. Partial failure is
    /// tolerated; every failure is recorded as a `research.source_failed`
    /// activity.
    async fn gather_sources(
        &self,
        user: &UserStore,
        topic: &str,
        pillar: Pillar,
        industry: Option<&str>,
    ) -> (Vec<ResearchSource>, Option<LeadScoutError>) {
        let batch = self.services.batch_mode;
        let stagger = |index: u64| {
            let jitter = self.services.rand.below(1000);
            async move {
                if batch && index > 0 {
                    tokio::time::sleep(Duration::from_millis(index * 1000 + jitter)).await;
                }
            }
        };

        let llm_task = async {
            if !self.services.providers.has_researcher() {
                return Err(LeadScoutError::Unavailable("research llm disabled".to_string()));
            }
            self.llm_source(topic, pillar, industry).await
        };

        let scrape_task = async {
            stagger(1).await;
            self.scraped_sources(topic).await
        };

        let snippet_task = async {
            stagger(2).await;
            self.snippet_source(topic, pillar).await
        };

        let (llm, scraped, snippets) = tokio::join!(llm_task, scrape_task, snippet_task);

        let mut sources = Vec::new();
        let mut first_error = None;

        for (label, result) in [
            ("perplexity", llm.map(|s| vec![s])),
            ("firecrawl", scraped),
            ("google", snippets.map(|s| vec![s])),
        ] {
            match result {
                Ok(batch_sources) => sources.extend(batch_sources),
                Err(e) => {
                    warn!(source = label, error = %e, "Research source failed");
                    let event = ActivityEvent::new(
                        user.user_id(),
                        ActivityType::Research,
                        "Research source failed",
                        &format!("{label}: {e}"),
                        self.services.clock.now(),
                    )
                    .with_metadata("event", serde_json::json!("research.source_failed"))
                    .with_metadata("source", serde_json::json!(label));
                    if let Err(publish_err) = self.services.realtime.publish(event).await {
                        warn!(error = %publish_err, "Failed to publish source failure");
                    }
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        (sources, first_error)
    }

    /// Source 1: web-grounded LLM research, synthesized into key points.
    async fn llm_source(
        &self,
        topic: &str,
        pillar: Pillar,
        industry: Option<&str>,
    ) -> Result<ResearchSource, LeadScoutError> {
        let (text, synthesis) =
            topic_intel::research_topic(&self.services.providers, topic, pillar, industry).await?;

        Ok(ResearchSource {
            source_type: ResearchProvider::Perplexity,
            url: format!("perplexity://research/{}", slug(topic)),
            summary: clip_text(&text, 600).to_string(),
            key_points: synthesis.key_points,
            collected_at: self.services.clock.now(),
        })
    }

    /// Source 2: scrape the top web-search hits and synthesize each page.
    async fn scraped_sources(&self, topic: &str) -> Result<Vec<ResearchSource>, LeadScoutError> {
        let cap = if self.services.batch_mode {
            SCRAPE_TOP_K.min(BATCH_ITEM_CAP)
        } else {
            SCRAPE_TOP_K
        };

        let hits = self
            .services
            .providers
            .search(
                topic,
                &SearchOpts {
                    num: Some(cap as u32 * 2),
                    ..Default::default()
                },
            )
            .await?;

        let mut sources = Vec::new();
        for hit in hits.into_iter().take(cap) {
            let opts = ScrapeOpts {
                main_content_only: true,
                ..Default::default()
            };
            match self.services.providers.scrape(&hit.url, &opts).await {
                Ok(page) => {
                    let synthesis =
                        topic_intel::synthesize(&self.services.providers, &page.text).await?;
                    sources.push(ResearchSource {
                        source_type: ResearchProvider::Firecrawl,
                        url: page.url,
                        summary: if hit.snippet.is_empty() {
                            clip_text(&page.text, 300).to_string()
                        } else {
                            hit.snippet
                        },
                        key_points: synthesis.key_points,
                        collected_at: self.services.clock.now(),
                    });
                }
                Err(e) => {
                    warn!(url = %hit.url, error = %e, "Research scrape failed, skipping hit");
                }
            }
        }

        if sources.is_empty() {
            return Err(LeadScoutError::Unavailable(
                "no pages scraped for research".to_string(),
            ));
        }
        Ok(sources)
    }

    /// Source 3: site-restricted search, snippets as key points.
    async fn snippet_source(
        &self,
        topic: &str,
        pillar: Pillar,
    ) -> Result<ResearchSource, LeadScoutError> {
        let queries = topic_intel::build_research_queries(topic, pillar, None, 3, 1);
        let query = queries
            .first()
            .cloned()
            .unwrap_or_else(|| topic.to_string());

        let hits = self
            .services
            .providers
            .search(
                &query,
                &SearchOpts {
                    num: Some(SNIPPET_HITS as u32),
                    ..Default::default()
                },
            )
            .await?;

        if hits.is_empty() {
            return Err(LeadScoutError::Unavailable("no search hits".to_string()));
        }

        let key_points: Vec<String> = hits
            .iter()
            .take(SNIPPET_HITS)
            .filter(|h| !h.snippet.is_empty())
            .map(|h| h.snippet.clone())
            .collect();

        Ok(ResearchSource {
            source_type: ResearchProvider::Google,
            url: hits[0].url.clone(),
            summary: hits[0].title.clone(),
            key_points,
            collected_at: self.services.clock.now(),
        })
    }
}

/// Remove near-duplicate key points across the source union. Earlier
/// sources keep their points; later sources lose the repeats.
fn dedup_across_sources(sources: Vec<ResearchSource>) -> Vec<ResearchSource> {
    let mut kept_union: Vec<String> = Vec::new();
    let mut out = Vec::new();

    for mut source in sources {
        let points = std::mem::take(&mut source.key_points);
        source.key_points = points
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|point| {
                if point.is_empty() || is_duplicate_point(&kept_union, point) {
                    return false;
                }
                kept_union.push(point.clone());
                true
            })
            .collect();
        out.push(source);
    }

    out
}

fn combined_source_text(sources: &[ResearchSource]) -> String {
    sources
        .iter()
        .flat_map(|s| {
            std::iter::once(s.summary.clone()).chain(s.key_points.iter().cloned())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic engagement signals from observable shape: more independent
/// sources and more distinct key points mean more confidence.
fn engagement_signals(insight: &Insight) -> EngagementSignals {
    let source_count = insight.sources.len() as f64;
    let point_count: usize = insight.sources.iter().map(|s| s.key_points.len()).sum();
    let target_count = insight.prospect_targets.len() as f64;

    EngagementSignals {
        relevance_score: (source_count / 3.0).min(1.0),
        trend_score: (point_count as f64 / 10.0).min(1.0),
        urgency_score: (0.2 + target_count / 40.0).min(1.0),
    }
}

fn slug(topic: &str) -> String {
    topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn source(provider: ResearchProvider, points: &[&str]) -> ResearchSource {
        ResearchSource {
            source_type: provider,
            url: "https://example.com".to_string(),
            summary: "summary".to_string(),
            key_points: points.iter().map(|s| s.to_string()).collect(),
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn cross_source_dedup_keeps_first_provider() {
        let point = "District technology leaders report accelerating AI tutoring adoption";
        let near_duplicate = format!("{point} today");
        let sources = vec![
            source(ResearchProvider::Perplexity, &[point]),
            source(
                ResearchProvider::Google,
                &[near_duplicate.as_str(), "A different note about embassy staffing"],
            ),
        ];
        let deduped = dedup_across_sources(sources);
        assert_eq!(deduped[0].key_points.len(), 1);
        assert_eq!(deduped[1].key_points.len(), 1);
        assert!(deduped[1].key_points[0].contains("embassy"));
    }

    #[test]
    fn signals_scale_with_source_shape() {
        let mut insight = Insight::new("u1", "t", Pillar::Referral, "h", Utc::now());
        insight.sources = vec![
            source(ResearchProvider::Perplexity, &["a b c d e f", "g h i j k l"]),
            source(ResearchProvider::Google, &["m n o p q r"]),
        ];
        let signals = engagement_signals(&insight);
        assert!(signals.relevance_score > 0.5);
        assert!(signals.trend_score > 0.0);
        assert!(signals.urgency_score >= 0.2);
    }

    #[test]
    fn slugs_are_url_safe() {
        assert_eq!(slug("AI in K-12 Education!"), "ai-in-k-12-education");
    }
}
