//! Content-generation auto-linking: drafts reference the insights that
//! informed them. Callers may pass explicit research IDs; otherwise the
//! best-matching ready insights are discovered automatically.

use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    ContentDraft, DraftStatus, Insight, InsightStatus, Pillar,
};
use leadscout_common::normalize_tag;
use leadscout_store::UserStore;

use crate::deps::Services;

/// Max insights linked to one draft.
const MAX_LINKED: usize = 3;

/// PACER content mix: share of generated content per pillar.
pub fn pacer_share(pillar: Pillar) -> f64 {
    match pillar {
        Pillar::Referral => 0.40,
        Pillar::ThoughtLeadership => 0.50,
        Pillar::StealthFounder => 0.10,
    }
}

/// Plan a week's content counts by the PACER mix. Rounding residue lands on
/// thought leadership, the largest share.
pub fn plan_weekly_mix(total_posts: usize) -> Vec<(Pillar, usize)> {
    let referral = (total_posts as f64 * pacer_share(Pillar::Referral)).round() as usize;
    let stealth = (total_posts as f64 * pacer_share(Pillar::StealthFounder)).round() as usize;
    let thought = total_posts.saturating_sub(referral + stealth);
    vec![
        (Pillar::Referral, referral),
        (Pillar::ThoughtLeadership, thought),
        (Pillar::StealthFounder, stealth),
    ]
}

pub struct ContentLinker {
    services: Services,
}

impl ContentLinker {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Insight auto-discovery: the query behind both the draft auto-linking
    /// and the `auto-discover` operation. Filters by pillar and/or audience
    /// tag, intersects tags with topic keywords when a topic is given, and
    /// returns up to `limit` ready insights, most relevant first.
    pub async fn auto_discover(
        &self,
        user_id: &str,
        pillar: Option<Pillar>,
        topic: Option<&str>,
        audiences: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Insight>, LeadScoutError> {
        let user = self.services.user_store(user_id);

        let mut candidates = match (pillar, audiences) {
            (Some(p), _) => user.ready_insights_for_pillar(p, limit.max(25)).await?,
            (None, Some(tags)) if !tags.is_empty() => {
                user.ready_insights_for_audience(&tags[0], limit.max(25)).await?
            }
            _ => {
                let mut all = Vec::new();
                for p in Pillar::ALL {
                    all.extend(user.ready_insights_for_pillar(p, limit.max(25)).await?);
                }
                all.sort_by(|a, b| {
                    b.engagement_signals
                        .relevance_score
                        .partial_cmp(&a.engagement_signals.relevance_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                all
            }
        };

        if let Some(tags) = audiences {
            candidates.retain(|insight| tags.iter().all(|t| insight.audiences.contains(t)));
        }

        let ids = auto_select_n(candidates.clone(), topic, limit);
        candidates.retain(|i| ids.contains(&i.insight_id));
        candidates
            .sort_by_key(|i| ids.iter().position(|id| id == &i.insight_id).unwrap_or(usize::MAX));
        Ok(candidates)
    }

    /// Resolve the `linked_research_ids` for a draft request. An explicit
    /// caller list overrides auto-discovery but is still filtered to ready
    /// insights - the invariant holds either way.
    pub async fn resolve_links(
        &self,
        user: &UserStore,
        pillar: Pillar,
        topic: Option<&str>,
        explicit: Option<&[String]>,
    ) -> Result<Vec<String>, LeadScoutError> {
        if let Some(ids) = explicit {
            let mut valid = Vec::new();
            for id in ids {
                match user.get_insight(id).await? {
                    Some(insight)
                        if insight.status == InsightStatus::ReadyForContentGeneration =>
                    {
                        valid.push(id.clone());
                    }
                    Some(_) => {
                        warn!(insight_id = %id, "Skipping non-ready insight in explicit links")
                    }
                    None => warn!(insight_id = %id, "Skipping unknown insight in explicit links"),
                }
            }
            return Ok(valid);
        }

        let candidates = user.ready_insights_for_pillar(pillar, 25).await?;
        Ok(auto_select(candidates, topic))
    }

    /// Create a content draft with auto-linked research.
    pub async fn create_draft(
        &self,
        user_id: &str,
        pillar: Pillar,
        topic: &str,
        template_id: &str,
        explicit_links: Option<&[String]>,
    ) -> Result<ContentDraft, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let linked = self
            .resolve_links(&user, pillar, Some(topic), explicit_links)
            .await?;

        let mut key_points = Vec::new();
        for id in &linked {
            if let Some(insight) = user.get_insight(id).await? {
                key_points.extend(
                    insight
                        .sources
                        .iter()
                        .flat_map(|s| s.key_points.iter().cloned())
                        .take(3),
                );
            }
        }

        let content = self.render_content(pillar, topic, &key_points).await?;
        let now = self.services.clock.now();

        let draft = ContentDraft {
            draft_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            pillar,
            topic: topic.to_string(),
            template_id: template_id.to_string(),
            content,
            suggested_hashtags: suggest_hashtags(pillar, topic),
            engagement_hook: key_points
                .first()
                .cloned()
                .unwrap_or_else(|| format!("What {topic} means for your work")),
            status: DraftStatus::Draft,
            linked_research_ids: linked,
            created_at: now,
        };

        user.save_draft(&draft).await?;
        info!(
            draft_id = %draft.draft_id,
            linked = draft.linked_research_ids.len(),
            "Content draft created"
        );

        Ok(draft)
    }

    async fn render_content(
        &self,
        pillar: Pillar,
        topic: &str,
        key_points: &[String],
    ) -> Result<String, LeadScoutError> {
        let audiences = pillar.audiences().join(", ");
        if self.services.providers.has_chat() && !key_points.is_empty() {
            let prompt = format!(
                "Write a short professional post about \"{topic}\" for {audiences}. \
                 Ground it in these research points:\n- {}",
                key_points.join("\n- ")
            );
            match self
                .services
                .providers
                .complete("You write concise, grounded professional content.", &prompt)
                .await
            {
                Ok(text) => return Ok(text),
                Err(LeadScoutError::Unavailable(_)) => {}
                Err(e) => return Err(e),
            }
        }

        // Template fallback keeps drafts flowing with no LLM configured.
        let body = key_points
            .iter()
            .map(|p| format!("• {p}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!("{topic}\n\n{body}"))
    }
}

/// Rank ready insights for a topic: tag intersection with topic keywords
/// first, then stored relevance. The store query already orders by
/// relevance, so a stable sort on intersection preserves that as the tiebreak.
fn auto_select(candidates: Vec<Insight>, topic: Option<&str>) -> Vec<String> {
    auto_select_n(candidates, topic, MAX_LINKED)
}

fn auto_select_n(candidates: Vec<Insight>, topic: Option<&str>, limit: usize) -> Vec<String> {
    let topic_keywords: Vec<String> = topic
        .map(|t| {
            t.split_whitespace()
                .map(normalize_tag)
                .filter(|w| w.len() >= 2)
                .collect()
        })
        .unwrap_or_default();

    let mut scored: Vec<(usize, Insight)> = candidates
        .into_iter()
        .map(|insight| {
            let overlap = insight
                .tags
                .iter()
                .filter(|tag| topic_keywords.contains(tag))
                .count();
            (overlap, insight)
        })
        .collect();

    if !topic_keywords.is_empty() {
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.retain(|(overlap, _)| *overlap > 0);
    }

    scored
        .into_iter()
        .take(limit)
        .map(|(_, insight)| insight.insight_id)
        .collect()
}

fn suggest_hashtags(pillar: Pillar, topic: &str) -> Vec<String> {
    let mut tags: Vec<String> = topic
        .split_whitespace()
        .filter(|w| w.len() >= 3)
        .take(2)
        .map(|w| {
            format!(
                "#{}",
                w.chars().filter(|c| c.is_alphanumeric()).collect::<String>()
            )
        })
        .collect();
    tags.push(match pillar {
        Pillar::Referral => "#MentalHealth".to_string(),
        Pillar::ThoughtLeadership => "#EdTech".to_string(),
        Pillar::StealthFounder => "#BuildInPublic".to_string(),
    });
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ready_insight(id: &str, tags: &[&str], relevance: f64) -> Insight {
        let mut insight = Insight::new("u1", "t", Pillar::ThoughtLeadership, id, Utc::now());
        insight.insight_id = id.to_string();
        insight.status = InsightStatus::ReadyForContentGeneration;
        insight.tags = tags.iter().map(|s| s.to_string()).collect();
        insight.engagement_signals.relevance_score = relevance;
        insight
    }

    #[test]
    fn pacer_mix_sums_to_total() {
        let mix = plan_weekly_mix(10);
        let total: usize = mix.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 10);
        assert_eq!(mix[0], (Pillar::Referral, 4));
        assert_eq!(mix[1], (Pillar::ThoughtLeadership, 5));
        assert_eq!(mix[2], (Pillar::StealthFounder, 1));
    }

    #[test]
    fn auto_select_prefers_tag_overlap() {
        let candidates = vec![
            ready_insight("i1", &["finance"], 0.9),
            ready_insight("i2", &["tutoring", "ai"], 0.5),
        ];
        let linked = auto_select(candidates, Some("AI tutoring"));
        assert_eq!(linked, vec!["i2"]);
    }

    #[test]
    fn auto_select_caps_at_three() {
        let candidates = (0..5)
            .map(|i| ready_insight(&format!("i{i}"), &["ai"], 0.5))
            .collect();
        let linked = auto_select(candidates, Some("ai"));
        assert_eq!(linked.len(), 3);
    }

    #[test]
    fn auto_select_without_topic_takes_top_relevance() {
        let candidates = vec![
            ready_insight("i1", &[], 0.9),
            ready_insight("i2", &[], 0.7),
        ];
        let linked = auto_select(candidates, None);
        assert_eq!(linked, vec!["i1", "i2"]);
    }
}
