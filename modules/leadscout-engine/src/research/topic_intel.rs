//! Topic intelligence: google-dork query rotation and structured synthesis
//! of provider output. The research pipeline's LLM source runs through here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::Pillar;

use crate::providers::ProviderSet;

/// Structured synthesis of research text.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicSynthesis {
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub suggested_angles: Vec<String>,
}

const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You distill research material into a compact brief. Extract the concrete, \
citable key points (facts, numbers, named developments), the organizations \
and people mentioned, and content angles the material supports. Stay strictly \
within what the text says.";

/// Dork templates rotated per query slot. `{topic}`, `{term}`, `{industry}`
/// are substituted; rotation keeps repeated runs from hammering identical
/// queries.
const DORK_TEMPLATES: &[&str] = &[
    "{topic} {term}",
    "\"{topic}\" {industry} trends 2026",
    "intitle:\"{topic}\" report",
    "site:edu {topic} research",
    "{topic} statistics {term}",
];

/// Build the rotated query list for a topic. `rotation` shifts which
/// template each slot uses; deterministic given its value.
pub fn build_research_queries(
    topic: &str,
    pillar: Pillar,
    industry: Option<&str>,
    rotation: usize,
    count: usize,
) -> Vec<String> {
    let vocabulary = pillar.audience_vocabulary();
    let industry = industry.unwrap_or("education");

    (0..count)
        .map(|slot| {
            let template = DORK_TEMPLATES[(rotation + slot) % DORK_TEMPLATES.len()];
            let term = vocabulary[(rotation + slot) % vocabulary.len()];
            template
                .replace("{topic}", topic)
                .replace("{term}", term)
                .replace("{industry}", industry)
        })
        .collect()
}

/// Run a web-grounded research completion for the topic and synthesize it.
pub async fn research_topic(
    providers: &ProviderSet,
    topic: &str,
    pillar: Pillar,
    industry: Option<&str>,
) -> Result<(String, TopicSynthesis), LeadScoutError> {
    let audiences = pillar.audiences().join(", ");
    let prompt = format!(
        "Research the topic \"{topic}\" for an audience of {audiences}. \
         Cover current developments, named organizations and people, and \
         concrete numbers where available.{}",
        industry
            .map(|i| format!(" Focus on the {i} industry."))
            .unwrap_or_default()
    );

    let text = providers
        .research("You are a thorough web researcher.", &prompt)
        .await?;

    let synthesis = synthesize(providers, &text).await?;
    Ok((text, synthesis))
}

/// Structured synthesis of arbitrary research text. Falls back to a
/// line-based split when no extraction model is configured, so the pipeline
/// still produces key points with only a researcher wired up.
pub async fn synthesize(
    providers: &ProviderSet,
    text: &str,
) -> Result<TopicSynthesis, LeadScoutError> {
    let truncated = super::normalize::clip_text(text, 24_000);

    match providers
        .extract::<TopicSynthesis>(
            SYNTHESIS_SYSTEM_PROMPT,
            &format!("Synthesize this research:\n\n{truncated}"),
        )
        .await
    {
        Ok(synthesis) => Ok(synthesis),
        Err(LeadScoutError::Unavailable(_)) => Ok(fallback_synthesis(truncated)),
        Err(e) => Err(e),
    }
}

/// No-LLM fallback: sentences that look substantive become key points.
fn fallback_synthesis(text: &str) -> TopicSynthesis {
    let key_points: Vec<String> = text
        .split(['\n', '.'])
        .map(str::trim)
        .filter(|line| line.split_whitespace().count() >= 6)
        .take(10)
        .map(|line| line.to_string())
        .collect();

    TopicSynthesis {
        key_points,
        entities: Vec::new(),
        suggested_angles: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_rotate_templates() {
        let a = build_research_queries("AI tutoring", Pillar::ThoughtLeadership, None, 0, 3);
        let b = build_research_queries("AI tutoring", Pillar::ThoughtLeadership, None, 1, 3);
        assert_eq!(a.len(), 3);
        assert_ne!(a[0], b[0]);
        // Rotation shifts, so b's first query is a's second.
        assert_eq!(a[1], b[0]);
    }

    #[test]
    fn queries_substitute_topic_and_industry() {
        let queries =
            build_research_queries("AI tutoring", Pillar::ThoughtLeadership, Some("edtech"), 1, 1);
        assert_eq!(queries[0], "\"AI tutoring\" edtech trends 2026");
    }

    #[test]
    fn fallback_synthesis_keeps_substantive_lines() {
        let text = "Short line.\n\
                    District technology leaders report accelerating adoption of AI tutoring tools.\n\
                    Ok.";
        let synthesis = fallback_synthesis(text);
        assert_eq!(synthesis.key_points.len(), 1);
        assert!(synthesis.key_points[0].starts_with("District"));
    }
}
