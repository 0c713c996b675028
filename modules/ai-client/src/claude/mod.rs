pub(crate) mod types;

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use types::*;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Name of the single tool extraction calls are pinned to.
const EXTRACTION_TOOL: &str = "record_extraction";

/// Anthropic messages client.
///
/// Structured extraction pins the response to a single `record_extraction`
/// tool whose input schema the caller supplies, so the model cannot answer
/// in free text. Parameters are deterministic (temperature 0) and identical
/// inputs extract identically.
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            http,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(api_key) => Ok(Self::new(api_key, model)),
            Err(_) => Err(anyhow!("set ANTHROPIC_API_KEY to use the Claude client")),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_messages(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, "Claude messages request");

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Claude API returned {status}: {body}");
        }
        Ok(response.json().await?)
    }

    /// Schema-enforced extraction: the answer is the forced tool call's
    /// input, validated against `schema` by the API. Typed deserialization
    /// and the reprompt-on-mismatch policy live with the caller.
    pub async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest::single_turn(&self.model, system, user).forced_tool(
            EXTRACTION_TOOL,
            "Record the structured data extracted from the input.",
            schema,
        );

        let response = self.post_messages(&request).await?;
        response
            .tool_input()
            .cloned()
            .ok_or_else(|| anyhow!("No structured output in Claude response"))
    }

    /// Plain completion with a system prompt. Deterministic parameters.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::single_turn(&self.model, &system.into(), &user.into());

        let response = self.post_messages(&request).await?;
        response
            .text()
            .ok_or_else(|| anyhow!("No response from Claude"))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat_completion("You are a research assistant.", prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_model() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        assert_eq!(ai.model(), "claude-haiku-4-5-20251001");
        assert_eq!(ai.base_url, ANTHROPIC_API_URL);
    }

    #[test]
    fn base_url_override_for_proxies() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("http://127.0.0.1:9900/v1");
        assert_eq!(ai.base_url, "http://127.0.0.1:9900/v1");
    }

    #[test]
    fn forced_tool_pins_the_tool_choice() {
        let request = ChatRequest::single_turn("claude-haiku-4-5-20251001", "sys", "user")
            .forced_tool(EXTRACTION_TOOL, "Record it.", serde_json::json!({"type": "object"}));
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["tool_choice"]["name"], EXTRACTION_TOOL);
        assert_eq!(wire["tools"][0]["name"], EXTRACTION_TOOL);
        assert_eq!(wire["tool_choice"]["type"], "tool");
        assert_eq!(wire["temperature"], 0.0);
    }
}
