mod types;

use anyhow::{anyhow, Result};
use tracing::debug;

use types::*;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat client. Also speaks to Perplexity and other
/// compatible endpoints via `with_base_url` - the research pipeline's
/// "perplexity" source is this client pointed at their API.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, "OpenAI chat request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }

    /// Plain completion with deterministic parameters.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system),
                WireMessage::user(user),
            ],
            temperature: Some(0.0),
            max_tokens: Some(4096),
            response_format: None,
        };

        let response = self.chat(&request).await?;
        response
            .text()
            .ok_or_else(|| anyhow!("No response from OpenAI"))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat_completion("You are a research assistant.", prompt)
            .await
    }

    /// Strict-schema extraction with a caller-supplied schema. The provider
    /// rejects non-conforming output; typed deserialization and the
    /// reprompt-on-mismatch policy live with the caller.
    pub async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: String,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system),
                WireMessage::user(user),
            ],
            temperature: Some(0.0),
            max_tokens: Some(4096),
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema_name,
                    strict: true,
                    schema,
                },
            }),
        };

        let response = self.chat(&request).await?;
        let text = response
            .text()
            .ok_or_else(|| anyhow!("No response from OpenAI"))?;

        serde_json::from_str(unfence(&text)).map_err(|e| anyhow!("Failed to parse response: {e}"))
    }
}

/// Some models wrap JSON in a markdown fence even in schema mode; unwrap
/// it before parsing.
fn unfence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_custom_base_url() {
        let ai = OpenAi::new("sk-test", "sonar-pro").with_base_url("https://api.perplexity.ai");
        assert_eq!(ai.base_url, "https://api.perplexity.ai");
        assert_eq!(ai.model(), "sonar-pro");
    }

    #[test]
    fn unfence_unwraps_markdown_but_leaves_bare_json() {
        assert_eq!(unfence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(unfence("```\n[]\n```"), "[]");
        assert_eq!(unfence("  {\"a\":1}  "), "{\"a\":1}");
    }
}
