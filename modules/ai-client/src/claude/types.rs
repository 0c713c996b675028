use serde::{Deserialize, Serialize};

pub(crate) const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Request-side message. Only ever serialized; responses come back as
/// content blocks, not messages.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    /// Multi-turn scaffolding; the extraction paths are single-turn.
    #[allow(dead_code)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolDefinitionWire {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinitionWire>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatRequest {
    /// The shape every call in this crate uses: one system prompt, one user
    /// message, temperature 0.
    pub fn single_turn(model: &str, system: &str, user: &str) -> Self {
        Self {
            model: model.to_string(),
            system: Some(system.to_string()),
            messages: vec![WireMessage::user(user)],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: Some(0.0),
            tools: None,
            tool_choice: None,
        }
    }

    /// Force the answer through a single tool whose input schema is the
    /// extraction contract. The tool_choice pin means the model cannot fall
    /// back to prose.
    pub fn forced_tool(
        mut self,
        name: &str,
        description: &str,
        input_schema: serde_json::Value,
    ) -> Self {
        self.tool_choice = Some(serde_json::json!({ "type": "tool", "name": name }));
        self.tools = Some(vec![ToolDefinitionWire {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }]);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[allow(dead_code)]
        id: String,
        #[allow(dead_code)]
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    #[allow(dead_code)]
    pub stop_reason: Option<String>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<String> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            _ => None,
        })
    }

    pub fn tool_input(&self) -> Option<&serde_json::Value> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { input, .. } => Some(input),
            _ => None,
        })
    }
}
