use bridge_config::{ConfigLayer, EffectiveConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// Identifier stamped on every structured response
pub const COMPLETION_ID: &str = "chatcmpl-llm-bridge";

/// Model label reported to host frameworks
pub const MODEL_LABEL: &str = "llm-bridge-model";

// -- Conversation types --

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Text content
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

// -- Host framework request --

/// Parameters of one completion call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateRequest {
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
    /// Stream deltas instead of returning one buffered response
    #[serde(default)]
    pub stream: bool,
    /// Per-call configuration overrides
    #[serde(default)]
    pub config: Option<ConfigLayer>,
    /// Sampling temperature, merged into the options sent upstream
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Generation cap, merged into the options sent upstream
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl CreateRequest {
    /// A buffered request over the given history
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Parse host framework parameters
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if required fields are missing or malformed
    pub fn from_value(params: Value) -> Result<Self> {
        serde_json::from_value(params).map_err(|e| BridgeError::InvalidRequest(format!("malformed parameters: {e}")))
    }

    #[must_use]
    pub const fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ConfigLayer) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The per-call layer, with top-level sampling parameters folded in
    pub(crate) fn call_layer(&self) -> ConfigLayer {
        let mut layer = self.config.clone().unwrap_or_default();

        if self.temperature.is_some() {
            layer.temperature = self.temperature;
        }
        if self.max_tokens.is_some() {
            layer.max_tokens = self.max_tokens;
        }

        layer
    }
}

// -- Wire payload --

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Prompt text
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl ChatPayload {
    /// Build the payload for a prompt under a resolved configuration
    pub fn new(prompt: impl Into<String>, config: &EffectiveConfig) -> Self {
        Self {
            prompt: prompt.into(),
            vendor: config.vendor.clone(),
            family: config.family.clone(),
            options: config.options.clone(),
        }
    }
}

// -- Structured responses --

/// Why generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
}

/// A complete, buffered chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    /// Always `chat.completion`
    pub object: String,
    /// Placeholder timestamp, always 0
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: FinishReason,
}

impl ChatCompletion {
    /// Wrap generated text as an assistant reply
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            id: COMPLETION_ID.to_owned(),
            object: "chat.completion".to_owned(),
            created: 0,
            model: MODEL_LABEL.to_owned(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: FinishReason::Stop,
            }],
        }
    }

    /// Text of the first choice
    pub fn content(&self) -> &str {
        self.choices.first().map_or("", |choice| choice.message.content.as_str())
    }
}

/// One incremental piece of a streaming completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

/// A choice inside a streaming chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    /// Never set by the bridge: the stream ends by closing
    pub finish_reason: Option<FinishReason>,
}

/// Incremental content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub content: String,
}

impl ChatCompletionChunk {
    /// Wrap one text fragment as a delta record
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            id: COMPLETION_ID.to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created: 0,
            model: MODEL_LABEL.to_owned(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: Delta { content: content.into() },
                finish_reason: None,
            }],
        }
    }

    /// Text of the first choice's delta
    pub fn content(&self) -> &str {
        self.choices.first().map_or("", |choice| choice.delta.content.as_str())
    }
}

/// Token usage statistics
///
/// The bridge server does not report usage, so every field is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
