//! Chat-completion adapter for multi-agent host frameworks
//!
//! `ChatCompletionClient` is the capability set a host framework needs from a
//! model client. `BridgeChatClient` implements it on top of the bridge
//! server's single-prompt streaming protocol.

use std::fmt;

use async_trait::async_trait;
use bridge_config::{BridgeConfig, ConfigLayer, EffectiveConfig, resolve};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{BridgeError, Result};
use crate::prompt::extract_prompt;
use crate::transport::{HttpTransport, TextStream, Transport};
use crate::types::{ChatCompletion, ChatCompletionChunk, ChatPayload, CreateRequest, MODEL_LABEL, Message, Usage};

/// Lazy stream of delta records
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunk>>;

/// Outcome of a completion call
pub enum CompletionResult {
    /// One buffered response with a finish reason
    Complete(ChatCompletion),
    /// Deltas, delivered as the server produces them
    Stream(ChunkStream),
}

impl CompletionResult {
    /// The buffered response, if this was a non-streaming call
    pub fn into_complete(self) -> Option<ChatCompletion> {
        match self {
            Self::Complete(completion) => Some(completion),
            Self::Stream(_) => None,
        }
    }

    /// The delta stream, if this was a streaming call
    pub fn into_stream(self) -> Option<ChunkStream> {
        match self {
            Self::Complete(_) => None,
            Self::Stream(stream) => Some(stream),
        }
    }

    /// Full generated text, draining the stream if there is one
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the stream
    pub async fn text(self) -> Result<String> {
        match self {
            Self::Complete(completion) => Ok(completion.content().to_owned()),
            Self::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(chunk) = stream.next().await {
                    text.push_str(chunk?.content());
                }
                Ok(text)
            }
        }
    }
}

impl fmt::Debug for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(completion) => f.debug_tuple("Complete").field(completion).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}

/// Capabilities a host framework requires from a chat-completion client
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Produce one complete, buffered response
    async fn complete(&self, request: &CreateRequest) -> Result<ChatCompletion>;

    /// Produce a lazy stream of delta records
    async fn complete_stream(&self, request: &CreateRequest) -> Result<ChunkStream>;

    /// Produce a completion in the mode the request asks for
    async fn create(&self, request: &CreateRequest) -> Result<CompletionResult> {
        if request.stream {
            self.complete_stream(request).await.map(CompletionResult::Stream)
        } else {
            self.complete(request).await.map(CompletionResult::Complete)
        }
    }

    /// Convert a bare string into a message
    fn message_from_text(&self, text: &str) -> Message;

    /// Estimated cost of a response
    fn cost(&self, response: &ChatCompletion) -> f64;

    /// Token usage of a response
    fn usage(&self, response: &ChatCompletion) -> Usage;

    /// Configuration this client was built with
    fn config(&self) -> Map<String, Value>;

    /// Reference configuration for this client type
    fn default_config(&self) -> Map<String, Value>;

    /// Models this client can serve
    fn available_models(&self) -> Vec<String>;

    /// Whether the client runs on nothing but defaults
    fn is_empty(&self) -> bool;

    /// Whether a configuration mapping could build this client type
    fn is_compatible(&self, config: &Map<String, Value>) -> bool;
}

/// `ChatCompletionClient` backed by the LLM bridge server
///
/// Holds only immutable defaults and the transport, so one instance can
/// serve concurrent calls.
pub struct BridgeChatClient<T = HttpTransport> {
    config: BridgeConfig,
    chat_url: Url,
    client_layer: ConfigLayer,
    system: EffectiveConfig,
    transport: T,
}

impl BridgeChatClient {
    /// Build a client over HTTP
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the configuration does not validate
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Build a client from a loose configuration mapping
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the mapping lacks `host` or `port` or
    /// holds malformed values
    pub fn from_map(config: &Map<String, Value>) -> Result<Self> {
        Self::new(BridgeConfig::from_map(config)?)
    }
}

impl<T: Transport> BridgeChatClient<T> {
    /// Build a client over a custom transport
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the configuration does not validate
    pub fn with_transport(config: BridgeConfig, transport: T) -> Result<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;

        let chat_url = config
            .chat_url()
            .map_err(|e| BridgeError::InvalidRequest(format!("invalid bridge address '{}': {e}", config.host)))?;

        Ok(Self {
            client_layer: config.client_layer(),
            system: config.system_layer(),
            config,
            chat_url,
            transport,
        })
    }

    /// Construction-time configuration
    pub const fn bridge_config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The configuration a request would be sent with
    pub fn effective_config(&self, request: &CreateRequest) -> EffectiveConfig {
        resolve(&request.call_layer(), &self.client_layer, &self.system)
    }

    /// Resolve, extract, and open the upstream stream
    async fn open(&self, request: &CreateRequest) -> Result<TextStream> {
        let effective = self.effective_config(request);
        let prompt = extract_prompt(&request.messages)?;

        tracing::debug!(
            vendor = effective.vendor.as_deref(),
            family = effective.family.as_deref(),
            timeout_secs = effective.timeout.as_secs(),
            stream = request.stream,
            "resolved request configuration"
        );

        let payload = ChatPayload::new(prompt, &effective);

        self.transport
            .open_stream(&self.chat_url, &payload, effective.timeout)
            .await
    }
}

#[async_trait]
impl<T: Transport> ChatCompletionClient for BridgeChatClient<T> {
    async fn complete(&self, request: &CreateRequest) -> Result<ChatCompletion> {
        let content = self.open(request).await?.collect_text().await?;
        Ok(ChatCompletion::from_text(content))
    }

    async fn complete_stream(&self, request: &CreateRequest) -> Result<ChunkStream> {
        let fragments = self.open(request).await?;
        Ok(fragments
            .map(|fragment| fragment.map(ChatCompletionChunk::delta))
            .boxed())
    }

    fn message_from_text(&self, text: &str) -> Message {
        Message::user(text)
    }

    fn cost(&self, _response: &ChatCompletion) -> f64 {
        0.0
    }

    fn usage(&self, _response: &ChatCompletion) -> Usage {
        Usage::default()
    }

    fn config(&self) -> Map<String, Value> {
        match serde_json::to_value(&self.config) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn default_config(&self) -> Map<String, Value> {
        bridge_config::default_config_report()
    }

    fn available_models(&self) -> Vec<String> {
        vec![MODEL_LABEL.to_owned()]
    }

    fn is_empty(&self) -> bool {
        self.config == BridgeConfig::default()
    }

    fn is_compatible(&self, config: &Map<String, Value>) -> bool {
        bridge_config::is_compatible(config)
    }
}

impl<T> fmt::Debug for BridgeChatClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeChatClient")
            .field("chat_url", &self.chat_url)
            .finish_non_exhaustive()
    }
}
