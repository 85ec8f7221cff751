use std::time::Duration;

use bridge_config::{BridgeConfig, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_VENDOR};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{BridgeError, Result};
use crate::transport::{HttpTransport, TextStream, Transport};
use crate::types::ChatPayload;

/// Model selection and options for one prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    /// Vendor of the language model, `copilot` by default
    pub vendor: Option<String>,
    /// Model family, e.g. `gpt-4o`
    pub family: Option<String>,
    /// Extra request options, e.g. `{"temperature": 0.7}`
    pub options: Map<String, Value>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            vendor: Some(DEFAULT_VENDOR.to_owned()),
            family: None,
            options: Map::new(),
        }
    }
}

impl ChatOptions {
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Let the server pick its default vendor
    #[must_use]
    pub fn without_vendor(mut self) -> Self {
        self.vendor = None;
        self
    }

    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    fn payload(&self, prompt: &str) -> ChatPayload {
        ChatPayload {
            prompt: prompt.to_owned(),
            vendor: self.vendor.clone(),
            family: self.family.clone(),
            options: self.options.clone(),
        }
    }
}

/// Prompt-in, text-out client for the LLM bridge server
#[derive(Debug, Clone)]
pub struct BridgeClient<T = HttpTransport> {
    chat_url: Url,
    timeout: Duration,
    transport: T,
}

impl BridgeClient {
    /// Create a client for the server at `host:port`
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the host does not form a valid URL
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::from_config(&BridgeConfig {
            host: host.to_owned(),
            port,
            ..BridgeConfig::default()
        })
    }

    /// Create a client from construction-time configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the host does not form a valid URL
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let chat_url = config
            .chat_url()
            .map_err(|e| BridgeError::InvalidRequest(format!("invalid bridge address '{}': {e}", config.host)))?;

        Ok(Self {
            chat_url,
            timeout: config.timeout(),
            transport: HttpTransport::new(),
        })
    }
}

impl<T: Transport> BridgeClient<T> {
    /// Create a client over a custom transport
    pub const fn with_transport(chat_url: Url, transport: T) -> Self {
        Self {
            chat_url,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            transport,
        }
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint prompts are posted to
    pub const fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Send a prompt and stream the response as it arrives
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailure` if the server is unreachable and
    /// `ServerError` if it answers with an error status
    pub async fn chat_stream(&self, prompt: &str, options: &ChatOptions) -> Result<TextStream> {
        self.transport
            .open_stream(&self.chat_url, &options.payload(prompt), self.timeout)
            .await
    }

    /// Send a prompt and wait for the complete response
    ///
    /// # Errors
    ///
    /// Same as [`chat_stream`](Self::chat_stream), plus any failure while
    /// reading the body
    pub async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String> {
        self.chat_stream(prompt, options).await?.collect_text().await
    }
}
