#![allow(clippy::must_use_candidate)]

//! Configuration for the LLM bridge client
//!
//! Holds the construction-time settings, file loading with environment
//! expansion, and the pure per-request layer resolution

mod env;
pub mod layer;
mod loader;
mod mapping;
pub mod telemetry;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

pub use layer::{ConfigLayer, EffectiveConfig, resolve};
pub use mapping::{MappingError, REQUIRED_KEYS, is_compatible};
pub use telemetry::{LogFormat, TelemetryConfig};

/// Host used when none is configured
pub const DEFAULT_HOST: &str = "localhost";
/// Port the bridge server listens on by default
pub const DEFAULT_PORT: u16 = 3000;
/// Vendor requested when neither the call nor the client picks one
pub const DEFAULT_VENDOR: &str = "copilot";
/// Request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Construction-time configuration of a bridge client
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Hostname of the bridge server
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the bridge server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Default vendor, overridable per call
    #[serde(default = "default_vendor")]
    pub vendor: Option<String>,
    /// Default model family, overridable per call
    #[serde(default)]
    pub family: Option<String>,
    /// Timeout for a whole request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Default sampling options merged under any per-call options
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            vendor: default_vendor(),
            family: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            options: Map::new(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Base URL of the bridge server, e.g. `http://localhost:3000`
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}", self.host, self.port))
    }

    /// Endpoint completions are posted to
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL
    pub fn chat_url(&self) -> Result<Url, url::ParseError> {
        self.base_url()?.join("/chat")
    }

    /// Request timeout as a `Duration`
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// The client-level layer used during per-request resolution
    pub fn client_layer(&self) -> ConfigLayer {
        ConfigLayer {
            vendor: self.vendor.clone(),
            family: self.family.clone(),
            options: Some(self.options.clone()),
            timeout: Some(self.timeout()),
            temperature: None,
            max_tokens: None,
        }
    }

    /// The lowest-precedence layer for clients built from this config
    ///
    /// The vendor is taken as configured, so `vendor = None` leaves it out
    /// of every request that does not pick one itself.
    pub fn system_layer(&self) -> EffectiveConfig {
        EffectiveConfig {
            vendor: self.vendor.clone(),
            ..EffectiveConfig::system_default()
        }
    }
}

/// Reference configuration reported to host frameworks that ask for one
///
/// This is a template of sensible settings, not the values a client was
/// built with.
pub fn default_config_report() -> Map<String, Value> {
    let mut report = Map::new();
    report.insert("host".to_owned(), Value::from(DEFAULT_HOST));
    report.insert("port".to_owned(), Value::from(DEFAULT_PORT));
    report.insert("vendor".to_owned(), Value::from(DEFAULT_VENDOR));
    report.insert("family".to_owned(), Value::from("gpt-4o"));
    report.insert("temperature".to_owned(), Value::from(0.7));
    report.insert("request_timeout".to_owned(), Value::from(DEFAULT_REQUEST_TIMEOUT_SECS));
    report
}

fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

#[allow(clippy::unnecessary_wraps)]
fn default_vendor() -> Option<String> {
    Some(DEFAULT_VENDOR.to_owned())
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
