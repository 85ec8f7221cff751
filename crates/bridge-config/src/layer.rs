//! Layered request configuration
//!
//! Each request is configured by three layers: the per-call overrides, the
//! client-level defaults chosen at construction, and the system defaults.
//! A field that is `None` in a layer is absent there and falls through to
//! the next layer. `Some` always wins, even for an empty string or an empty
//! options table.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_VENDOR};

/// One layer of request configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    /// Model vendor
    pub vendor: Option<String>,
    /// Model family
    pub family: Option<String>,
    /// Free-form options forwarded to the server
    pub options: Option<Map<String, Value>>,
    /// End-to-end request timeout, in seconds or as a duration string (`"90s"`)
    #[serde(deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,
    /// Sampling temperature, merged into `options`
    pub temperature: Option<f64>,
    /// Generation cap, merged into `options`
    pub max_tokens: Option<u32>,
}

impl ConfigLayer {
    /// An empty layer that sets nothing
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
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

    /// Apply this layer's options on top of `options`, key by key
    ///
    /// Sampling parameters go last so they beat the same key in the
    /// layer's own options table.
    fn merge_options_into(&self, options: &mut Map<String, Value>) {
        if let Some(ref own) = self.options {
            for (key, value) in own {
                options.insert(key.clone(), value.clone());
            }
        }

        if let Some(temperature) = self.temperature.and_then(Number::from_f64) {
            options.insert("temperature".to_owned(), Value::Number(temperature));
        }

        if let Some(max_tokens) = self.max_tokens {
            options.insert("max_tokens".to_owned(), Value::from(max_tokens));
        }
    }
}

/// Fully resolved configuration of one request
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    /// Vendor sent to the server, if any layer set one
    pub vendor: Option<String>,
    /// Family sent to the server, if any layer set one
    pub family: Option<String>,
    /// Merged options
    pub options: Map<String, Value>,
    /// End-to-end request timeout
    pub timeout: Duration,
}

impl EffectiveConfig {
    /// The lowest-precedence layer: `copilot`, no family, 300s, no options
    pub fn system_default() -> Self {
        Self {
            vendor: Some(DEFAULT_VENDOR.to_owned()),
            family: None,
            options: Map::new(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Merge the three configuration layers into one effective configuration
///
/// Precedence is `call` > `client` > `system` for every field. Options
/// merge key by key in the same order.
pub fn resolve(call: &ConfigLayer, client: &ConfigLayer, system: &EffectiveConfig) -> EffectiveConfig {
    let vendor = call
        .vendor
        .as_ref()
        .or(client.vendor.as_ref())
        .or(system.vendor.as_ref())
        .cloned();

    let family = call
        .family
        .as_ref()
        .or(client.family.as_ref())
        .or(system.family.as_ref())
        .cloned();

    let timeout = call.timeout.or(client.timeout).unwrap_or(system.timeout);

    let mut options = system.options.clone();
    client.merge_options_into(&mut options);
    call.merge_options_into(&mut options);

    EffectiveConfig {
        vendor,
        family,
        options,
        timeout,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeout {
    Seconds(u64),
    Text(String),
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimeout>::deserialize(deserializer)?;

    match raw {
        None => Ok(None),
        Some(RawTimeout::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawTimeout::Text(text)) => duration_str::parse(&text)
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid timeout '{text}': {e}"))),
    }
}
