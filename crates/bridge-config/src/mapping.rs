//! Construction from loosely-typed configuration mappings
//!
//! Host frameworks hand client settings over as JSON objects that may carry
//! keys meant for other layers (`model`, `client`, ...). Only the keys the
//! bridge understands are read.

use serde_json::{Map, Value};

use crate::BridgeConfig;

/// Keys a mapping must contain before a client may be built from it
pub const REQUIRED_KEYS: [&str; 2] = ["host", "port"];

const KNOWN_KEYS: [&str; 7] = [
    "host",
    "port",
    "vendor",
    "family",
    "request_timeout",
    "options",
    "telemetry",
];

/// Failure to build a `BridgeConfig` from a mapping
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The mapping lacks `host` or `port`
    #[error("configuration is not compatible with the bridge client: both `host` and `port` are required")]
    Incompatible,

    /// A known key holds a value of the wrong shape, or validation failed
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Whether a configuration mapping names both a host and a port
pub fn is_compatible(config: &Map<String, Value>) -> bool {
    REQUIRED_KEYS.iter().all(|key| config.contains_key(*key))
}

impl BridgeConfig {
    /// Build a configuration from a loose mapping
    ///
    /// Unknown keys are ignored; absent known keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::Incompatible` if `host` or `port` is missing,
    /// and `MappingError::Invalid` if a value has the wrong type or the
    /// result does not validate
    pub fn from_map(config: &Map<String, Value>) -> Result<Self, MappingError> {
        if !is_compatible(config) {
            return Err(MappingError::Incompatible);
        }

        let known: Map<String, Value> = config
            .iter()
            .filter(|(key, _)| KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let parsed: Self =
            serde_json::from_value(Value::Object(known)).map_err(|e| MappingError::Invalid(e.to_string()))?;

        parsed.validate().map_err(|e| MappingError::Invalid(e.to_string()))?;

        Ok(parsed)
    }
}
