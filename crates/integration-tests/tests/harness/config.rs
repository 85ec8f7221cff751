//! Builder for client configuration pointing at a mock server

use bridge_config::BridgeConfig;
use serde_json::{Map, Value};

use super::mock_bridge::MockBridge;

/// Fluent builder for `BridgeConfig` used in tests
pub struct ConfigBuilder {
    config: BridgeConfig,
}

impl ConfigBuilder {
    /// Start from defaults, targeting the given mock
    pub fn new(mock: &MockBridge) -> Self {
        let addr = mock.addr();
        Self {
            config: BridgeConfig {
                host: addr.ip().to_string(),
                port: addr.port(),
                ..BridgeConfig::default()
            },
        }
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.config.family = Some(family.to_owned());
        self
    }

    pub fn without_vendor(mut self) -> Self {
        self.config.vendor = None;
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.config.options.insert(key.to_owned(), value);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout = secs;
        self
    }

    /// Build the loose mapping a host framework would pass
    pub fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(&self.config) {
            Ok(Value::Object(map)) => map,
            _ => unreachable!("config always serializes to an object"),
        }
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
