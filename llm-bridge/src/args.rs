use std::path::PathBuf;

use bridge_config::BridgeConfig;
use clap::Parser;
use serde_json::Value;

/// LLM bridge client
#[derive(Debug, Parser)]
#[command(name = "llm-bridge", about = "Send a prompt to an LLM bridge server and print the reply")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "LLM_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Model vendor, e.g. `copilot`
    #[arg(long)]
    pub vendor: Option<String>,

    /// Model family, e.g. `gpt-4o`
    #[arg(long)]
    pub family: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Upper bound on generated tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Wait for the complete reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Send the prompt as-is, bypassing the chat-completion adapter
    #[arg(long)]
    pub raw: bool,

    /// Log filter directive, e.g. `bridge_client=debug`
    #[arg(long, env = "LLM_BRIDGE_LOG")]
    pub log_filter: Option<String>,

    /// Prompt to send
    pub prompt: String,
}

impl Args {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut BridgeConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }

        if let Some(port) = self.port {
            config.port = port;
        }

        if let Some(vendor) = &self.vendor {
            config.vendor = Some(vendor.clone());
        }

        if let Some(family) = &self.family {
            config.family = Some(family.clone());
        }

        // Raw mode has no per-call layer, so sampling parameters go to the client options
        if self.raw {
            if let Some(temperature) = self.temperature.and_then(serde_json::Number::from_f64) {
                config.options.insert("temperature".to_owned(), Value::Number(temperature));
            }

            if let Some(max_tokens) = self.max_tokens {
                config.options.insert("max_tokens".to_owned(), Value::from(max_tokens));
            }
        }
    }
}
