//! Telemetry for the LLM bridge client
//!
//! Structured logging via the `tracing` ecosystem, written to stderr so it
//! never mixes with streamed completion text on stdout

use bridge_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Pick the filter directive to install
///
/// A directive given on the command line wins over the configured one,
/// which wins over `fallback`.
#[must_use]
pub fn filter_directive<'a>(config: &'a TelemetryConfig, cli: Option<&'a str>, fallback: &'a str) -> &'a str {
    cli.or(config.filter.as_deref()).unwrap_or(fallback)
}

/// Initialize logging from configuration
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &TelemetryConfig, log_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
