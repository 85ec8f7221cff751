#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;

use args::Args;
use bridge_client::{BridgeChatClient, BridgeClient, ChatCompletionClient, ChatOptions, CreateRequest, Message};
use bridge_config::BridgeConfig;
use clap::Parser;
use futures::StreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    // Initialize telemetry
    let filter = bridge_telemetry::filter_directive(&config.telemetry, args.log_filter.as_deref(), "warn");
    bridge_telemetry::init(&config.telemetry, filter)?;

    tracing::debug!(
        config_path = ?args.config,
        host = %config.host,
        port = config.port,
        raw = args.raw,
        stream = !args.no_stream,
        "starting llm-bridge"
    );

    tokio::select! {
        result = run(&args, config) => result,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            // Dropping `run` drops the open stream and with it the connection
            tracing::info!("interrupted, request cancelled");
            println!();
            Ok(())
        }
    }
}

async fn run(args: &Args, config: BridgeConfig) -> anyhow::Result<()> {
    if args.raw {
        return run_raw(args, &config).await;
    }

    let client = BridgeChatClient::new(config)?;

    let mut request = CreateRequest::new(vec![Message::user(args.prompt.as_str())]).streaming(!args.no_stream);
    if let Some(temperature) = args.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let mut out = std::io::stdout();

    if args.no_stream {
        let completion = client.complete(&request).await?;
        writeln!(out, "{}", completion.content())?;
        return Ok(());
    }

    let mut stream = client.complete_stream(&request).await?;
    while let Some(chunk) = stream.next().await {
        out.write_all(chunk?.content().as_bytes())?;
        out.flush()?;
    }
    writeln!(out)?;

    Ok(())
}

async fn run_raw(args: &Args, config: &BridgeConfig) -> anyhow::Result<()> {
    let client = BridgeClient::from_config(config)?;
    let options = ChatOptions {
        vendor: config.vendor.clone(),
        family: config.family.clone(),
        options: config.options.clone(),
    };

    let mut out = std::io::stdout();

    if args.no_stream {
        let text = client.chat(&args.prompt, &options).await?;
        writeln!(out, "{text}")?;
        return Ok(());
    }

    let mut stream = client.chat_stream(&args.prompt, &options).await?;
    while let Some(fragment) = stream.next().await {
        out.write_all(fragment?.as_bytes())?;
        out.flush()?;
    }
    writeln!(out)?;

    Ok(())
}
