use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use livescribe::audio::MicrophoneFactory;
use livescribe::{Config, HttpPersistence, NatsTransportFactory, SessionConfig, SessionController};
use tracing::info;

/// Live microphone transcription client
#[derive(Parser, Debug)]
#[command(name = "livescribe", version)]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/livescribe")]
    config: String,

    /// Override the configured input device
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("{} starting", config.service.name);

    // The auth token is read at start time; a missing token fails the
    // session start, not the process boot.
    let token = std::env::var("LIVESCRIBE_TOKEN").ok();

    let mut session_config = SessionConfig::from_config(&config, token);
    if let Some(device) = args.device {
        session_config.device = device;
    }

    let controller = SessionController::new(
        session_config,
        Box::new(MicrophoneFactory),
        Box::new(NatsTransportFactory::new(&config.stream.nats_url)),
        Arc::new(HttpPersistence::new(&config.persist.api_url)),
    );

    controller.start().await?;
    info!("Recording; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    controller.stop().await?;

    for paragraph in controller.paragraphs() {
        println!("{}", paragraph);
    }

    if let Some(err) = controller.last_error() {
        info!("Session ended with error: {}", err);
    }

    Ok(())
}
