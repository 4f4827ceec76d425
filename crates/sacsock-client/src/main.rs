//! # sacsock
//!
//! Command-line client for sac-sock servers.
//!
//! ## Usage
//!
//! ```bash
//! # Connect with settings from sacsock.toml (or defaults)
//! sacsock
//!
//! # Run with a custom config
//! sacsock --config /path/to/sacsock.toml
//!
//! # Override the endpoint
//! SACSOCK_URL=ws://localhost:8080/socket sacsock
//! ```
//!
//! Each stdin line `<event> <payload>` is emitted; a payload that parses as
//! JSON is sent as JSON, anything else as text.

use anyhow::{Context, Result};
use clap::Parser;
use sacsock_client::{metrics, Client, ClientConfig, ClientError, Payload};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for sac-sock servers.
#[derive(Parser, Debug)]
#[command(name = "sacsock", version, about = "Command-line client for sac-sock servers")]
struct Cli {
    /// Config file to use instead of the default search paths.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sacsock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if config.metrics.enabled {
        metrics::init_metrics();
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            warn!(error = %e, "Failed to start metrics server");
        }
    }

    let client = Client::connect(config.url.clone(), config.client_options());
    client.on_connect(|| info!("Connected"));
    client.on_disconnect(|| warn!("Disconnected"));
    for event in &config.subscribe {
        let name = event.clone();
        client
            .on(event.clone(), move |payload| print_event(&name, &payload))
            .with_context(|| format!("Cannot subscribe to {:?}", event))?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => emit_line(&client, &line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            () = client.closed() => break,
        }
    }

    client.close();
    client.closed().await;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    match &cli.config {
        Some(path) => {
            let mut config = ClientConfig::from_file(path)?;
            config.apply_env();
            Ok(config)
        }
        None => ClientConfig::load(),
    }
}

fn emit_line(client: &Client, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let (event, data) = line.split_once(' ').unwrap_or((line, ""));
    let payload = match serde_json::from_str::<serde_json::Value>(data) {
        Ok(value) => Payload::Json(value),
        Err(_) => Payload::Text(data.to_string()),
    };

    match client.emit(event, payload) {
        Ok(()) => {}
        Err(ClientError::NotConnected) => eprintln!("not connected yet, dropped {}", event),
        Err(e) => eprintln!("{}: {}", event, e),
    }
}

fn print_event(event: &str, payload: &Payload) {
    match payload {
        Payload::Text(text) => println!("{} {}", event, text),
        Payload::Json(value) => println!("{} {}", event, value),
        Payload::Binary(data) => println!("{} <{} bytes>", event, data.len()),
    }
}
