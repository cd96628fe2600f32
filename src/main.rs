//! Nixora - Page Builder Server
//!
//! CLI entry point for the Nixora builder backend.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod cli;
mod middleware;
mod server;
mod websocket;

const DEFAULT_LOG_FILTER: &str = "nixora=info,nixora_canvas=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // A broken config is reported by the command itself, after logging is up
    let json_logs = server::load_config()
        .map(|config| config.logging.json)
        .unwrap_or(false);

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(fmt_layer)
        .init();

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
