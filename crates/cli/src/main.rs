mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ankimcp_anki::{AnkiClient, SchemaCache};
use ankimcp_core::{config, Config};
use ankimcp_mcp::{McpServer, StdioTransport};
use ankimcp_tool_runtime::{register_anki_tools, AnkiState, ToolRegistry};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Stdout carries the protocol, so logs go to stderr.
    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    config::load_dotenv();
    let mut config = Config::from_env();
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let client = Arc::new(
        AnkiClient::new(config.anki.clone()).context("failed to build AnkiConnect client")?,
    );
    let cache = Arc::new(SchemaCache::with_ttl(client.clone(), config.server.schema_ttl()));
    let state = AnkiState::new(client, cache);

    let mut registry = ToolRegistry::new();
    register_anki_tools(&mut registry, state.clone()).context("failed to register tools")?;

    let mut server = McpServer::new(registry, state).with_name(config.server.name.clone());
    let mut transport = StdioTransport::new();

    tokio::select! {
        result = server.run(&mut transport) => {
            result.context("MCP server failed")?;
        }
        signal = shutdown_signal() => {
            match signal {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => warn!(error = %e, "Failed to listen for shutdown signals"),
            }
        }
    }

    info!("ankimcp exited cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = ctrl_c => result,
            _ = sigterm.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await
    }
}
