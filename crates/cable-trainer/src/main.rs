//! # Cable Trainer MCP Server
//!
//! Model Context Protocol server for driving a cable-resistance trainer
//! workout session.
//!
//! ## Overview
//!
//! This server provides MCP tools for:
//! - Set lifecycle (start, stop, pause, resume, reset, proceed)
//! - Just Lift with handle-triggered auto-start and auto-stop
//! - Routine navigation (load, next, previous, skip, jump)
//! - A simulated trainer (play reps, grab and release handles)
//!
//! ## Architecture
//!
//! This is Layer 4 - the server binary that ties together:
//! - cable-trainer-core: Data model and configuration
//! - cable-trainer-device: Trainer link and the simulated device
//! - cable-trainer-detector: Rep counting and auto-stop
//! - cable-trainer-session: Workout session control

use anyhow::Context;
use rmcp::{transport::stdio, ServiceExt};

use cable_trainer::TrainerMcpServer;
use cable_trainer_core::TrainerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1));

    let config = match config_path {
        Some(path) => TrainerConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => TrainerConfig::default(),
    };

    // Initialize logging; stdout belongs to the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "Cable Trainer MCP Server v{} starting (config: {})...",
        env!("CARGO_PKG_VERSION"),
        config_path.map(String::as_str).unwrap_or("defaults")
    );

    let server = TrainerMcpServer::new(config)
        .await
        .context("failed to start workout session")?;
    let coordinator = server.coordinator().clone();

    tracing::info!("Server initialized, starting stdio transport...");

    // Serve the MCP server over stdio
    let service = server.serve(stdio()).await.map_err(|e| {
        tracing::error!("Error starting server: {}", e);
        e
    })?;

    tracing::info!("Cable Trainer MCP Server running on stdio");

    // Wait for the service to complete
    service.waiting().await?;

    coordinator.shutdown();
    tracing::info!("Cable Trainer MCP Server shutting down");

    Ok(())
}
