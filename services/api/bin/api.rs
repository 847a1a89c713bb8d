//! Main Entrypoint for the Persona API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the upstream service clients.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use persona_api::{config::Config, router::create_router, state::AppState};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    if config.avatar.api_key.is_none() {
        warn!("AVATAR_API_KEY is not set; avatar routes will report missing_avatar_api_key");
    }
    if config.agent.api_key.is_none() {
        warn!("AGENT_API_KEY is not set; chat and web-call routes will fail");
    }

    // --- 3. Initialize Shared Services ---
    let bind_address = config.bind_address;
    let avatar_base = config.avatar.api_base.clone();
    let agent_base = config.agent.api_base.clone();
    let app_state = Arc::new(AppState::from_config(config));

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        %avatar_base,
        %agent_base,
        %bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
