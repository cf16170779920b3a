//! Main Entrypoint for the Rev Voice API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Installing the TLS crypto provider used by the upstream connection.
//! 3. Loading the system prompt and building the shared upstream configuration.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::{Context, anyhow};
use gemini_realtime::TungsteniteConnector;
use rev_voice_api::{
    config::{Config, load_system_prompt},
    router::create_router,
    state::AppState,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
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

    // --- 3. Initialize TLS ---
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // --- 4. Initialize Shared State ---
    let system_prompt = load_system_prompt(&config.prompts_path);
    let live_config = Arc::new(config.live_config(system_prompt));

    if !config.public_dir.is_dir() {
        warn!(
            public_dir = %config.public_dir.display(),
            "Static client directory not found; only the API endpoints will be served"
        );
    }

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        live_config,
        connector: Arc::new(TungsteniteConnector),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        model = %config.gemini_model,
        voice = %config.gemini_voice,
        api_key = %config.gemini_api_key.masked(),
        environment = %config.environment,
        bind_address = %config.bind_address,
        "Rev voice relay configured. Starting server..."
    );
    info!("Client: http://{}/", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);
    info!("WebSocket: ws://{}/ws", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
