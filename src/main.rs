//! tutor-gateway service entry point.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tutor_gateway::logging::init_logging;
use tutor_gateway::session::spawn_sweeper;
use tutor_gateway::{build_router, AppState, CompletionClient, Config, OpenAiClient, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Tutor Gateway v{}", env!("CARGO_PKG_VERSION"));

    let store = SessionStore::new(config.session.max_history, config.session.expiry_minutes);
    let completion = Arc::new(OpenAiClient::from_config(&config.llm));
    if !completion.is_ready() {
        tracing::warn!("No completion API key configured; /chat will report 503");
    }

    let state = AppState::new(store.clone(), completion);

    let sweeper = spawn_sweeper(store, config.session.sweep_interval_secs);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state).layer(cors);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
