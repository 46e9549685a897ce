use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::cors::CorsLayer;
use tracing::info;

use super::api::{self, RelayState};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub client_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            client_url: DEFAULT_CLIENT_URL.to_string(),
        }
    }
}

/// CORS for the widget origin. Credentials are allowed, so origin, methods
/// and headers are all explicit.
pub fn cors_layer(client_url: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(client_url.trim_end_matches('/'))
        .with_context(|| format!("Invalid CLIENT_URL '{}'", client_url))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
        ]))
}

/// Build the relay router with CORS applied.
pub fn build_router(state: Arc<RelayState>, client_url: &str) -> Result<Router> {
    Ok(api::api_router()
        .with_state(state)
        .layer(cors_layer(client_url)?))
}

/// Start the relay and serve until Ctrl-C.
pub async fn start_server(config: ServerConfig, state: Arc<RelayState>) -> Result<()> {
    let app = build_router(state, &config.client_url)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        "File relay running on http://localhost:{}",
        local_addr.port()
    );
    info!("Accepting requests from: {}", config.client_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
