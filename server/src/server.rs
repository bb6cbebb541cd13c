//! HTTP server and routing.
//!
//! Wires the WebSocket upgrade, stats, and health routes into an axum
//! router and runs it.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use relaycast_core::ManagerStats;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::handler::ws_handler;
use crate::state::AppState;

/// Builds the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/stats", get(stats_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Returns current manager statistics.
async fn stats_handler(State(state): State<AppState>) -> Json<ManagerStats> {
    Json(state.manager.stats().await)
}

/// Liveness probe.
async fn healthz_handler() -> &'static str {
    "ok"
}

/// The Relaycast WebSocket server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server with the given configuration and state.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.config.addr()).await?;

        info!(addr = %self.config.addr(), "relaycast server listening");
        axum::serve(listener, app).await?;

        // Serve returned: close out any remaining connections.
        self.state.manager.close().await;
        Ok(())
    }
}
