//! Relaycast server binary.
//!
//! Entry point for the WebSocket broadcast server.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use relaycast_core::{ManagerConfig, RealtimeManager};
use relaycast_server::{AppState, Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaycast_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let host = env::var("RELAYCAST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("RELAYCAST_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let mut manager_config = ManagerConfig::default();
    if let Ok(secs) = env::var("RELAYCAST_STALE_SECS") {
        manager_config = manager_config.with_stale_after(Duration::from_secs(secs.parse()?));
    }
    if let Ok(secs) = env::var("RELAYCAST_SWEEP_SECS") {
        manager_config = manager_config.with_sweep_interval(Duration::from_secs(secs.parse()?));
    }

    let manager = Arc::new(RealtimeManager::new(manager_config.clone())?);
    let sweeper = manager.spawn_sweeper();

    let config = ServerConfig::new(host, port).with_manager(manager_config);
    let state = AppState::new(Arc::clone(&manager));

    tracing::info!(
        "Starting Relaycast server on {}:{}",
        config.host,
        config.port
    );

    let server = Server::new(config, state);
    let result = server.run().await;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    result
}
