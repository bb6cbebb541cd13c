//! Shared application state.

use std::sync::Arc;

use relaycast_core::RealtimeManager;

/// State shared across all request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// The realtime manager owning all connection state.
    pub manager: Arc<RealtimeManager>,
}

impl AppState {
    /// Creates state around an existing manager.
    #[must_use]
    pub fn new(manager: Arc<RealtimeManager>) -> Self {
        Self { manager }
    }
}
