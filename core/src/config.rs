//! Manager configuration.
//!
//! Provides configuration options for the realtime manager.

use std::time::Duration;

/// Default staleness threshold in seconds.
pub const DEFAULT_STALE_AFTER_SECS: u64 = 60;

/// Configuration for a realtime manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long a connection may go without a liveness signal before
    /// `is_client_alive` reports it dead.
    pub stale_after: Duration,

    /// Interval for the optional background stale sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            sweep_interval: None,
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staleness threshold.
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Enables the background stale sweep at the given interval.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stale_after.is_zero() {
            return Err(ConfigError::InvalidStaleAfter);
        }
        if self.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The staleness threshold is zero.
    #[error("stale_after must be non-zero")]
    InvalidStaleAfter,

    /// The sweep interval is zero.
    #[error("sweep_interval must be non-zero")]
    InvalidSweepInterval,
}
