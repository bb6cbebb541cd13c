//! Manager metrics.
//!
//! Atomic counters for monitoring connection churn and delivery outcomes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for a realtime manager instance.
#[derive(Debug)]
pub struct RelayMetrics {
    /// Total connections registered.
    connections_opened: AtomicU64,

    /// Total connections removed.
    connections_closed: AtomicU64,

    /// Total frames delivered to a transport.
    messages_sent: AtomicU64,

    /// Total deliveries dropped (closed transport, full buffer, send error).
    messages_dropped: AtomicU64,

    /// Total inbound frames handled.
    messages_received: AtomicU64,

    /// Total inbound frames that failed to parse.
    parse_errors: AtomicU64,

    /// Total event handlers that panicked.
    hook_panics: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            hook_panics: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a connection registered.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection removed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame delivered to a transport.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a delivery that was skipped or failed.
    pub fn record_message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound frame.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound frame that failed to parse.
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records panicked event handlers.
    pub fn record_hook_panics(&self, count: u64) {
        if count > 0 {
            self.hook_panics.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Returns the total connections registered.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the total connections removed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the currently active connections.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_opened()
            .saturating_sub(self.connections_closed())
    }

    /// Returns the total frames delivered.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns the total deliveries dropped.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Returns the total inbound frames handled.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns the total inbound parse failures.
    #[must_use]
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// Returns the total panicked event handlers.
    #[must_use]
    pub fn hook_panics(&self) -> u64 {
        self.hook_panics.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            active_connections: self.active_connections(),
            messages_sent: self.messages_sent(),
            messages_dropped: self.messages_dropped(),
            messages_received: self.messages_received(),
            parse_errors: self.parse_errors(),
            hook_panics: self.hook_panics(),
            uptime: self.uptime(),
        }
    }
}

/// A point-in-time snapshot of manager metrics.
#[derive(Debug, Clone)]
pub struct RelayMetricsSnapshot {
    /// Total connections registered.
    pub connections_opened: u64,
    /// Total connections removed.
    pub connections_closed: u64,
    /// Currently active connections.
    pub active_connections: u64,
    /// Frames delivered.
    pub messages_sent: u64,
    /// Deliveries dropped.
    pub messages_dropped: u64,
    /// Inbound frames handled.
    pub messages_received: u64,
    /// Inbound parse failures.
    pub parse_errors: u64,
    /// Panicked event handlers.
    pub hook_panics: u64,
    /// Uptime.
    pub uptime: Duration,
}
