//! Transport abstraction.
//!
//! The manager never owns a raw socket. It talks to an opaque transport
//! handle through the [`Transport`] trait: a non-blocking send, an open-state
//! check consulted before sending, and a close call used during removal and
//! shutdown.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

/// Errors reported by a transport handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport is closed.
    #[error("transport closed")]
    Closed,

    /// The outbound buffer is full.
    #[error("outbound buffer full")]
    Full,

    /// Underlying I/O failure.
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// A handle to one client's outbound byte stream.
///
/// Implementations must not block: a stalled peer is reported as an error
/// (or a dropped frame), never as a hang. The actual socket write happens
/// on the transport's own task, outside any manager lock.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Queues a frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is closed or cannot accept the
    /// frame without blocking.
    fn send(&self, frame: &str) -> Result<(), TransportError>;

    /// Returns true if the transport can currently accept frames.
    fn is_open(&self) -> bool;

    /// Closes the transport. Further sends fail with [`TransportError::Closed`].
    fn close(&self);
}

/// Default outbound queue capacity for [`ChannelTransport`].
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 100;

/// Channel-backed transport.
///
/// Frames are pushed onto a bounded mpsc queue; a writer task owned by the
/// transport layer drains the queue into the socket. Queue order gives the
/// per-connection delivery-order guarantee.
#[derive(Debug)]
pub struct ChannelTransport {
    sender: mpsc::Sender<String>,
    open: AtomicBool,
}

impl ChannelTransport {
    /// Creates a transport over an existing outbound queue.
    #[must_use]
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            sender,
            open: AtomicBool::new(true),
        }
    }

    /// Creates a transport and the receiving half of its queue.
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }

        match self.sender.try_send(frame.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(TransportError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.open.store(false, Ordering::Relaxed);
                Err(TransportError::Closed)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed) && !self.sender.is_closed()
    }

    fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
    }
}
