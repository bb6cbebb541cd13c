//! Manager event hooks.
//!
//! The surrounding application observes the manager through four hook
//! points: connection, disconnection, message, and error. Handlers run
//! synchronously in registration order; a panicking handler is isolated so
//! it can neither skip later handlers nor propagate to the code that raised
//! the event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::connection::ConnectionId;
use super::messages::Message;

/// An event raised by the manager.
#[derive(Debug, Clone)]
pub enum Event {
    /// A connection was registered.
    Connected {
        /// The new connection's id.
        connection_id: ConnectionId,
        /// The owning user.
        user_id: String,
    },

    /// A connection was removed.
    Disconnected {
        /// The removed connection's id.
        connection_id: ConnectionId,
        /// The owning user.
        user_id: String,
    },

    /// An inbound frame parsed into a message.
    Message {
        /// The originating connection.
        connection_id: ConnectionId,
        /// The parsed message.
        message: Message,
    },

    /// A recoverable error: a failed delivery, a malformed frame, or an
    /// error reported by the caller.
    Error {
        /// The connection involved, when known.
        connection_id: Option<ConnectionId>,
        /// Human-readable description.
        detail: String,
    },
}

impl Event {
    /// Returns the hook kind this event dispatches to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connection,
            Self::Disconnected { .. } => EventKind::Disconnection,
            Self::Message { .. } => EventKind::Message,
            Self::Error { .. } => EventKind::Error,
        }
    }
}

/// The four hook registration points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Fired by `add_client`.
    Connection,
    /// Fired by `remove_client` and `close`.
    Disconnection,
    /// Fired by `handle_message` on a parsed frame.
    Message,
    /// Fired on delivery failures, parse failures, and `handle_error`.
    Error,
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Registry of event handlers, one list per hook kind.
#[derive(Default)]
pub struct EventHooks {
    connection: RwLock<Vec<Handler>>,
    disconnection: RwLock<Vec<Handler>>,
    message: RwLock<Vec<Handler>>,
    error: RwLock<Vec<Handler>>,
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("connection", &self.handler_count(EventKind::Connection))
            .field(
                "disconnection",
                &self.handler_count(EventKind::Disconnection),
            )
            .field("message", &self.handler_count(EventKind::Message))
            .field("error", &self.handler_count(EventKind::Error))
            .finish()
    }
}

impl EventHooks {
    /// Creates an empty hook registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, kind: EventKind) -> &RwLock<Vec<Handler>> {
        match kind {
            EventKind::Connection => &self.connection,
            EventKind::Disconnection => &self.disconnection,
            EventKind::Message => &self.message,
            EventKind::Error => &self.error,
        }
    }

    /// Registers a handler for the given hook kind.
    pub fn register<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut handlers = match self.list(kind).write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.push(Arc::new(handler));
    }

    /// Returns the number of handlers registered for a hook kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        match self.list(kind).read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Dispatches an event to every handler of its kind, in registration
    /// order. Returns the number of handlers that panicked.
    ///
    /// Handlers run on a snapshot of the list taken up front, so a handler
    /// may itself register further handlers; those only see later events.
    pub fn fire(&self, event: &Event) -> usize {
        let handlers: Vec<Handler> = {
            let guard = match self.list(event.kind()).read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.iter().map(Arc::clone).collect()
        };

        let mut panicked = 0;
        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler.as_ref()(event))).is_err() {
                panicked += 1;
                warn!(kind = ?event.kind(), "event handler panicked");
            }
        }
        panicked
    }
}
