//! Event registry for named event handlers.
//!
//! The registry maps an event name to exactly one handler. Registering a name
//! again replaces the previous handler, and dispatching to a name with no
//! handler is a silent no-op.

use dashmap::DashMap;
use sacsock_protocol::codec::validate_event_name;
use sacsock_protocol::{Message, Payload};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// A named event handler.
pub type EventHandler = Arc<dyn Fn(Payload) + Send + Sync>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Invalid event name.
    #[error("Invalid event name: {0}")]
    InvalidEvent(&'static str),
}

/// Maps event names to their handlers.
///
/// Handlers are cloned out of the map before they run, so a handler may
/// register or remove handlers (including itself) without deadlocking.
#[derive(Default)]
pub struct EventRegistry {
    handlers: DashMap<String, EventHandler>,
}

impl EventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, replacing any existing handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the event name is empty or contains a control byte.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        let event = event.into();
        validate_event_name(&event).map_err(RegistryError::InvalidEvent)?;

        if self.handlers.insert(event.clone(), Arc::new(handler)).is_some() {
            debug!(event = %event, "Replaced event handler");
        } else {
            debug!(event = %event, "Registered event handler");
        }
        Ok(())
    }

    /// Remove the handler for `event`.
    ///
    /// Returns `true` if a handler was registered.
    pub fn off(&self, event: &str) -> bool {
        let removed = self.handlers.remove(event).is_some();
        if removed {
            debug!(event = %event, "Removed event handler");
        }
        removed
    }

    /// Get the handler registered for `event`.
    #[must_use]
    pub fn handler(&self, event: &str) -> Option<EventHandler> {
        self.handlers.get(event).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a handler is registered for `event`.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Route a decoded message to its handler.
    ///
    /// Returns `true` if a handler ran.
    pub fn dispatch(&self, message: Message) -> bool {
        // The shard guard must be released before the handler runs.
        let Some(handler) = self.handler(&message.event) else {
            trace!(event = %message.event, "No handler for event");
            return false;
        };

        trace!(event = %message.event, kind = message.payload.kind(), "Dispatching event");
        handler(message.payload);
        true
    }

    /// Number of registered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no events are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Names of all registered events.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.event_names())
            .finish()
    }
}
