//! Transport abstraction traits for sac-sock clients.
//!
//! A [`Connector`] opens connections; a [`Connection`] moves [`WireFrame`]s.
//! The connection manager only talks to these traits, so tests can drive it
//! with in-memory transports.

use async_trait::async_trait;
use sacsock_protocol::WireFrame;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier for one connection attempt, used in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a process-unique connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let n = CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}", n))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection could not be established.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Opens connections to a sac-sock endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection to `url`.
    ///
    /// Resolves once the connection is open and ready to carry frames.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// An open connection.
#[async_trait]
pub trait Connection: Send {
    /// Get the connection's identifier.
    fn id(&self) -> &ConnectionId;

    /// Receive the next data frame.
    ///
    /// Returns `None` once the connection has closed cleanly. Control frames
    /// are handled internally and never returned.
    async fn recv(&mut self) -> Result<Option<WireFrame>, TransportError>;

    /// Send a frame.
    async fn send(&mut self, frame: WireFrame) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
