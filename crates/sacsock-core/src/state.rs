//! Transport ready state shared between the connection manager and callers.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the live transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Frames can be sent.
    Open = 1,
    /// Close requested, not yet complete.
    Closing = 2,
    /// No live connection.
    Closed = 3,
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for ReadyState {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadyState::Connecting),
            1 => Ok(ReadyState::Open),
            2 => Ok(ReadyState::Closing),
            3 => Ok(ReadyState::Closed),
            _ => Err("Invalid ready state"),
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A [`ReadyState`] readable from any thread.
#[derive(Debug)]
pub struct AtomicReadyState(AtomicU8);

impl AtomicReadyState {
    /// Create a cell holding `state`.
    #[must_use]
    pub fn new(state: ReadyState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    /// Read the current state.
    #[must_use]
    pub fn load(&self) -> ReadyState {
        ReadyState::try_from(self.0.load(Ordering::SeqCst)).unwrap_or(ReadyState::Closed)
    }

    /// Replace the current state.
    pub fn store(&self, state: ReadyState) {
        self.0.store(state.into(), Ordering::SeqCst);
    }
}

impl Default for AtomicReadyState {
    fn default() -> Self {
        Self::new(ReadyState::Connecting)
    }
}
