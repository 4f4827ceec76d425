//! Connection lifecycle state machine.
//!
//! Tracks whether the client has ever connected and whether it is in the
//! middle of reconnecting. Those two flags decide when the disconnect callback
//! fires and whether a reconnect replays the connect callback.
//!
//! ```text
//! INITIAL ──▶ CONNECTING ──▶ OPEN ──▶ CLOSED ──(policy enabled)──▶ CONNECTING
//!                  │                    ▲
//!                  └────(failure)───────┘
//! ```

use tracing::debug;

/// How the next successful open is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Run the user's connect callback.
    Notify,
    /// Update bookkeeping only.
    Silent,
}

/// What the manager must do after a close event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    /// Run the user's disconnect callback.
    pub notify_disconnect: bool,
    /// Arm the reconnect timer.
    pub schedule_reconnect: bool,
}

/// Connection manager bookkeeping.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    connected_once: bool,
    reconnecting: bool,
    open_mode: OpenMode,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// State before the first connection attempt.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected_once: false,
            reconnecting: false,
            open_mode: OpenMode::Notify,
        }
    }

    /// Whether any connection has ever opened.
    #[must_use]
    pub fn connected_once(&self) -> bool {
        self.connected_once
    }

    /// Whether a reconnect is pending or in flight.
    #[must_use]
    pub fn reconnecting(&self) -> bool {
        self.reconnecting
    }

    /// Bind the open handling for a reconnect attempt.
    ///
    /// The connect callback replays when `replay_on_connect` is set, and
    /// always runs if no connection has succeeded yet, since the server may
    /// simply have been down for the first attempt.
    pub fn begin_reconnect(&mut self, replay_on_connect: bool) -> OpenMode {
        self.open_mode = if replay_on_connect || !self.connected_once {
            OpenMode::Notify
        } else {
            OpenMode::Silent
        };
        debug!(mode = ?self.open_mode, "Reconnect attempt armed");
        self.open_mode
    }

    /// Record a successful open.
    ///
    /// Returns `true` if the user's connect callback should run.
    pub fn on_open(&mut self) -> bool {
        self.connected_once = true;
        self.reconnecting = false;
        self.open_mode == OpenMode::Notify
    }

    /// Record a close, including a failed connection attempt.
    ///
    /// The disconnect callback is suppressed for connections that never
    /// opened and for repeated failures while already reconnecting.
    pub fn on_close(&mut self, reconnect_enabled: bool) -> CloseOutcome {
        let notify_disconnect = !self.reconnecting && self.connected_once;
        if reconnect_enabled {
            self.reconnecting = true;
        }
        CloseOutcome {
            notify_disconnect,
            schedule_reconnect: reconnect_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_open_notifies() {
        let mut lc = Lifecycle::new();
        assert!(lc.on_open());
        assert!(lc.connected_once());
        assert!(!lc.reconnecting());
    }

    #[test]
    fn test_close_before_open_is_silent() {
        let mut lc = Lifecycle::new();
        let outcome = lc.on_close(true);
        assert!(!outcome.notify_disconnect);
        assert!(outcome.schedule_reconnect);
        assert!(lc.reconnecting());
    }

    #[test]
    fn test_repeated_failures_notify_once() {
        let mut lc = Lifecycle::new();
        lc.on_open();

        assert!(lc.on_close(true).notify_disconnect);
        lc.begin_reconnect(true);
        assert!(!lc.on_close(true).notify_disconnect);
        lc.begin_reconnect(true);
        assert!(!lc.on_close(true).notify_disconnect);

        assert!(lc.on_open());
        assert!(lc.on_close(true).notify_disconnect);
    }

    #[test]
    fn test_replay_disabled_reconnect_is_silent() {
        let mut lc = Lifecycle::new();
        assert!(lc.on_open());
        lc.on_close(true);

        assert_eq!(lc.begin_reconnect(false), OpenMode::Silent);
        assert!(!lc.on_open());
        assert!(!lc.reconnecting());
        assert!(lc.connected_once());
    }

    #[test]
    fn test_replay_disabled_still_notifies_first_success() {
        let mut lc = Lifecycle::new();
        lc.on_close(true);

        assert_eq!(lc.begin_reconnect(false), OpenMode::Notify);
        assert!(lc.on_open());
    }

    #[test]
    fn test_close_with_reconnect_disabled() {
        let mut lc = Lifecycle::new();
        lc.on_open();
        let outcome = lc.on_close(false);
        assert!(outcome.notify_disconnect);
        assert!(!outcome.schedule_reconnect);
        assert!(!lc.reconnecting());
    }
}
