//! Reconnect policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect behaviour, fixed at construction.
///
/// Missing fields take their defaults, so a partial TOML table or struct
/// update is merged over `enabled = true`, `replay_on_connect = true`,
/// `interval_ms = 5000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Reconnect after the connection drops.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run the connect callback again on every successful reconnect.
    #[serde(default = "default_true")]
    pub replay_on_connect: bool,

    /// Fixed delay between a disconnect and the next attempt.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    5_000
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            replay_on_connect: true,
            interval_ms: default_interval_ms(),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set whether reconnecting is enabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether the connect callback replays on reconnect.
    #[must_use]
    pub fn with_replay_on_connect(mut self, replay: bool) -> Self {
        self.replay_on_connect = replay;
        self
    }

    /// Set the reconnect interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The reconnect interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
