//! Client configuration.
//!
//! Configuration can be loaded from:
//! - A TOML configuration file
//! - Environment variables (`SACSOCK_URL`)

use crate::client::ClientOptions;
use anyhow::{Context, Result};
use sacsock_core::ReconnectPolicy;
use sacsock_protocol::HeaderMode;
use sacsock_transport::WebSocketConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the endpoint.
pub const URL_ENV: &str = "SACSOCK_URL";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint to connect to.
    #[serde(default = "default_url")]
    pub url: String,

    /// Reconnect behaviour.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Events the CLI prints as they arrive.
    #[serde(default)]
    pub subscribe: Vec<String>,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Maximum incoming message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Mark outgoing JSON frames with the `J` header flag.
    ///
    /// Servers that only understand unflagged frames misread flagged ones.
    #[serde(default)]
    pub json_header: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Exporter port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/socket".to_string()
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect: ReconnectPolicy::default(),
            transport: TransportConfig::default(),
            metrics: MetricsConfig::default(),
            subscribe: Vec::new(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            json_header: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the first default path that exists, or defaults.
    ///
    /// `SACSOCK_URL` overrides the endpoint either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "sacsock.toml",
            "/etc/sacsock/sacsock.toml",
            "~/.config/sacsock/sacsock.toml",
        ];

        let mut config = Self::default();
        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                config = Self::from_file(expanded.as_ref())?;
                break;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV) {
            if !url.is_empty() {
                self.url = url;
            }
        }
    }

    /// Header mode for outgoing frames.
    #[must_use]
    pub fn header_mode(&self) -> HeaderMode {
        if self.transport.json_header {
            HeaderMode::Symmetric
        } else {
            HeaderMode::Legacy
        }
    }

    /// Build the options a [`crate::Client`] is created with.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default()
            .reconnect(self.reconnect)
            .header_mode(self.header_mode())
            .websocket(WebSocketConfig {
                max_message_size: self.transport.max_message_size,
                ..WebSocketConfig::default()
            })
    }
}
