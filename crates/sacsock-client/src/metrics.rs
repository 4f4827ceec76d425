//! Client metrics.
//!
//! Uses the `metrics` crate for instrumentation and can export to Prometheus.
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "sacsock_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "sacsock_connections_active";
    pub const RECONNECT_ATTEMPTS_TOTAL: &str = "sacsock_reconnect_attempts_total";
    pub const FRAMES_TOTAL: &str = "sacsock_frames_total";
    pub const FRAMES_BYTES: &str = "sacsock_frames_bytes";
    pub const ERRORS_TOTAL: &str = "sacsock_errors_total";
}

/// Describe all client metrics.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of connections opened"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Whether a connection is currently open"
    );
    metrics::describe_counter!(
        names::RECONNECT_ATTEMPTS_TOTAL,
        "Total number of reconnect attempts"
    );
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames moved");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames moved");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus exporter on `port`.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record an opened connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a closed connection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a reconnect attempt.
pub fn record_reconnect_attempt() {
    counter!(names::RECONNECT_ATTEMPTS_TOTAL).increment(1);
}

/// Record a frame moving in `direction` ("inbound" or "outbound").
pub fn record_frame(bytes: usize, direction: &'static str) {
    counter!(names::FRAMES_TOTAL, "direction" => direction).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Records a connection on creation and the disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}
