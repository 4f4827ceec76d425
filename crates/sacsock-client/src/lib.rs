//! # sacsock-client
//!
//! A reconnecting client for the sac-sock event protocol.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sacsock_client::{Client, ClientOptions};
//!
//! # async fn run() -> Result<(), sacsock_client::ClientError> {
//! let client = Client::connect("ws://127.0.0.1:8080/socket", ClientOptions::default());
//!
//! let handle = client.clone();
//! client.on_connect(move || {
//!     let _ = handle.emit("join", "lobby");
//! });
//! client.on("chat", |payload| {
//!     println!("chat: {:?}", payload);
//! })?;
//!
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod manager;
pub mod metrics;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientError, ClientOptions};
pub use config::ClientConfig;
pub use sacsock_core::{ReadyState, ReconnectPolicy};
pub use sacsock_protocol::{HeaderMode, Payload};
pub use sacsock_transport::WebSocketConfig;
