//! # sacsock-transport
//!
//! Client transport layer for sac-sock.
//!
//! The connection manager is written against the [`Connector`] and
//! [`Connection`] traits. The WebSocket implementation offers the `sac-sock`
//! subprotocol on every handshake and hands frames over as
//! [`sacsock_protocol::WireFrame`]s.
//!
//! ```rust,ignore
//! use sacsock_transport::{Connector, WebSocketConnector};
//!
//! async fn read_all(url: &str) -> Result<(), sacsock_transport::TransportError> {
//!     let mut conn = WebSocketConnector::default().connect(url).await?;
//!     while let Some(frame) = conn.recv().await? {
//!         // Decode frame
//!     }
//!     Ok(())
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, ConnectionId, Connector, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
