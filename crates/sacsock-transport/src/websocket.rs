//! WebSocket transport implementation.
//!
//! This module provides a WebSocket client transport using tokio-tungstenite.
//! Every handshake offers the `sac-sock` subprotocol.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use sacsock_protocol::{subprotocol, WireFrame, SUBPROTOCOL};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue},
        protocol::WebSocketConfig as TungsteniteConfig,
        Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, trace, warn};

use crate::traits::{Connection, ConnectionId, Connector, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum incoming message size in bytes.
    pub max_message_size: usize,
    /// Disable Nagle's algorithm on the TCP stream.
    pub disable_nagle: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024 * 1024, // 16 MiB
            disable_nagle: true,
        }
    }
}

/// Opens WebSocket connections that speak `sac-sock`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Create a connector with the given configuration.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectFailed(format!("Invalid url {}: {}", url, e)))?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let mut ws_config = TungsteniteConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let (stream, response) =
            connect_async_with_config(request, Some(ws_config), self.config.disable_nagle)
                .await
                .map_err(|e| {
                    debug!(url = %url, error = %e, "WebSocket handshake failed");
                    TransportError::ConnectFailed(e.to_string())
                })?;

        let negotiated = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(subprotocol::is_supported)
            .unwrap_or(false);
        if !negotiated {
            warn!(url = %url, "Server did not confirm the sac-sock subprotocol");
        }

        let conn = WebSocketConnection::new(stream);
        debug!(connection = %conn.id, url = %url, "WebSocket connected");
        Ok(Box::new(conn))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A client-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    stream: WsStream,
    is_open: bool,
}

impl WebSocketConnection {
    fn new(stream: WsStream) -> Self {
        Self {
            id: ConnectionId::generate(),
            stream,
            is_open: true,
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<WireFrame>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(WireFrame::Text(text))),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(WireFrame::Binary(Bytes::from(data))))
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite queues the pong reply itself
                    trace!(connection = %self.id, "Control frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(connection = %self.id, close = ?frame, "Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) => {
                    debug!(connection = %self.id, "Connection closed");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!(connection = %self.id, error = %e, "WebSocket error");
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, frame: WireFrame) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        let message = match frame {
            WireFrame::Text(text) => Message::Text(text),
            WireFrame::Binary(data) => Message::Binary(data.to_vec()),
        };
        self.stream
            .send(message)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(()); // Already closed
        }
        self.is_open = false;

        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Other(format!("Failed to close: {}", e)))
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
