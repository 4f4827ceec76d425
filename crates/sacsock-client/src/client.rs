//! The public client handle.

use crate::manager::{Command, ConnectionManager};
use sacsock_core::{AtomicReadyState, EventRegistry, LifecycleHooks, ReadyState, ReconnectPolicy, RegistryError};
use sacsock_protocol::{FrameCodec, HeaderMode, Payload, ProtocolError};
use sacsock_transport::{Connector, WebSocketConfig, WebSocketConnector};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection is still being established.
    #[error("Not connected yet")]
    NotConnected,

    /// The connection is closing or closed.
    #[error("Transport closed")]
    TransportClosed,

    /// The event could not be encoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The event name cannot be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Options fixed when the client is created.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Reconnect behaviour.
    pub reconnect: ReconnectPolicy,
    /// Whether outgoing JSON frames carry the `J` header flag.
    pub header_mode: HeaderMode,
    /// WebSocket transport settings.
    pub websocket: WebSocketConfig,
}

impl ClientOptions {
    /// Set the reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the header mode for outgoing frames.
    #[must_use]
    pub fn header_mode(mut self, mode: HeaderMode) -> Self {
        self.header_mode = mode;
        self
    }

    /// Set the WebSocket transport settings.
    #[must_use]
    pub fn websocket(mut self, config: WebSocketConfig) -> Self {
        self.websocket = config;
        self
    }
}

/// State shared between client handles and the connection manager.
pub(crate) struct Shared {
    pub(crate) codec: FrameCodec,
    pub(crate) registry: EventRegistry,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) ready_state: AtomicReadyState,
    reconnect_enabled: AtomicBool,
}

impl Shared {
    pub(crate) fn reconnect_enabled(&self) -> bool {
        self.reconnect_enabled.load(Ordering::SeqCst)
    }

    /// Turn reconnecting off for good.
    pub(crate) fn disable_reconnect(&self) {
        self.reconnect_enabled.store(false, Ordering::SeqCst);
    }
}

/// A reconnecting sac-sock client.
///
/// The connection is opened in the background as soon as the client is
/// created; register callbacks right away. Handles are cheap to clone and
/// can be moved into callbacks, which may call any method re-entrantly.
///
/// The connection manager stops after [`Client::close`], or once every
/// handle is dropped. A callback holding a handle keeps the client alive
/// until `close` is called.
#[derive(Clone)]
pub struct Client {
    url: Arc<str>,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    stopped: watch::Receiver<bool>,
}

impl Client {
    /// Connect to `url` over WebSocket.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn connect(url: impl Into<String>, options: ClientOptions) -> Self {
        let connector = WebSocketConnector::new(options.websocket.clone());
        Self::with_connector(url, options, Arc::new(connector))
    }

    /// Connect to `url` with a custom transport.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_connector(
        url: impl Into<String>,
        options: ClientOptions,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let url: Arc<str> = Arc::from(url.into());
        let shared = Arc::new(Shared {
            codec: FrameCodec::with_mode(options.header_mode),
            registry: EventRegistry::new(),
            hooks: LifecycleHooks::new(),
            ready_state: AtomicReadyState::new(ReadyState::Connecting),
            reconnect_enabled: AtomicBool::new(options.reconnect.enabled),
        });
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (stopped_tx, stopped) = watch::channel(false);

        info!(
            url = %url,
            transport = connector.name(),
            reconnect = options.reconnect.enabled,
            "Starting client"
        );

        let manager = ConnectionManager::new(
            Arc::clone(&url),
            options.reconnect,
            Arc::clone(&shared),
            connector,
            command_rx,
            stopped_tx,
        );
        tokio::spawn(manager.run());

        Self {
            url,
            shared,
            commands,
            stopped,
        }
    }

    /// The endpoint this client connects to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state of the live transport.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.shared.ready_state.load()
    }

    /// Whether events can be emitted right now.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Set the callback run when a connection opens, replacing any previous one.
    pub fn on_connect<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.hooks.on_connect(callback);
    }

    /// Set the callback run when a connection drops, replacing any previous one.
    pub fn on_disconnect<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.hooks.on_disconnect(callback);
    }

    /// Handle `event` with `callback`, replacing any previous handler for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the event name is empty or contains a control byte.
    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> Result<(), ClientError>
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        self.shared.registry.on(event, callback)?;
        Ok(())
    }

    /// Stop handling `event`. Returns `true` if a handler was registered.
    pub fn off(&self, event: &str) -> bool {
        self.shared.registry.off(event)
    }

    /// Send an event to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] while connecting,
    /// [`ClientError::TransportClosed`] once closing or closed, and
    /// [`ClientError::Protocol`] if the event cannot be encoded. Nothing is
    /// sent in any of these cases.
    pub fn emit(&self, event: &str, payload: impl Into<Payload>) -> Result<(), ClientError> {
        self.check_open(event)?;

        let payload = payload.into();
        let frame = self.shared.codec.encode(event, &payload)?;
        debug!(event = %event, kind = payload.kind(), frame = %frame, "Emit");

        self.commands
            .send(Command::Send(frame))
            .map_err(|_| ClientError::TransportClosed)
    }

    /// Serialize `value` as JSON and send it as `event`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::emit`]; serialization failures are
    /// [`ProtocolError::InvalidPayload`].
    pub fn emit_json<T: Serialize + ?Sized>(&self, event: &str, value: &T) -> Result<(), ClientError> {
        let payload = Payload::json(value).map_err(ProtocolError::InvalidPayload)?;
        self.emit(event, payload)
    }

    /// Close the connection and never reconnect.
    ///
    /// The disconnect callback still runs for an open connection. A reconnect
    /// timer that is already running still elapses but opens nothing.
    pub fn close(&self) {
        self.shared.disable_reconnect();
        if self.ready_state() != ReadyState::Closed {
            self.shared.ready_state.store(ReadyState::Closing);
        }
        if self.commands.send(Command::Close).is_err() {
            debug!(url = %self.url, "Close after connection manager stopped");
        }
    }

    /// Wait until the connection manager has stopped.
    pub async fn closed(&self) {
        let mut stopped = self.stopped.clone();
        // An error means the manager is gone, which is what we wait for.
        let _ = stopped.wait_for(|s| *s).await;
    }

    fn check_open(&self, event: &str) -> Result<(), ClientError> {
        match self.ready_state() {
            ReadyState::Open => Ok(()),
            ReadyState::Connecting => {
                warn!(event = %event, "Emit while the connection is not open yet");
                Err(ClientError::NotConnected)
            }
            ReadyState::Closing | ReadyState::Closed => {
                error!(event = %event, "Emit while the connection is closed");
                Err(ClientError::TransportClosed)
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("ready_state", &self.ready_state())
            .field("registry", &self.shared.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockPeer};
    use bytes::Bytes;
    use sacsock_protocol::WireFrame;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_millis(100);

    fn options(replay_on_connect: bool) -> ClientOptions {
        ClientOptions::default().reconnect(
            ReconnectPolicy::default()
                .with_replay_on_connect(replay_on_connect)
                .with_interval(INTERVAL),
        )
    }

    /// Let the manager task run until it is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Let the reconnect timer elapse.
    async fn wait_interval() {
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn count(c: &AtomicUsize) -> usize {
        c.load(Ordering::SeqCst)
    }

    struct Harness {
        client: Client,
        connector: MockConnector,
        connects: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
    }

    fn harness(options: ClientOptions) -> Harness {
        let connector = MockConnector::new();
        let client = Client::with_connector("ws://test/socket", options, Arc::new(connector.clone()));
        let (connects, on_connect) = counter();
        let (disconnects, on_disconnect) = counter();
        client.on_connect(on_connect);
        client.on_disconnect(on_disconnect);
        Harness {
            client,
            connector,
            connects,
            disconnects,
        }
    }

    async fn open(h: &Harness) -> MockPeer {
        let peer = h.connector.accept();
        settle().await;
        peer
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_runs_connect_callback() {
        let h = harness(options(true));
        assert_eq!(h.client.ready_state(), ReadyState::Connecting);

        let _peer = open(&h).await;
        assert_eq!(count(&h.connects), 1);
        assert_eq!(count(&h.disconnects), 0);
        assert!(h.client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incoming_frames_dispatch() {
        let h = harness(options(true));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.client
            .on("chat", move |p| sink.lock().unwrap().push(p))
            .unwrap();

        let peer = open(&h).await;
        peer.send(WireFrame::Text("chat\x02hello".into()));
        peer.send(WireFrame::Text("chat\x01J\x02{\"a\":1}".into()));
        peer.send(WireFrame::Text("ignored\x02nobody listens".into()));
        peer.send(WireFrame::Binary(Bytes::from_static(b"chat\x02\x09\x09")));
        settle().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Payload::Text("hello".into()),
                Payload::Json(json!({"a": 1})),
                Payload::Binary(Bytes::from_static(&[9, 9])),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_dropped() {
        let h = harness(options(true));
        let (hits, _) = counter();
        let c = Arc::clone(&hits);
        h.client
            .on("chat", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let peer = open(&h).await;
        peer.send(WireFrame::Text("chat\x01J\x02{broken".into()));
        peer.send(WireFrame::Text("chat\x02fine".into()));
        settle().await;

        assert_eq!(count(&hits), 1);
        assert!(h.client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_stops_dispatch() {
        let h = harness(options(true));
        let (hits, _) = counter();
        let c = Arc::clone(&hits);
        h.client
            .on("chat", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let peer = open(&h).await;
        assert!(h.client.off("chat"));
        assert!(!h.client.off("chat"));
        peer.send(WireFrame::Text("chat\x02hello".into()));
        settle().await;

        assert_eq!(count(&hits), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_sends_encoded_frames() {
        let h = harness(options(true));
        let mut peer = open(&h).await;

        h.client.emit("chat", "hi").unwrap();
        h.client.emit("join", json!({"room": "lobby"})).unwrap();
        h.client.emit("echo", vec![9u8, 9]).unwrap();
        settle().await;

        assert_eq!(peer.recv(), Some(WireFrame::Text("chat\x02hi".into())));
        assert_eq!(
            peer.recv(),
            Some(WireFrame::Text("join\x02{\"room\":\"lobby\"}".into()))
        );
        assert_eq!(
            peer.recv(),
            Some(WireFrame::Binary(Bytes::from_static(&[101, 99, 104, 111, 2, 9, 9])))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_symmetric_header_mode() {
        let h = harness(options(true).header_mode(HeaderMode::Symmetric));
        let mut peer = open(&h).await;

        #[derive(Serialize)]
        struct Join<'a> {
            room: &'a str,
        }
        h.client.emit_json("join", &Join { room: "lobby" }).unwrap();
        settle().await;

        assert_eq!(
            peer.recv(),
            Some(WireFrame::Text("join\x01J\x02{\"room\":\"lobby\"}".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_rejected_while_connecting() {
        let h = harness(options(true));
        assert!(matches!(
            h.client.emit("chat", "hi"),
            Err(ClientError::NotConnected)
        ));

        let mut peer = open(&h).await;
        settle().await;
        assert_eq!(peer.recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_rejected_after_disconnect() {
        let h = harness(options(true));
        let peer = open(&h).await;

        peer.disconnect();
        settle().await;

        assert_eq!(h.client.ready_state(), ReadyState::Closed);
        assert!(matches!(
            h.client.emit("chat", "hi"),
            Err(ClientError::TransportClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_invalid_event_name() {
        let h = harness(options(true));
        let _peer = open(&h).await;

        assert!(matches!(
            h.client.emit("bad\x02name", "hi"),
            Err(ClientError::Protocol(ProtocolError::InvalidEventName(_)))
        ));
        assert!(matches!(
            h.client.on("", |_| {}),
            Err(ClientError::Registry(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_suppressed_before_first_open() {
        let h = harness(options(false));

        h.connector.refuse();
        settle().await;
        assert_eq!(count(&h.disconnects), 0);
        assert_eq!(h.connector.attempts(), 1);

        wait_interval().await;
        assert_eq!(h.connector.attempts(), 2);

        // First success replays even though replay is disabled.
        let _peer = open(&h).await;
        assert_eq!(count(&h.connects), 1);
        assert_eq!(count(&h.disconnects), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_without_replay_is_silent() {
        let h = harness(options(false));
        let peer = open(&h).await;
        assert_eq!(count(&h.connects), 1);

        peer.disconnect();
        settle().await;
        assert_eq!(count(&h.disconnects), 1);

        wait_interval().await;
        let mut peer = open(&h).await;

        assert_eq!(h.connector.attempts(), 2);
        assert_eq!(count(&h.connects), 1);
        assert!(h.client.is_connected());

        h.client.emit("chat", "back").unwrap();
        settle().await;
        assert_eq!(peer.recv(), Some(WireFrame::Text("chat\x02back".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_with_replay() {
        let h = harness(options(true));
        let peer = open(&h).await;
        peer.disconnect();
        settle().await;

        wait_interval().await;
        let _peer = open(&h).await;

        assert_eq!(count(&h.connects), 2);
        assert_eq!(count(&h.disconnects), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_notify_disconnect_once() {
        let h = harness(options(true));
        let peer = open(&h).await;
        peer.disconnect();
        settle().await;

        for _ in 0..3 {
            wait_interval().await;
            h.connector.refuse();
            settle().await;
        }

        assert_eq!(h.connector.attempts(), 4);
        assert_eq!(count(&h.disconnects), 1);

        wait_interval().await;
        let peer = open(&h).await;
        assert_eq!(count(&h.connects), 2);

        peer.disconnect();
        settle().await;
        assert_eq!(count(&h.disconnects), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_disabled_by_policy() {
        let h = harness(ClientOptions::default().reconnect(ReconnectPolicy::disabled()));
        let peer = open(&h).await;

        peer.disconnect();
        settle().await;
        assert_eq!(count(&h.disconnects), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.connector.attempts(), 1);
        h.client.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_fires_disconnect_and_stops() {
        let h = harness(options(true));
        let peer = open(&h).await;

        h.client.close();
        settle().await;

        assert!(peer.is_closed());
        assert_eq!(count(&h.disconnects), 1);
        assert_eq!(h.client.ready_state(), ReadyState::Closed);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.connector.attempts(), 1);
        h.client.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_waiting_to_reconnect() {
        let h = harness(options(true));
        let peer = open(&h).await;
        peer.disconnect();
        settle().await;

        h.client.close();
        wait_interval().await;
        wait_interval().await;

        assert_eq!(h.connector.attempts(), 1);
        assert_eq!(count(&h.disconnects), 1);
        h.client.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_connecting() {
        let h = harness(options(true));
        settle().await;
        assert_eq!(h.connector.attempts(), 1);

        h.client.close();
        settle().await;

        assert_eq!(count(&h.connects), 0);
        assert_eq!(count(&h.disconnects), 0);
        h.client.closed().await;
        assert_eq!(h.connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_after_close_while_connecting() {
        let h = harness(options(true));
        settle().await;
        assert_eq!(h.client.ready_state(), ReadyState::Connecting);

        h.client.close();
        assert_eq!(h.client.ready_state(), ReadyState::Closing);
        assert!(matches!(
            h.client.emit("chat", "hi"),
            Err(ClientError::TransportClosed)
        ));

        h.client.closed().await;
        assert_eq!(h.client.ready_state(), ReadyState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callbacks_can_reenter_client() {
        let h = harness(options(true));
        let handle = h.client.clone();
        h.client.on_connect(move || {
            handle.emit("join", "lobby").unwrap();
        });
        let handle = h.client.clone();
        h.client
            .on("bye", move |_| {
                handle.close();
            })
            .unwrap();

        let mut peer = open(&h).await;
        assert_eq!(peer.recv(), Some(WireFrame::Text("join\x02lobby".into())));

        peer.send(WireFrame::Text("bye\x02now".into()));
        settle().await;
        assert!(peer.is_closed());
        h.client.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_client_stops_manager() {
        let h = harness(options(true));
        let peer = open(&h).await;

        let stopped = h.client.stopped.clone();
        drop(h.client);
        settle().await;

        assert!(peer.is_closed());
        assert!(stopped.has_changed().is_err() || *stopped.borrow());
    }
}
