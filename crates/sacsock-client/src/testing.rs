//! In-memory transport for driving the connection manager in tests.

use async_trait::async_trait;
use sacsock_protocol::WireFrame;
use sacsock_transport::{Connection, ConnectionId, Connector, TransportError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

enum Outcome {
    Open(MockConnection),
    Refuse,
}

struct Inner {
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: Mutex<mpsc::UnboundedReceiver<Outcome>>,
    attempts: AtomicUsize,
}

/// A connector whose attempts stay pending until the test resolves them.
#[derive(Clone)]
pub(crate) struct MockConnector {
    inner: Arc<Inner>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                outcomes_tx,
                outcomes_rx: Mutex::new(outcomes_rx),
                attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Let the next attempt succeed, returning the server side.
    pub(crate) fn accept(&self) -> MockPeer {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let conn = MockConnection {
            id: ConnectionId::generate(),
            incoming,
            outgoing,
            closed: Arc::clone(&closed),
        };
        let _ = self.inner.outcomes_tx.send(Outcome::Open(conn));

        MockPeer {
            to_client,
            from_client,
            closed,
        }
    }

    /// Let the next attempt fail.
    pub(crate) fn refuse(&self) {
        let _ = self.inner.outcomes_tx.send(Outcome::Refuse);
    }

    /// Number of connection attempts started.
    pub(crate) fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.inner.outcomes_rx.lock().await.recv().await;
        match outcome {
            Some(Outcome::Open(conn)) => Ok(Box::new(conn)),
            Some(Outcome::Refuse) | None => {
                Err(TransportError::ConnectFailed("connection refused".into()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockConnection {
    id: ConnectionId,
    incoming: mpsc::UnboundedReceiver<WireFrame>,
    outgoing: mpsc::UnboundedSender<WireFrame>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<WireFrame>, TransportError> {
        Ok(self.incoming.recv().await)
    }

    async fn send(&mut self, frame: WireFrame) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ConnectionClosed);
        }
        self.outgoing
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// The server end of a [`MockConnection`].
pub(crate) struct MockPeer {
    to_client: mpsc::UnboundedSender<WireFrame>,
    from_client: mpsc::UnboundedReceiver<WireFrame>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    /// Push a frame to the client.
    pub(crate) fn send(&self, frame: WireFrame) {
        let _ = self.to_client.send(frame);
    }

    /// Next frame the client sent, if any.
    pub(crate) fn recv(&mut self) -> Option<WireFrame> {
        self.from_client.try_recv().ok()
    }

    /// Drop the connection from the server side.
    pub(crate) fn disconnect(self) {
        drop(self.to_client);
    }

    /// Whether the client closed or dropped its end.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
