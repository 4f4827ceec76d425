//! Connection manager task.
//!
//! One task per client owns the live connection. It opens connections,
//! pumps frames in both directions, runs the lifecycle callbacks and
//! schedules reconnects. Client handles talk to it over a command channel.

use crate::client::Shared;
use crate::metrics::{self, ConnectionMetricsGuard};
use sacsock_core::{Lifecycle, ReadyState, ReconnectPolicy};
use sacsock_protocol::WireFrame;
use sacsock_transport::{Connection, ConnectionId, Connector};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

/// Requests from client handles.
#[derive(Debug)]
pub(crate) enum Command {
    /// Write an encoded frame to the open connection.
    Send(WireFrame),
    /// Close the connection and stop.
    Close,
}

pub(crate) struct ConnectionManager {
    url: Arc<str>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    lifecycle: Lifecycle,
    stopped: watch::Sender<bool>,
}

impl ConnectionManager {
    pub(crate) fn new(
        url: Arc<str>,
        policy: ReconnectPolicy,
        shared: Arc<Shared>,
        connector: Arc<dyn Connector>,
        commands: mpsc::UnboundedReceiver<Command>,
        stopped: watch::Sender<bool>,
    ) -> Self {
        Self {
            url,
            policy,
            shared,
            connector,
            commands,
            lifecycle: Lifecycle::new(),
            stopped,
        }
    }

    /// Run until closed, or until reconnecting is off and the connection drops.
    pub(crate) async fn run(mut self) {
        loop {
            if let Some(conn) = self.open().await {
                self.pump(conn).await;
            }

            self.shared.ready_state.store(ReadyState::Closed);
            self.drain_commands();

            let outcome = self.lifecycle.on_close(self.shared.reconnect_enabled());
            if outcome.notify_disconnect {
                self.shared.hooks.fire_disconnect();
            }
            if !outcome.schedule_reconnect {
                break;
            }

            if !self.wait_reconnect().await {
                break;
            }
            // close() may have run while the timer was pending.
            if !self.shared.reconnect_enabled() {
                debug!(url = %self.url, "Reconnect timer elapsed after close");
                break;
            }

            let mode = self.lifecycle.begin_reconnect(self.policy.replay_on_connect);
            metrics::record_reconnect_attempt();
            debug!(url = %self.url, mode = ?mode, "Reconnecting");
        }

        self.shared.ready_state.store(ReadyState::Closed);
        info!(url = %self.url, "Client stopped");
        self.stopped.send_replace(true);
    }

    /// Attempt one connection. A failed or aborted attempt counts as a close.
    async fn open(&mut self) -> Option<Box<dyn Connection>> {
        self.shared.ready_state.store(ReadyState::Connecting);
        debug!(url = %self.url, transport = self.connector.name(), "Connecting");

        let result = {
            let connect = self.connector.connect(&self.url);
            tokio::pin!(connect);

            loop {
                tokio::select! {
                    result = &mut connect => break Some(result),
                    command = self.commands.recv() => match command {
                        Some(Command::Send(frame)) => {
                            debug!(bytes = frame.len(), "Dropped frame sent while connecting");
                        }
                        Some(Command::Close) => break None,
                        None => {
                            self.shared.disable_reconnect();
                            break None;
                        }
                    },
                }
            }
        };

        match result {
            None => {
                debug!(url = %self.url, "Connection attempt aborted");
                None
            }
            Some(Err(e)) => {
                warn!(url = %self.url, error = %e, "Connection failed");
                metrics::record_error("connect");
                None
            }
            Some(Ok(conn)) => {
                self.shared.ready_state.store(ReadyState::Open);
                info!(connection = %conn.id(), url = %self.url, "Connected");
                if self.lifecycle.on_open() {
                    self.shared.hooks.fire_connect();
                }
                Some(conn)
            }
        }
    }

    /// Move frames until the connection ends.
    async fn pump(&mut self, mut conn: Box<dyn Connection>) {
        let _metrics_guard = ConnectionMetricsGuard::new();

        loop {
            tokio::select! {
                frame = conn.recv() => match frame {
                    Ok(Some(frame)) => self.handle_frame(conn.id(), frame),
                    Ok(None) => {
                        info!(connection = %conn.id(), "Connection closed by server");
                        break;
                    }
                    Err(e) => {
                        warn!(connection = %conn.id(), error = %e, "Receive failed");
                        metrics::record_error("receive");
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => {
                        metrics::record_frame(frame.len(), "outbound");
                        if let Err(e) = conn.send(frame).await {
                            warn!(connection = %conn.id(), error = %e, "Send failed");
                            metrics::record_error("send");
                            break;
                        }
                    }
                    Some(Command::Close) => {
                        self.shared.ready_state.store(ReadyState::Closing);
                        close_connection(conn.as_mut()).await;
                        break;
                    }
                    None => {
                        // Every client handle is gone.
                        self.shared.disable_reconnect();
                        self.shared.ready_state.store(ReadyState::Closing);
                        close_connection(conn.as_mut()).await;
                        break;
                    }
                },
            }
        }
    }

    fn handle_frame(&self, connection: &ConnectionId, frame: WireFrame) {
        metrics::record_frame(frame.len(), "inbound");

        match self.shared.codec.decode(&frame) {
            Ok(Some(message)) => {
                self.shared.registry.dispatch(message);
            }
            Ok(None) => {
                trace!(connection = %connection, frame = %frame, "Ignored frame without event");
            }
            Err(e) => {
                warn!(connection = %connection, error = %e, "Dropped undecodable frame");
                metrics::record_error("decode");
            }
        }
    }

    /// Wait out the reconnect interval.
    ///
    /// Returns `false` if every client handle was dropped meanwhile.
    async fn wait_reconnect(&mut self) -> bool {
        let interval = self.policy.interval();
        info!(url = %self.url, delay_ms = interval.as_millis() as u64, "Reconnect scheduled");

        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => {
                        debug!(bytes = frame.len(), "Dropped frame sent while disconnected");
                    }
                    Some(Command::Close) => {
                        // The timer keeps running and finds reconnecting disabled.
                        debug!(url = %self.url, "Close requested while waiting to reconnect");
                    }
                    None => {
                        self.shared.disable_reconnect();
                        return false;
                    }
                },
            }
        }
    }

    /// Discard commands aimed at the connection that just closed.
    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Send(frame)) => {
                    debug!(bytes = frame.len(), "Dropped frame queued on a closed connection");
                }
                Ok(Command::Close) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.shared.disable_reconnect();
                    break;
                }
            }
        }
    }
}

async fn close_connection(conn: &mut dyn Connection) {
    if let Err(e) = conn.close().await {
        debug!(connection = %conn.id(), error = %e, "Close failed");
    }
}
