// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport and session.
//!
//! Every `open` dials a fresh socket and spawns two tasks:
//! 1. Writer task: drains the outgoing queue into the socket and sends a
//!    keep-alive ping on the configured interval
//! 2. Reader task: decodes sidecar frames into [`TransportEvent`]s and
//!    resolves pending request/response pairs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brokerbot_core::{
    AdapterType, BrokerError, ConnectionPhase, ConnectionUpdate, GroupMetadata, HealthStatus,
    InboundMessage, PluginAdapter, Session, SessionOptions, Transport, TransportEvent,
    TransportEvents,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{HelloOptions, IncomingFrame, OutgoingFrame};

/// Status reported when the socket drops without a closure frame.
const STATUS_SOCKET_LOST: u16 = 428;

const EVENT_CAPACITY: usize = 256;
const OUTGOING_CAPACITY: usize = 64;

type Reply = Result<serde_json::Value, String>;
type Pending = Arc<DashMap<String, oneshot::Sender<Reply>>>;

/// Dials the sidecar at a `ws://` or `wss://` url.
#[derive(Debug, Clone)]
pub struct BridgeTransport {
    url: String,
}

impl BridgeTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PluginAdapter for BridgeTransport {
    fn name(&self) -> &str {
        "bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, BrokerError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn open(
        &self,
        credentials: Option<serde_json::Value>,
        options: &SessionOptions,
    ) -> Result<(Arc<dyn Session>, TransportEvents), BrokerError> {
        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (socket, _response) = tokio::time::timeout(options.connect_timeout, connect)
            .await
            .map_err(|_| BrokerError::Timeout {
                duration: options.connect_timeout,
            })?
            .map_err(|e| BrokerError::Transport {
                message: format!("failed to connect to {}", self.url),
                source: Some(Box::new(e)),
            })?;
        info!(url = %self.url, "connected to bridge");

        let (sink, stream) = socket.split();
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let pending: Pending = Arc::new(DashMap::new());
        let shutdown = CancellationToken::new();

        let hello = encode(&OutgoingFrame::Hello {
            credentials,
            options: HelloOptions::from(options),
        })?;
        outgoing_tx
            .send(hello)
            .await
            .map_err(|_| BrokerError::transport("bridge writer stopped before hello"))?;

        tokio::spawn(write_loop(sink, outgoing_rx, options.keep_alive));
        tokio::spawn(read_loop(
            stream,
            events_tx,
            Arc::clone(&pending),
            shutdown.clone(),
        ));

        let session = BridgeSession {
            outgoing: outgoing_tx,
            pending,
            query_timeout: options.query_timeout,
            shutdown,
        };
        Ok((Arc::new(session), events_rx))
    }
}

/// A session bound to one socket.
pub struct BridgeSession {
    outgoing: mpsc::Sender<Message>,
    pending: Pending,
    query_timeout: Duration,
    shutdown: CancellationToken,
}

impl BridgeSession {
    /// Sends a request frame and waits for the matching `response`.
    async fn request(
        &self,
        build: impl FnOnce(String) -> OutgoingFrame,
    ) -> Result<serde_json::Value, BrokerError> {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = encode(&build(id.clone()))?;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        if self.outgoing.send(frame).await.is_err() {
            self.pending.remove(&id);
            return Err(BrokerError::transport("bridge connection is closed"));
        }

        match tokio::time::timeout(self.query_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(BrokerError::transport(message)),
            Ok(Err(_)) => Err(BrokerError::transport(
                "bridge connection closed before the response",
            )),
            Err(_) => {
                self.pending.remove(&id);
                Err(BrokerError::Timeout {
                    duration: self.query_timeout,
                })
            }
        }
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl Session for BridgeSession {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        quoted: Option<&InboundMessage>,
    ) -> Result<(), BrokerError> {
        self.request(|id| OutgoingFrame::Send {
            id,
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            quoted: quoted.cloned(),
        })
        .await
        .map(|_| ())
    }

    async fn group_metadata(&self, group_id: &str) -> Result<GroupMetadata, BrokerError> {
        let result = self
            .request(|id| OutgoingFrame::GroupMetadata {
                id,
                group_id: group_id.to_string(),
            })
            .await?;
        serde_json::from_value(result).map_err(|e| BrokerError::Transport {
            message: format!("invalid group metadata for {group_id}"),
            source: Some(Box::new(e)),
        })
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.shutdown.cancel();
        // The writer may already be gone when the peer hung up first.
        let _ = self.outgoing.send(Message::Close(None)).await;
        Ok(())
    }
}

fn encode(frame: &OutgoingFrame) -> Result<Message, BrokerError> {
    let json = serde_json::to_string(frame)
        .map_err(|e| BrokerError::Internal(format!("failed to encode bridge frame: {e}")))?;
    Ok(Message::text(json))
}

async fn write_loop<S>(mut sink: S, mut outgoing: mpsc::Receiver<Message>, keep_alive: Duration)
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let keep_alive = keep_alive.max(Duration::from_secs(1));
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + keep_alive, keep_alive);
    loop {
        let message = tokio::select! {
            message = outgoing.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = ping.tick() => Message::Ping(Default::default()),
        };
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!(error = %e, "bridge write failed");
            break;
        }
        if closing {
            break;
        }
    }
    debug!("bridge writer stopped");
}

async fn read_loop<S, E>(
    mut stream: S,
    events: mpsc::Sender<TransportEvent>,
    pending: Pending,
    shutdown: CancellationToken,
) where
    S: futures::Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut closed_by_peer = false;
    let mut lost_reason = None;

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return,
            next = stream.next() => next,
        };
        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                lost_reason = frame.map(|f| f.reason.as_str().to_string());
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                lost_reason = Some(e.to_string());
                break;
            }
            None => break,
        };

        let frame: IncomingFrame = match serde_json::from_str(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "invalid bridge frame");
                continue;
            }
        };

        let event = match frame {
            IncomingFrame::Response { id, result, error } => {
                match pending.remove(&id) {
                    Some((_, waiter)) => {
                        let reply = match error {
                            Some(message) => Err(message),
                            None => Ok(result.unwrap_or(serde_json::Value::Null)),
                        };
                        let _ = waiter.send(reply);
                    }
                    None => debug!(%id, "response for unknown request"),
                }
                continue;
            }
            IncomingFrame::ConnectionUpdate(update) => {
                if update.connection == Some(ConnectionPhase::Close) {
                    closed_by_peer = true;
                }
                TransportEvent::Connection(update)
            }
            IncomingFrame::MessagesUpsert { messages } => TransportEvent::Messages(messages),
            IncomingFrame::CredsUpdate { creds } => TransportEvent::Credentials(creds),
        };

        if events.send(event).await.is_err() {
            debug!("event receiver dropped, stopping bridge reader");
            closed_by_peer = true;
        }
        if closed_by_peer {
            break;
        }
    }

    if !closed_by_peer {
        warn!(reason = ?lost_reason, "bridge socket closed without a closure frame");
        let update = ConnectionUpdate {
            connection: Some(ConnectionPhase::Close),
            status_code: Some(STATUS_SOCKET_LOST),
            error: Some(lost_reason.unwrap_or_else(|| "connection lost".to_string())),
            ..Default::default()
        };
        let _ = events.send(TransportEvent::Connection(update)).await;
    }
    // Dropping the waiters fails every in-flight request.
    pending.clear();
}
