// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transport and in-memory credential store for driving the
//! connection manager in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brokerbot_core::{
    AdapterType, BrokerError, ConnectionPhase, ConnectionUpdate, CredentialStore, HealthStatus,
    InboundMessage, PluginAdapter, Session, SessionIdentity, SessionOptions, Transport,
    TransportEvent, TransportEvents,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::mock_session::MockSession;

/// One recorded call to `Transport::open`.
#[derive(Debug, Clone)]
pub struct OpenCall {
    pub at: Instant,
    pub credentials: Option<serde_json::Value>,
}

enum ScriptedOpen {
    Fail(String),
    Session {
        session: Arc<MockSession>,
        events: TransportEvents,
    },
}

/// Test handle for one scripted session.
#[derive(Clone)]
pub struct SessionScript {
    pub session: Arc<MockSession>,
    events: mpsc::Sender<TransportEvent>,
}

impl SessionScript {
    pub async fn send(&self, event: TransportEvent) {
        // The manager may already have dropped the stream.
        let _ = self.events.send(event).await;
    }

    /// Emit `connection: open` logged in as `id`.
    pub async fn open(&self, id: &str) {
        self.send(TransportEvent::Connection(ConnectionUpdate {
            connection: Some(ConnectionPhase::Open),
            me: Some(SessionIdentity {
                id: id.to_string(),
                name: Some("Office".to_string()),
            }),
            ..Default::default()
        }))
        .await;
    }

    /// Emit `connection: close` with the given status.
    pub async fn close(&self, status: Option<u16>) {
        self.send(TransportEvent::Connection(ConnectionUpdate {
            connection: Some(ConnectionPhase::Close),
            status_code: status,
            ..Default::default()
        }))
        .await;
    }

    pub async fn pairing_code(&self, code: &str) {
        self.send(TransportEvent::Connection(ConnectionUpdate {
            qr: Some(code.to_string()),
            ..Default::default()
        }))
        .await;
    }

    pub async fn messages(&self, messages: Vec<InboundMessage>) {
        self.send(TransportEvent::Messages(messages)).await;
    }

    pub async fn credentials(&self, document: serde_json::Value) {
        self.send(TransportEvent::Credentials(document)).await;
    }

    /// Drop the event stream without a closure event.
    pub fn hang_up(self) {}
}

/// A transport whose `open` results are queued by the test.
///
/// With an empty queue `open` never resolves, so the manager parks there
/// until cancelled.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedOpen>>,
    opens: watch::Sender<Vec<OpenCall>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (opens, _) = watch::channel(Vec::new());
        Self {
            script: Mutex::new(VecDeque::new()),
            opens,
        }
    }

    /// Queue a setup failure.
    pub fn push_failure(&self, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedOpen::Fail(message.to_string()));
        }
    }

    /// Queue a successful open and return the handle that drives its events.
    pub fn push_session(&self) -> SessionScript {
        self.push_session_with(MockSession::new())
    }

    pub fn push_session_with(&self, session: MockSession) -> SessionScript {
        let session = Arc::new(session);
        let (tx, rx) = mpsc::channel(64);
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedOpen::Session {
                session: Arc::clone(&session),
                events: rx,
            });
        }
        SessionScript {
            session,
            events: tx,
        }
    }

    pub fn open_calls(&self) -> Vec<OpenCall> {
        self.opens.borrow().clone()
    }

    /// Wait until `open` was called at least `count` times.
    pub async fn wait_for_opens(&self, count: usize) -> Vec<OpenCall> {
        let mut rx = self.opens.subscribe();
        rx.wait_for(|calls| calls.len() >= count)
            .await
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted-transport"
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
impl Transport for ScriptedTransport {
    async fn open(
        &self,
        credentials: Option<serde_json::Value>,
        _options: &SessionOptions,
    ) -> Result<(Arc<dyn Session>, TransportEvents), BrokerError> {
        self.opens.send_modify(|calls| {
            calls.push(OpenCall {
                at: Instant::now(),
                credentials,
            })
        });
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(ScriptedOpen::Fail(message)) => Err(BrokerError::transport(message)),
            Some(ScriptedOpen::Session { session, events }) => Ok((session, events)),
            None => std::future::pending().await,
        }
    }
}

/// Credential store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    document: Mutex<Option<serde_json::Value>>,
    clears: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: serde_json::Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn document(&self) -> Option<serde_json::Value> {
        self.document.lock().ok().and_then(|d| d.clone())
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<serde_json::Value>, BrokerError> {
        Ok(self.document())
    }

    async fn save(&self, credentials: &serde_json::Value) -> Result<(), BrokerError> {
        if let Ok(mut d) = self.document.lock() {
            *d = Some(credentials.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), BrokerError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut d) = self.document.lock() {
            *d = None;
        }
        Ok(())
    }
}
