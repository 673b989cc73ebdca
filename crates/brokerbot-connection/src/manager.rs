// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection manager state machine.
//!
//! ```text
//! Disconnected --run--> Connecting --open--> Open
//!                          ^                  |
//!                          +---- closure -----+
//! Open/Connecting --clean shutdown or cancel--> Disconnected
//! ```
//!
//! A single driver loop owns the session: it opens it, consumes its event
//! stream, classifies the closure and sleeps out the policy delay before the
//! next attempt. Re-entry is iterative, so there is never more than one
//! `Connecting` attempt in flight.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use brokerbot_bus::{BusEvent, EventBus};
use brokerbot_core::{
    ActiveSession, BrokerError, ConnectionPhase, ConnectionState, CredentialStore, Session,
    SessionIdentity, SessionMessage, SessionOptions, Transport, TransportEvent, TransportEvents,
};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::close::{CloseReason, STATUS_CONNECTION_LOST};
use crate::policy::{ReconnectAction, ReconnectPolicy};

/// Capacity of the inbound message queue.
const INBOUND_CAPACITY: usize = 1024;

/// How one session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed { status: Option<u16>, opened: bool },
    Restart { opened: bool },
    Cancelled,
}

/// Owns the chat session and keeps it alive.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    policy: ReconnectPolicy,
    options: SessionOptions,
    bus: EventBus,
    state_tx: watch::Sender<ConnectionState>,
    session_tx: watch::Sender<Option<ActiveSession>>,
    inbound_tx: mpsc::Sender<SessionMessage>,
    inbound_rx: std::sync::Mutex<Option<mpsc::Receiver<SessionMessage>>>,
    reconnect_tx: mpsc::Sender<()>,
    /// Held by `run` for its whole duration.
    driver: Mutex<mpsc::Receiver<()>>,
    /// Reconnects scheduled over the manager's lifetime; never reset.
    attempts: AtomicU32,
    generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        policy: ReconnectPolicy,
        options: SessionOptions,
        bus: EventBus,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (session_tx, _) = watch::channel(None);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        Self {
            transport,
            credentials,
            policy,
            options,
            bus,
            state_tx,
            session_tx,
            inbound_tx,
            inbound_rx: std::sync::Mutex::new(Some(inbound_rx)),
            reconnect_tx,
            driver: Mutex::new(reconnect_rx),
            attempts: AtomicU32::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Watch channel carrying the session of the current `Open` period, or
    /// `None` while connecting or disconnected.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<ActiveSession>> {
        self.session_tx.subscribe()
    }

    pub fn current_session(&self) -> Option<ActiveSession> {
        self.session_tx.borrow().clone()
    }

    /// Resolves with the session once the manager is `Open`.
    pub async fn wait_open(&self) -> Option<ActiveSession> {
        let mut rx = self.session_tx.subscribe();
        rx.wait_for(Option::is_some).await.ok()?.clone()
    }

    /// Takes the ordered inbound message stream. Only the first caller gets it.
    ///
    /// Each message carries the session it arrived on, so it stays usable
    /// after that session closes.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<SessionMessage>> {
        self.inbound_rx
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default()
    }

    /// Number of reconnects scheduled so far.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Asks the driver to drop the open session and establish a new one.
    ///
    /// Ignored unless the manager is `Open`; returns whether the request was
    /// accepted.
    pub fn request_reconnect(&self) -> bool {
        let state = self.state();
        if state != ConnectionState::Open {
            debug!(%state, "reconnect request ignored");
            return false;
        }
        // A full queue means a restart is already pending.
        let _ = self.reconnect_tx.try_send(());
        true
    }

    /// Drives the state machine until a clean shutdown, cancellation, or a
    /// fatal setup failure.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BrokerError> {
        let Ok(mut reconnect_rx) = self.driver.try_lock() else {
            return Err(BrokerError::Internal(
                "connection manager is already running".into(),
            ));
        };

        let result = self.drive_loop(&mut reconnect_rx, &cancel).await;
        self.session_tx.send_replace(None);
        self.set_state(ConnectionState::Disconnected);
        result
    }

    async fn drive_loop(
        &self,
        reconnect_rx: &mut mpsc::Receiver<()>,
        cancel: &CancellationToken,
    ) -> Result<(), BrokerError> {
        let mut setup_failures = 0u32;
        let mut ever_opened = false;

        loop {
            self.set_state(ConnectionState::Connecting);

            let credentials = match self.credentials.load().await {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!(error = %e, "failed to load credentials, starting a fresh pairing");
                    self.bus.warn(format!("failed to load credentials: {e}"));
                    None
                }
            };
            if credentials.is_none() {
                info!("no stored credentials, waiting for pairing");
            }

            let opened = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                result = self.transport.open(credentials, &self.options) => result,
            };

            let (session, mut events) = match opened {
                Ok(pair) => {
                    setup_failures = 0;
                    pair
                }
                Err(e) if !ever_opened => {
                    setup_failures += 1;
                    let Some(delay) = self.policy.setup_retry(setup_failures) else {
                        error!(failures = setup_failures, error = %e, "session setup failed, giving up");
                        self.bus.error(format!("could not establish a session: {e}"));
                        return Err(BrokerError::Fatal(format!(
                            "session setup failed {setup_failures} times: {e}"
                        )));
                    };
                    warn!(
                        failures = setup_failures,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "session setup failed, retrying"
                    );
                    self.bus.warn(format!(
                        "connection attempt failed, retrying in {} seconds",
                        delay.as_secs()
                    ));
                    if !pause(delay, cancel).await {
                        return Ok(());
                    }
                    continue;
                }
                Err(e) => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                    let delay = self.policy.backoff(attempt);
                    warn!(attempt, delay_secs = delay.as_secs(), error = %e, "session setup failed");
                    self.bus.warn(format!(
                        "reconnect failed, retrying in {} seconds",
                        delay.as_secs()
                    ));
                    if !pause(delay, cancel).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            while reconnect_rx.try_recv().is_ok() {}

            let end = self
                .drive_session(&session, &mut events, reconnect_rx, cancel)
                .await;
            self.session_tx.send_replace(None);

            match end {
                SessionEnd::Cancelled => {
                    if let Err(e) = session.close().await {
                        debug!(error = %e, "session close on shutdown failed");
                    }
                    return Ok(());
                }
                SessionEnd::Restart { opened } => {
                    ever_opened |= opened;
                    if let Err(e) = session.close().await {
                        warn!(error = %e, "failed to close session before reconnect");
                    }
                    info!("reconnect requested, re-establishing session");
                    self.bus.info("reconnecting on request");
                }
                SessionEnd::Closed { status, opened } => {
                    ever_opened |= opened;
                    let reason = CloseReason::classify(status);
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                    match self.policy.on_close(reason, attempt) {
                        ReconnectAction::Stop => {
                            info!("session closed cleanly, not reconnecting");
                            self.bus.info("connection closed");
                            return Ok(());
                        }
                        ReconnectAction::Retry {
                            delay,
                            clear_credentials,
                        } => {
                            if clear_credentials {
                                if let Err(e) = self.credentials.clear().await {
                                    warn!(error = %e, "failed to clear credentials");
                                }
                                self.bus.warn("session logged out, a new pairing code will be issued");
                            }
                            self.set_state(ConnectionState::Connecting);
                            warn!(
                                %reason,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "session closed, reconnecting"
                            );
                            self.bus.warn(format!(
                                "connection closed ({reason}), reconnecting in {} seconds",
                                delay.as_secs()
                            ));
                            if !pause(delay, cancel).await {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Consumes one session's events until it ends.
    async fn drive_session(
        &self,
        session: &Arc<dyn Session>,
        events: &mut TransportEvents,
        reconnect_rx: &mut mpsc::Receiver<()>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let mut active: Option<ActiveSession> = None;

        loop {
            let opened = active.is_some();
            let event = tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                Some(()) = reconnect_rx.recv(), if opened => return SessionEnd::Restart { opened },
                event = events.recv() => event,
            };

            let Some(event) = event else {
                warn!("transport event stream ended without a closure event");
                return SessionEnd::Closed {
                    status: Some(STATUS_CONNECTION_LOST),
                    opened,
                };
            };

            match event {
                TransportEvent::Connection(update) => {
                    if let Some(code) = update.qr {
                        info!("pairing code received");
                        self.bus.publish(BusEvent::PairingCode { code });
                    }
                    match update.connection {
                        Some(ConnectionPhase::Open) if !opened => {
                            active = Some(self.publish_open(session, update.me));
                        }
                        Some(ConnectionPhase::Open) => debug!("duplicate open event ignored"),
                        Some(ConnectionPhase::Connecting) => debug!("transport connecting"),
                        Some(ConnectionPhase::Close) => {
                            debug!(status = ?update.status_code, error = ?update.error, "transport closed");
                            return SessionEnd::Closed {
                                status: update.status_code,
                                opened,
                            };
                        }
                        None => {}
                    }
                }
                TransportEvent::Messages(batch) => {
                    let Some(active) = &active else {
                        warn!(count = batch.len(), "messages before open, dropped");
                        continue;
                    };
                    for message in batch {
                        let delivered = SessionMessage {
                            message,
                            active: active.clone(),
                        };
                        if self.inbound_tx.send(delivered).await.is_err() {
                            debug!("no inbound consumer, message dropped");
                        }
                    }
                }
                TransportEvent::Credentials(document) => {
                    if let Err(e) = self.credentials.save(&document).await {
                        warn!(error = %e, "failed to persist credentials");
                        self.bus.warn(format!("failed to persist credentials: {e}"));
                    }
                }
            }
        }
    }

    fn publish_open(&self, session: &Arc<dyn Session>, me: Option<SessionIdentity>) -> ActiveSession {
        let identity = me.unwrap_or_else(|| {
            warn!("session opened without an identity");
            SessionIdentity {
                id: String::new(),
                name: None,
            }
        });
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            user = identity.user(),
            name = identity.name.as_deref().unwrap_or("unknown"),
            generation,
            "session open"
        );
        self.bus.info(format!(
            "connected as {} ({})",
            identity.name.as_deref().unwrap_or("unknown"),
            identity.user()
        ));
        self.set_state(ConnectionState::Open);
        let active = ActiveSession {
            session: Arc::clone(session),
            identity,
            generation,
        };
        self.session_tx.send_replace(Some(active.clone()));
        active
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "connection state changed");
            self.bus.publish(BusEvent::Connection { state: next });
        }
    }
}

/// Sleeps for `delay` unless cancelled first. Returns `false` on cancellation.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
