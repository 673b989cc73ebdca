// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes inbound messages to the extractor or the query engine.
//!
//! Messages arrive in transport order on one queue. Each routed message is
//! handled on its own task, so a slow model call never delays routing; the
//! order in which tasks finish is not defined. Every message is handled on
//! the session that delivered it, even if that session has since closed or
//! been replaced by a reconnect.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use brokerbot_bus::EventBus;
use brokerbot_core::{normalize_jid, ActiveSession, InboundMessage, SessionMessage};
use strum::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::extractor::MessageExtractor;
use crate::query::QueryEngine;

/// Why a message was not routed anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IgnoreReason {
    /// Starts with the bot's response marker.
    ResponseMarker,
    MissingChat,
    NoText,
    /// A direct message that is not the bot's own account.
    NotAuthorized,
    QueriesDisabled,
    NotMonitored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Extract,
    Query,
    Ignore(IgnoreReason),
}

/// Routing configuration; the monitored groups can be swapped at runtime.
#[derive(Debug)]
pub struct RoutingRules {
    monitored: ArcSwap<HashSet<String>>,
    marker: String,
    query_enabled: bool,
}

impl RoutingRules {
    pub fn new(
        groups: impl IntoIterator<Item = String>,
        marker: impl Into<String>,
        query_enabled: bool,
    ) -> Self {
        Self {
            monitored: ArcSwap::from_pointee(groups.into_iter().collect()),
            marker: marker.into(),
            query_enabled,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Monitored group ids, sorted.
    pub fn monitored_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.monitored.load().iter().cloned().collect();
        groups.sort();
        groups
    }

    pub fn set_monitored_groups(&self, groups: impl IntoIterator<Item = String>) {
        let groups: HashSet<String> = groups.into_iter().collect();
        info!(count = groups.len(), "monitored groups updated");
        self.monitored.store(Arc::new(groups));
    }

    pub fn stop_monitoring(&self) {
        self.monitored.store(Arc::new(HashSet::new()));
        info!("stopped monitoring groups");
    }

    /// Decides where `message` goes. `own_user` is the bare number of the
    /// bot's account.
    pub fn classify(&self, message: &InboundMessage, own_user: &str) -> Route {
        if message.chat_id.is_empty() {
            return Route::Ignore(IgnoreReason::MissingChat);
        }
        let text = message.text();
        if text.is_some_and(|t| t.trim_start().starts_with(self.marker.as_str())) {
            return Route::Ignore(IgnoreReason::ResponseMarker);
        }

        if message.is_group() {
            return if self.monitored.load().contains(&message.chat_id) {
                Route::Extract
            } else {
                Route::Ignore(IgnoreReason::NotMonitored)
            };
        }

        let sender = normalize_jid(message.sender_jid());
        if own_user.is_empty() || sender != own_user {
            Route::Ignore(IgnoreReason::NotAuthorized)
        } else if !self.query_enabled {
            Route::Ignore(IgnoreReason::QueriesDisabled)
        } else if text.is_none() {
            Route::Ignore(IgnoreReason::NoText)
        } else {
            Route::Query
        }
    }
}

/// Dispatches inbound messages to the pipelines.
pub struct MessageRouter {
    rules: RoutingRules,
    extractor: Arc<MessageExtractor>,
    engine: Arc<QueryEngine>,
    bus: EventBus,
    tracker: TaskTracker,
}

impl MessageRouter {
    pub fn new(
        rules: RoutingRules,
        extractor: Arc<MessageExtractor>,
        engine: Arc<QueryEngine>,
        bus: EventBus,
    ) -> Self {
        Self {
            rules,
            extractor,
            engine,
            bus,
            tracker: TaskTracker::new(),
        }
    }

    pub fn rules(&self) -> &RoutingRules {
        &self.rules
    }

    pub fn set_monitored_groups(&self, groups: impl IntoIterator<Item = String>) {
        self.rules.set_monitored_groups(groups);
    }

    pub fn stop_monitoring(&self) {
        self.rules.stop_monitoring();
    }

    /// Number of pipeline tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Routes messages until the queue closes or `cancel` fires.
    ///
    /// Pipelines already started keep running; use [`Self::drain`] to wait
    /// for them.
    pub async fn run(
        self: Arc<Self>,
        mut inbound: mpsc::Receiver<SessionMessage>,
        cancel: CancellationToken,
    ) {
        info!("message router started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => break,
                },
            }
        }
        info!(in_flight = self.tracker.len(), "message router stopped");
    }

    /// Waits for every dispatched pipeline to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Classifies one message and spawns its pipeline.
    pub fn dispatch(self: &Arc<Self>, delivered: SessionMessage) {
        let SessionMessage { message, active } = delivered;
        match self.rules.classify(&message, active.identity.user()) {
            Route::Ignore(reason) => {
                debug!(message_id = %message.id, chat_id = %message.chat_id, %reason, "message ignored");
            }
            Route::Extract => {
                let router = Arc::clone(self);
                self.tracker
                    .spawn(async move { router.extract(active, message).await });
            }
            Route::Query => {
                let router = Arc::clone(self);
                self.tracker
                    .spawn(async move { router.answer(active, message).await });
            }
        }
    }

    async fn extract(&self, active: ActiveSession, message: InboundMessage) {
        match self.extractor.process(active.session.as_ref(), &message).await {
            Ok(Some(row)) => {
                debug!(message_id = %message.id, asset_id = %row[0], "group message stored");
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    message_id = %message.id,
                    group_id = %message.chat_id,
                    generation = active.generation,
                    error = %e,
                    "failed to process group message"
                );
                self.bus
                    .error(format!("Error processing message with AI: {e}"));
            }
        }
    }

    async fn answer(&self, active: ActiveSession, message: InboundMessage) {
        let question = message.text().unwrap_or_default().trim();
        info!(message_id = %message.id, "answering query");

        let marker = self.rules.marker();
        let reply = match self.engine.answer(question).await {
            Ok(answer) => format!("{marker}\n{answer}"),
            Err(e) => {
                error!(message_id = %message.id, error = %e, "query failed");
                self.bus.error(format!("Error processing query: {e}"));
                format!("{marker}\nשגיאה בעיבוד השאילתה: {e}")
            }
        };

        if let Err(e) = active
            .session
            .send_text(&message.chat_id, &reply, Some(&message))
            .await
        {
            error!(
                message_id = %message.id,
                generation = active.generation,
                error = %e,
                "failed to send query reply"
            );
            self.bus.error(format!("Failed to send query reply: {e}"));
        }
    }
}
