// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport, the connection manager, and the pipelines.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::traits::Session;

/// Chat id suffix that marks a group conversation.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Chat id suffix of a personal account.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";

/// A positional row in the tabular store.
pub type Row = Vec<String>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Provider,
    Store,
    Credentials,
}

/// Reduces a chat id such as `972501234567:12@s.whatsapp.net` to the bare
/// account number `972501234567`.
pub fn normalize_jid(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or_default();
    user.split(':').next().unwrap_or_default().trim()
}

/// Message payload as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain or extended text.
    Text(String),
    /// Media, reactions, stickers and everything else without text.
    #[default]
    Other,
}

/// A message observed on the chat network. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Transport-assigned message id.
    pub id: String,
    /// Origin chat (group or direct conversation).
    pub chat_id: String,
    /// Sending participant inside a group.
    #[serde(default)]
    pub participant: Option<String>,
    /// True when the message was sent by the bot's own account.
    #[serde(default)]
    pub from_me: bool,
    /// Display name chosen by the sender.
    #[serde(default)]
    pub push_name: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub content: MessageContent,
}

impl InboundMessage {
    /// Returns the non-empty text of the message, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// The sending account: the participant in groups, the chat itself otherwise.
    pub fn sender_jid(&self) -> &str {
        self.participant
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.chat_id)
    }

    /// Whether the message was posted in a group conversation.
    pub fn is_group(&self) -> bool {
        self.chat_id.ends_with(GROUP_SUFFIX)
    }
}

/// Identity of the account the session is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl SessionIdentity {
    /// The bare account number.
    pub fn user(&self) -> &str {
        normalize_jid(&self.id)
    }
}

/// Group metadata returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Lifecycle state of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Connection phase reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Close,
}

/// A `connection-update` lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdate {
    #[serde(default)]
    pub connection: Option<ConnectionPhase>,
    /// Closure status code, present only on `close`.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Pairing challenge to show to the operator.
    #[serde(default)]
    pub qr: Option<String>,
    /// Logged-in identity, present on `open`.
    #[serde(default)]
    pub me: Option<SessionIdentity>,
    /// Human readable closure reason.
    #[serde(default)]
    pub error: Option<String>,
}

/// Events emitted by an open transport session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connection(ConnectionUpdate),
    Messages(Vec<InboundMessage>),
    /// Updated authentication material to persist verbatim.
    Credentials(serde_json::Value),
}

/// Session tuning passed to the transport on every open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub keep_alive: Duration,
    pub query_timeout: Duration,
    pub retry_request_delay: Duration,
    pub browser: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            keep_alive: Duration::from_secs(25),
            query_timeout: Duration::from_secs(60),
            retry_request_delay: Duration::from_millis(250),
            browser: vec!["Ubuntu".into(), "Chrome".into(), "20.0.04".into()],
        }
    }
}

/// The live session handed out to pipelines, resolved once per `Open`.
#[derive(Clone)]
pub struct ActiveSession {
    pub session: Arc<dyn Session>,
    pub identity: SessionIdentity,
    /// Increments with every successful open.
    pub generation: u64,
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("identity", &self.identity)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// An inbound message paired with the session that delivered it.
#[derive(Debug, Clone)]
pub struct SessionMessage {
    pub message: InboundMessage,
    pub active: ActiveSession,
}

/// A single text-in/text-out completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
        }
    }
}
