// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed notification bus.
//!
//! Services publish [`BusEvent`]s (user-visible log lines, connection state,
//! pairing challenges, finished rows, query bot status) and any number of
//! subscribers (the terminal renderer, a JSON event stream for a desktop
//! shell) consume them. Publishing never blocks and never fails: with no
//! subscriber the event is dropped, and slow subscribers observe a lag.

use brokerbot_core::ConnectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Severity of a user-visible log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Availability of the conversational query path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryBotStatus {
    Ready { number: String },
    Unavailable { reason: String },
}

/// A notification toward the operator surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    Log { level: LogLevel, message: String },
    Connection { state: ConnectionState },
    PairingCode { code: String },
    RowReady { row: Vec<String> },
    QueryBot(QueryBotStatus),
}

/// An event stamped with an id and publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEnvelope {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BusEvent,
}

/// Broadcast bus shared by all services.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: BusEvent) -> usize {
        let envelope = BusEnvelope {
            id: Uuid::new_v4(),
            at: Utc::now(),
            event,
        };
        self.tx.send(envelope).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEnvelope> {
        self.tx.subscribe()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.publish(BusEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}

impl BusEnvelope {
    /// One-line JSON rendering for line-oriented consumers.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to serialize bus event");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        assert_eq!(
            bus.publish(BusEvent::PairingCode {
                code: "2@abc".into()
            }),
            1
        );
        bus.warn("group metadata unavailable");

        let first = rx.recv().await.expect("first event");
        assert_eq!(
            first.event,
            BusEvent::PairingCode {
                code: "2@abc".into()
            }
        );
        let second = rx.recv().await.expect("second event");
        assert_eq!(
            second.event,
            BusEvent::Log {
                level: LogLevel::Warn,
                message: "group metadata unavailable".into()
            }
        );
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(BusEvent::RowReady { row: vec![] }), 0);
    }

    #[test]
    fn envelope_json_is_flat() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(BusEvent::Connection {
            state: ConnectionState::Open,
        });
        let envelope = rx.try_recv().expect("event");
        let json: serde_json::Value =
            serde_json::from_str(&envelope.to_json_line()).expect("valid json");
        assert_eq!(json["type"], "connection");
        assert_eq!(json["state"], "open");
        assert!(json["id"].is_string());
    }

    #[test]
    fn json_lines_read_back_as_envelopes() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.error("Error processing message with AI: timeout");
        let envelope = rx.try_recv().expect("event");

        let parsed: BusEnvelope =
            serde_json::from_str(&envelope.to_json_line()).expect("envelope");
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn query_bot_status_serializes_with_tag() {
        let json = serde_json::to_value(BusEvent::QueryBot(QueryBotStatus::Ready {
            number: "972501234567".into(),
        }))
        .expect("serialize");
        assert_eq!(json["type"], "query_bot");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["number"], "972501234567");
    }
}
