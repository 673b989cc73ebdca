// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged with the sidecar.
//!
//! Sidecar -> brokerbot:
//! ```json
//! {"type": "connection.update", "connection": "open", "me": {"id": "9725...@s.whatsapp.net"}}
//! {"type": "messages.upsert", "messages": [{"id": "...", "chatId": "...", "content": {"kind": "text", "text": "..."}}]}
//! {"type": "creds.update", "creds": {...}}
//! {"type": "response", "id": "...", "result": {...}}
//! ```
//!
//! brokerbot -> sidecar:
//! ```json
//! {"type": "hello", "credentials": {...}, "options": {...}}
//! {"type": "send", "id": "...", "chatId": "...", "text": "...", "quoted": {...}}
//! {"type": "group_metadata", "id": "...", "groupId": "...@g.us"}
//! ```

use brokerbot_core::{ConnectionUpdate, InboundMessage, SessionOptions};
use serde::{Deserialize, Serialize};

/// Frames received from the sidecar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingFrame {
    #[serde(rename = "connection.update")]
    ConnectionUpdate(ConnectionUpdate),
    #[serde(rename = "messages.upsert")]
    MessagesUpsert { messages: Vec<InboundMessage> },
    #[serde(rename = "creds.update")]
    CredsUpdate { creds: serde_json::Value },
    #[serde(rename = "response")]
    Response {
        id: String,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Session tuning as sent in the `hello` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloOptions {
    pub connect_timeout_ms: u64,
    pub keep_alive_ms: u64,
    pub query_timeout_ms: u64,
    pub retry_request_delay_ms: u64,
    pub browser: Vec<String>,
}

impl From<&SessionOptions> for HelloOptions {
    fn from(options: &SessionOptions) -> Self {
        Self {
            connect_timeout_ms: options.connect_timeout.as_millis() as u64,
            keep_alive_ms: options.keep_alive.as_millis() as u64,
            query_timeout_ms: options.query_timeout.as_millis() as u64,
            retry_request_delay_ms: options.retry_request_delay.as_millis() as u64,
            browser: options.browser.clone(),
        }
    }
}

/// Frames sent to the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    Hello {
        credentials: Option<serde_json::Value>,
        options: HelloOptions,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        id: String,
        chat_id: String,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quoted: Option<InboundMessage>,
    },
    #[serde(rename_all = "camelCase")]
    GroupMetadata { id: String, group_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerbot_core::{ConnectionPhase, MessageContent};

    #[test]
    fn parses_connection_update() {
        let frame: IncomingFrame = serde_json::from_str(
            r#"{"type":"connection.update","connection":"close","statusCode":515,"error":"restart required"}"#,
        )
        .unwrap();
        let IncomingFrame::ConnectionUpdate(update) = frame else {
            panic!("expected connection update, got {frame:?}");
        };
        assert_eq!(update.connection, Some(ConnectionPhase::Close));
        assert_eq!(update.status_code, Some(515));
        assert_eq!(update.error.as_deref(), Some("restart required"));
    }

    #[test]
    fn parses_qr_only_update() {
        let frame: IncomingFrame =
            serde_json::from_str(r#"{"type":"connection.update","qr":"2@abc"}"#).unwrap();
        assert_eq!(
            frame,
            IncomingFrame::ConnectionUpdate(ConnectionUpdate {
                qr: Some("2@abc".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn parses_messages_upsert() {
        let frame: IncomingFrame = serde_json::from_str(
            r#"{"type":"messages.upsert","messages":[
                {"id":"A1","chatId":"120363@g.us","participant":"97250@s.whatsapp.net",
                 "pushName":"Dana","timestamp":1700000000,
                 "content":{"kind":"text","text":"דירה 4 חדרים"}},
                {"id":"A2","chatId":"120363@g.us","content":{"kind":"other"}}
            ]}"#,
        )
        .unwrap();
        let IncomingFrame::MessagesUpsert { messages } = frame else {
            panic!("expected messages");
        };
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), Some("דירה 4 חדרים"));
        assert_eq!(messages[1].content, MessageContent::Other);
        assert!(!messages[1].from_me);
    }

    #[test]
    fn parses_response_with_error() {
        let frame: IncomingFrame =
            serde_json::from_str(r#"{"type":"response","id":"r1","error":"not a participant"}"#)
                .unwrap();
        assert_eq!(
            frame,
            IncomingFrame::Response {
                id: "r1".into(),
                result: None,
                error: Some("not a participant".into()),
            }
        );
    }

    #[test]
    fn serializes_outgoing_frames() {
        let hello = OutgoingFrame::Hello {
            credentials: None,
            options: HelloOptions::from(&SessionOptions::default()),
        };
        let json = serde_json::to_value(&hello).unwrap();
        assert_eq!(json["type"], "hello");
        assert_eq!(json["options"]["keepAliveMs"], 25000);
        assert_eq!(json["options"]["browser"][0], "Ubuntu");

        let send = OutgoingFrame::Send {
            id: "r2".into(),
            chat_id: "97250@s.whatsapp.net".into(),
            text: "[BOT]\nhi".into(),
            quoted: None,
        };
        let json = serde_json::to_value(&send).unwrap();
        assert_eq!(json["type"], "send");
        assert_eq!(json["chatId"], "97250@s.whatsapp.net");
        assert!(json.get("quoted").is_none());

        let meta = OutgoingFrame::GroupMetadata {
            id: "r3".into(),
            group_id: "120363@g.us".into(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "group_metadata");
        assert_eq!(json["groupId"], "120363@g.us");
    }
}
