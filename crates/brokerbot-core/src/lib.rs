// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for brokerbot.
//!
//! This crate provides the trait definitions, error type, and common types
//! used throughout the workspace: the chat transport and session, the
//! language model provider, the tabular store and the credential store.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BrokerError;
pub use types::{
    normalize_jid, ActiveSession, AdapterType, CompletionRequest, ConnectionPhase,
    ConnectionState, ConnectionUpdate, GroupMetadata, HealthStatus, InboundMessage,
    MessageContent, Row, SessionIdentity, SessionMessage, SessionOptions, TransportEvent,
};

pub use traits::{
    CredentialStore, PluginAdapter, ProviderAdapter, Session, TabularStore, Transport,
    TransportEvents,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn message(chat_id: &str, participant: Option<&str>, content: MessageContent) -> InboundMessage {
        InboundMessage {
            id: "ABC".into(),
            chat_id: chat_id.into(),
            participant: participant.map(str::to_string),
            from_me: false,
            push_name: None,
            timestamp: None,
            content,
        }
    }

    #[test]
    fn normalize_jid_strips_domain_and_device() {
        assert_eq!(normalize_jid("972501234567:12@s.whatsapp.net"), "972501234567");
        assert_eq!(normalize_jid("972501234567@s.whatsapp.net"), "972501234567");
        assert_eq!(normalize_jid("120363041234@g.us"), "120363041234");
        assert_eq!(normalize_jid(""), "");
    }

    #[test]
    fn sender_prefers_participant() {
        let msg = message(
            "120363041234@g.us",
            Some("972501234567@s.whatsapp.net"),
            MessageContent::Other,
        );
        assert_eq!(msg.sender_jid(), "972501234567@s.whatsapp.net");
        assert!(msg.is_group());

        let direct = message("972501234567@s.whatsapp.net", Some(""), MessageContent::Other);
        assert_eq!(direct.sender_jid(), "972501234567@s.whatsapp.net");
        assert!(!direct.is_group());
    }

    #[test]
    fn text_ignores_blank_and_non_text() {
        let text = message("x@g.us", None, MessageContent::Text("דירה למכירה".into()));
        assert_eq!(text.text(), Some("דירה למכירה"));

        let blank = message("x@g.us", None, MessageContent::Text("   ".into()));
        assert_eq!(blank.text(), None);

        let media = message("x@g.us", None, MessageContent::Other);
        assert_eq!(media.text(), None);
    }

    #[test]
    fn inbound_message_wire_format() {
        let json = serde_json::json!({
            "id": "3EB0",
            "chatId": "120363041234@g.us",
            "participant": "972501234567@s.whatsapp.net",
            "pushName": "Dana",
            "timestamp": 1_700_000_000,
            "content": {"kind": "text", "text": "3 חדרים ברחוב הרצל"}
        });
        let msg: InboundMessage = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(msg.push_name.as_deref(), Some("Dana"));
        assert!(!msg.from_me);
        assert_eq!(msg.text(), Some("3 חדרים ברחוב הרצל"));

        let media: InboundMessage = serde_json::from_value(serde_json::json!({
            "id": "3EB1",
            "chatId": "120363041234@g.us",
            "content": {"kind": "other"}
        }))
        .expect("should deserialize");
        assert_eq!(media.content, MessageContent::Other);
    }

    #[test]
    fn connection_update_wire_format() {
        let update: ConnectionUpdate = serde_json::from_value(serde_json::json!({
            "connection": "close",
            "statusCode": 515
        }))
        .expect("should deserialize");
        assert_eq!(update.connection, Some(ConnectionPhase::Close));
        assert_eq!(update.status_code, Some(515));
        assert!(update.me.is_none());
    }

    #[test]
    fn identity_user_is_normalized() {
        let me = SessionIdentity {
            id: "972501234567:3@s.whatsapp.net".into(),
            name: Some("Office".into()),
        };
        assert_eq!(me.user(), "972501234567");
    }

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    #[test]
    fn adapter_type_round_trips_through_str() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Transport,
            AdapterType::Provider,
            AdapterType::Store,
            AdapterType::Credentials,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_provider<T: ProviderAdapter>() {}
        fn _assert_store<T: TabularStore>() {}
        fn _assert_transport<T: Transport>() {}
        fn _assert_session<T: Session>() {}
        fn _assert_credentials<T: CredentialStore>() {}
    }
}
