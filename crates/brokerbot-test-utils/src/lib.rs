// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for brokerbot integration tests.
//!
//! Provides in-memory adapters for fast, deterministic, CI-runnable tests
//! without a chat network, a language model or a spreadsheet.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock LLM provider with pre-configured responses
//! - [`MemoryStore`] - In-memory spreadsheet understanding A1 ranges
//! - [`MockSession`] - Chat session capturing outbound messages
//! - [`ScriptedTransport`] - Transport whose opens and events are scripted
//! - [`MemoryCredentialStore`] - Credential store kept in memory

pub mod memory_store;
pub mod mock_provider;
pub mod mock_session;
pub mod scripted_transport;

pub use memory_store::MemoryStore;
pub use mock_provider::MockProvider;
pub use mock_session::{MockSession, SentMessage};
pub use scripted_transport::{MemoryCredentialStore, OpenCall, ScriptedTransport, SessionScript};

/// Builds a text message as the transport would deliver it.
pub fn text_message(
    id: &str,
    chat_id: &str,
    participant: Option<&str>,
    text: &str,
) -> brokerbot_core::InboundMessage {
    brokerbot_core::InboundMessage {
        id: id.to_string(),
        chat_id: chat_id.to_string(),
        participant: participant.map(str::to_string),
        from_me: false,
        push_name: Some("Dana".to_string()),
        timestamp: Some(1_700_000_000),
        content: brokerbot_core::MessageContent::Text(text.to_string()),
    }
}
