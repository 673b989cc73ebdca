// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for chat-session authentication material.

use async_trait::async_trait;

use crate::error::BrokerError;

/// Loads, saves and clears the opaque credential document of the chat session.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Returns `None` when no credentials were persisted (fresh pairing).
    async fn load(&self) -> Result<Option<serde_json::Value>, BrokerError>;

    /// Persists the document verbatim, replacing any previous one.
    async fn save(&self, credentials: &serde_json::Value) -> Result<(), BrokerError>;

    /// Removes all persisted material.
    async fn clear(&self) -> Result<(), BrokerError>;
}
