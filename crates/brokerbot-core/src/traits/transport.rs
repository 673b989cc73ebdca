// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport and session traits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BrokerError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GroupMetadata, InboundMessage, SessionOptions, TransportEvent};

/// Ordered lifecycle and message events of one session.
pub type TransportEvents = mpsc::Receiver<TransportEvent>;

/// Opens sessions against the chat network.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Establishes a new session.
    ///
    /// An `Err` means the session could not be set up at all. Closures of an
    /// established session arrive as `connection-update` events instead.
    async fn open(
        &self,
        credentials: Option<serde_json::Value>,
        options: &SessionOptions,
    ) -> Result<(Arc<dyn Session>, TransportEvents), BrokerError>;
}

/// A live chat session.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Sends a text message, optionally quoting an earlier message.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        quoted: Option<&InboundMessage>,
    ) -> Result<(), BrokerError>;

    /// Looks up group metadata (display name, participants).
    async fn group_metadata(&self, group_id: &str) -> Result<GroupMetadata, BrokerError>;

    /// Closes the session without logging out.
    async fn close(&self) -> Result<(), BrokerError>;
}
