// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for language model integrations.

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CompletionRequest;

/// Adapter for a text-in/text-out language model.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends one system + user prompt pair and returns the completion text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, BrokerError>;
}
