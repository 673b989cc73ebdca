// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language model provider for deterministic testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use brokerbot_core::{
    AdapterType, BrokerError, CompletionRequest, HealthStatus, PluginAdapter, ProviderAdapter,
};

/// A scripted reply: text or a provider failure.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A mock provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. Replies queued for a specific
/// model take precedence over the shared queue. When nothing is queued,
/// a default "mock response" text is returned. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Reply>>,
    by_model: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        for response in responses {
            provider.add_response(response);
        }
        provider
    }

    /// Add a response to the end of the queue.
    pub fn add_response(&self, text: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Text(text.into()));
        }
    }

    /// Queue a response served only to requests for `model`.
    pub fn add_response_for(&self, model: &str, text: impl Into<String>) {
        if let Ok(mut by_model) = self.by_model.lock() {
            by_model
                .entry(model.to_string())
                .or_default()
                .push_back(Reply::Text(text.into()));
        }
    }

    /// Queue a provider error.
    pub fn add_failure(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Fail(message.into()));
        }
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BrokerError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BrokerError> {
        let keyed = self
            .by_model
            .lock()
            .ok()
            .and_then(|mut m| m.get_mut(&request.model).and_then(VecDeque::pop_front));
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let reply = keyed.or_else(|| self.replies.lock().ok().and_then(|mut r| r.pop_front()));
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(BrokerError::provider(message)),
            None => Ok("mock response".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let provider = MockProvider::with_responses(["first", "second"]);
        provider.add_failure("rate limited");

        let req = CompletionRequest::new("m", "sys", "user");
        assert_eq!(provider.complete(req.clone()).await.unwrap(), "first");
        assert_eq!(provider.complete(req.clone()).await.unwrap(), "second");
        assert!(provider.complete(req.clone()).await.is_err());
        assert_eq!(provider.complete(req).await.unwrap(), "mock response");
        assert_eq!(provider.request_count(), 4);
    }

    #[tokio::test]
    async fn model_replies_take_precedence() {
        let provider = MockProvider::with_responses(["shared"]);
        provider.add_response_for("extract", "extracted");

        let extract = CompletionRequest::new("extract", "sys", "user");
        let other = CompletionRequest::new("summarize", "sys", "user");
        assert_eq!(provider.complete(other).await.unwrap(), "shared");
        assert_eq!(provider.complete(extract.clone()).await.unwrap(), "extracted");
        assert_eq!(provider.complete(extract).await.unwrap(), "mock response");
    }
}
