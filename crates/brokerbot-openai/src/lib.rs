// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI provider adapter for brokerbot.
//!
//! This crate implements [`ProviderAdapter`] for the Chat Completions API:
//! one system message, one user message, text back.

pub mod client;
pub mod types;

use async_trait::async_trait;
use brokerbot_config::model::OpenAiConfig;
use brokerbot_core::{
    AdapterType, BrokerError, CompletionRequest, HealthStatus, PluginAdapter, ProviderAdapter,
};
use secrecy::SecretString;
use tracing::{debug, info};

pub use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest};

/// OpenAI provider implementing [`ProviderAdapter`].
///
/// API key resolution order: `openai.api_key` -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` configuration section.
    pub fn new(config: &OpenAiConfig) -> Result<Self, BrokerError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let mut client = OpenAiClient::new(&api_key)?;
        if let Some(url) = config.base_url.as_deref().filter(|u| !u.is_empty()) {
            client = client.with_base_url(url);
        }

        info!(
            extraction_model = %config.extraction_model,
            summarize_model = %config.summarize_model,
            "OpenAI provider initialized"
        );
        Ok(Self { client })
    }

    /// Creates a provider with an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BrokerError> {
        // A test request would bill tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BrokerError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BrokerError> {
        let api_request = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage::system(request.system),
                ChatMessage::user(request.user),
            ],
        };
        let response = self.client.chat(&api_request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        response
            .first_content()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| BrokerError::provider("completion returned no content"))
    }
}

/// Resolves the API key from config or the `OPENAI_API_KEY` environment variable.
fn resolve_api_key(config_key: &Option<String>) -> Result<SecretString, BrokerError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(SecretString::from(key.clone()));
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| {
            BrokerError::Config(
                "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn resolve_api_key_from_config() {
        let key = resolve_api_key(&Some("sk-config".into())).unwrap();
        assert_eq!(key.expose_secret(), "sk-config");
    }

    #[test]
    fn resolve_api_key_empty_config_falls_back_to_env() {
        let result = resolve_api_key(&Some(String::new()));
        // Depends on the environment; an empty key is never returned.
        match result {
            Ok(key) => assert!(!key.expose_secret().is_empty()),
            Err(e) => assert!(e.to_string().contains("API key not found"), "got: {e}"),
        }
    }

    #[tokio::test]
    async fn provider_returns_trimmed_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-2",
                "model": "gpt-3.5-turbo",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "  נמצאו 2 נכסים \n"}}]
            })))
            .mount(&server)
            .await;

        let config = OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: Some(server.uri()),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(&config).unwrap();
        let text = provider
            .complete(CompletionRequest::new("gpt-3.5-turbo", "sys", "user"))
            .await
            .unwrap();
        assert_eq!(text, "נמצאו 2 נכסים");
        assert_eq!(provider.name(), "openai");
    }

    #[tokio::test]
    async fn provider_rejects_empty_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-3", "model": "m", "choices": []
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_client(
            OpenAiClient::new(&SecretString::from("sk".to_string()))
                .unwrap()
                .with_base_url(server.uri()),
        );
        let err = provider
            .complete(CompletionRequest::new("m", "s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Provider { .. }));
    }
}
