// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use brokerbot_core::types::GROUP_SUFFIX;

use crate::diagnostic::ConfigError;
use crate::model::BrokerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &BrokerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "bot.log_level `{}` must be one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.bot.response_marker.trim().is_empty() {
        errors.push(ConfigError::validation("bot.response_marker must not be empty"));
    }

    if config.bot.summary_limit == 0 {
        errors.push(ConfigError::validation("bot.summary_limit must be at least 1"));
    }

    let conn = &config.connection;
    let url = conn.bridge_url.trim();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(ConfigError::validation(format!(
            "connection.bridge_url `{url}` must start with ws:// or wss://"
        )));
    }

    if conn.auth_dir.trim().is_empty() {
        errors.push(ConfigError::validation("connection.auth_dir must not be empty"));
    }

    for (key, value) in [
        ("connect_timeout_ms", conn.connect_timeout_ms),
        ("keep_alive_ms", conn.keep_alive_ms),
        ("query_timeout_ms", conn.query_timeout_ms),
        ("backoff_base_secs", conn.backoff_base_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!(
                "connection.{key} must be greater than zero"
            )));
        }
    }

    if conn.backoff_cap_secs < conn.backoff_base_secs {
        errors.push(ConfigError::validation(format!(
            "connection.backoff_cap_secs ({}) must not be below backoff_base_secs ({})",
            conn.backoff_cap_secs, conn.backoff_base_secs
        )));
    }

    for group in &config.monitor.groups {
        if !group.ends_with(GROUP_SUFFIX) {
            errors.push(ConfigError::validation(format!(
                "monitor.groups entry `{group}` is not a group id (expected a `{GROUP_SUFFIX}` suffix)"
            )));
        }
    }

    if config.prompts.dir.trim().is_empty() {
        errors.push(ConfigError::validation("prompts.dir must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that the external services needed by `serve` are configured.
///
/// Kept apart from [`validate_config`] so that `config check` and the prompt
/// commands work on a machine without credentials.
pub fn validate_serve_requirements(config: &BrokerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config
        .sheets
        .spreadsheet_id
        .as_deref()
        .is_none_or(|id| id.trim().is_empty())
    {
        errors.push(ConfigError::MissingKey {
            key: "sheets.spreadsheet_id".to_string(),
        });
    }

    if config.sheets.service_account_file.is_none() && config.sheets.access_token.is_none() {
        errors.push(ConfigError::validation(
            "either sheets.service_account_file or sheets.access_token must be set",
        ));
    }

    if config.openai.api_key.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "openai.api_key".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&BrokerConfig::default()).is_ok());
    }

    #[test]
    fn rejects_http_bridge_url() {
        let mut config = BrokerConfig::default();
        config.connection.bridge_url = "http://localhost:8787".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("bridge_url"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = BrokerConfig::default();
        config.bot.summary_limit = 0;
        config.bot.log_level = "loud".into();
        config.connection.backoff_cap_secs = 0;
        config.monitor.groups = vec!["972501234567@s.whatsapp.net".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "got: {errors:?}");
    }

    #[test]
    fn serve_requirements_need_credentials() {
        let errors = validate_serve_requirements(&BrokerConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 3);

        let mut config = BrokerConfig::default();
        config.sheets.spreadsheet_id = Some("1AbC".into());
        config.sheets.access_token = Some("ya29.token".into());
        config.openai.api_key = Some("sk-test".into());
        assert!(validate_serve_requirements(&config).is_ok());
    }
}
