// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use brokerbot_core::SessionOptions;
use serde::{Deserialize, Serialize};

/// Top-level brokerbot configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Bot identity and query behavior.
    #[serde(default)]
    pub bot: BotConfig,

    /// Chat session and reconnect policy.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Language model settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Google Sheets store settings.
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Groups whose messages are turned into listings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Prompt template overrides.
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// Bot identity and query behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix of every reply the bot sends; messages starting with it are never processed.
    #[serde(default = "default_response_marker")]
    pub response_marker: String,

    /// How many matches are described to the summarizer.
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,

    /// Answer questions sent to the bot's own chat.
    #[serde(default = "default_true")]
    pub query_enabled: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            response_marker: default_response_marker(),
            summary_limit: default_summary_limit(),
            query_enabled: true,
        }
    }
}

fn default_bot_name() -> String {
    "brokerbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_response_marker() -> String {
    "[BOT]".to_string()
}

fn default_summary_limit() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Chat session settings and the reconnect policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// WebSocket URL of the chat-protocol bridge.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Directory holding the persisted session credentials.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_retry_request_delay_ms")]
    pub retry_request_delay_ms: u64,

    /// Browser fingerprint announced to the network (platform, browser, version).
    #[serde(default = "default_browser")]
    pub browser: Vec<String>,

    /// Delay before reconnecting after a restart-required (515) closure.
    #[serde(default = "default_device_removed_delay_secs")]
    pub device_removed_delay_secs: u64,

    /// Delay before reconnecting after a timed-out (440) closure.
    #[serde(default = "default_timeout_delay_secs")]
    pub timeout_delay_secs: u64,

    /// Base of the exponential backoff used for any other closure code.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Upper bound of the exponential backoff.
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// Session setup failures tolerated before the first successful open.
    #[serde(default = "default_max_setup_attempts")]
    pub max_setup_attempts: u32,

    /// The k-th setup retry waits `k * setup_retry_step_secs`.
    #[serde(default = "default_setup_retry_step_secs")]
    pub setup_retry_step_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            auth_dir: default_auth_dir(),
            connect_timeout_ms: default_connect_timeout_ms(),
            keep_alive_ms: default_keep_alive_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            retry_request_delay_ms: default_retry_request_delay_ms(),
            browser: default_browser(),
            device_removed_delay_secs: default_device_removed_delay_secs(),
            timeout_delay_secs: default_timeout_delay_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            max_setup_attempts: default_max_setup_attempts(),
            setup_retry_step_secs: default_setup_retry_step_secs(),
        }
    }
}

impl ConnectionConfig {
    /// Session tuning handed to the transport on every open.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            keep_alive: Duration::from_millis(self.keep_alive_ms),
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            retry_request_delay: Duration::from_millis(self.retry_request_delay_ms),
            browser: self.browser.clone(),
        }
    }
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:8787".to_string()
}

fn default_auth_dir() -> String {
    "auth_info".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    60_000
}

fn default_keep_alive_ms() -> u64 {
    25_000
}

fn default_query_timeout_ms() -> u64 {
    60_000
}

fn default_retry_request_delay_ms() -> u64 {
    250
}

fn default_browser() -> Vec<String> {
    vec!["Ubuntu".into(), "Chrome".into(), "20.0.04".into()]
}

fn default_device_removed_delay_secs() -> u64 {
    5
}

fn default_timeout_delay_secs() -> u64 {
    10
}

fn default_backoff_base_secs() -> u64 {
    1
}

fn default_backoff_cap_secs() -> u64 {
    60
}

fn default_max_setup_attempts() -> u32 {
    5
}

fn default_setup_retry_step_secs() -> u64 {
    3
}

/// OpenAI chat-completions settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. Falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override of the chat-completions endpoint (proxies, compatible servers).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model that turns group messages into listing records.
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,

    /// Model that turns questions into filter criteria.
    #[serde(default = "default_interpret_model")]
    pub interpret_model: String,

    /// Model that summarizes matched listings.
    #[serde(default = "default_summarize_model")]
    pub summarize_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            extraction_model: default_extraction_model(),
            interpret_model: default_interpret_model(),
            summarize_model: default_summarize_model(),
        }
    }
}

fn default_extraction_model() -> String {
    "gpt-4o-mini-2024-07-18".to_string()
}

fn default_interpret_model() -> String {
    "gpt-4o-mini-2024-07-18".to_string()
}

fn default_summarize_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Google Sheets settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    /// Spreadsheet holding the Assets, Realtors, Streets, Apt_Types and Apt_Conditions sheets.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Path to a Google service-account JSON key.
    #[serde(default)]
    pub service_account_file: Option<String>,

    /// Pre-issued OAuth access token, used instead of the service account when set.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Override of the Sheets API root.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Monitored group settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Group chat ids (`...@g.us`) whose messages are processed.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Prompt template settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    /// Directory with `<prompt-id>.txt` overrides.
    #[serde(default = "default_prompts_dir")]
    pub dir: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
        }
    }
}

fn default_prompts_dir() -> String {
    "prompts".to_string()
}
