// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./brokerbot.toml` > `~/.config/brokerbot/brokerbot.toml` >
//! `/etc/brokerbot/brokerbot.toml`, with `BROKERBOT_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BrokerConfig;

/// Config file name searched in every location.
pub const CONFIG_FILE_NAME: &str = "brokerbot.toml";

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/brokerbot/brokerbot.toml";

/// Sections recognized by the environment provider.
const ENV_SECTIONS: &[&str] = &["bot", "connection", "openai", "sheets", "monitor", "prompts"];

/// The user's XDG config path, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("brokerbot").join(CONFIG_FILE_NAME))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/brokerbot/brokerbot.toml`
/// 3. `~/.config/brokerbot/brokerbot.toml`
/// 4. `./brokerbot.toml`
/// 5. `BROKERBOT_*` environment variables
pub fn load_config() -> Result<BrokerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BrokerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BrokerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BrokerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BrokerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BrokerConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Environment provider mapping `BROKERBOT_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys themselves
/// contain underscores: `BROKERBOT_SHEETS_SPREADSHEET_ID` must become
/// `sheets.spreadsheet_id`, not `sheets.spreadsheet.id`.
fn env_provider() -> Env {
    Env::prefixed("BROKERBOT_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
