// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Sheets tabular store for brokerbot.
//!
//! [`SheetsClient`] implements `TabularStore` over the Sheets v4 REST API:
//! range reads, RAW row appends with inserted rows, and range updates.
//! Authentication is a service account (RS256 JWT exchanged for an access
//! token) or a pre-issued bearer token.

pub mod auth;
pub mod client;

use std::path::Path;

use brokerbot_config::model::SheetsConfig;
use brokerbot_core::BrokerError;
use tracing::info;

pub use auth::{ServiceAccountKey, TokenSource};
pub use client::SheetsClient;

/// Builds a client from the `[sheets]` configuration section.
///
/// A configured `access_token` wins over `service_account_file`.
pub async fn from_config(config: &SheetsConfig) -> Result<SheetsClient, BrokerError> {
    let spreadsheet_id = config
        .spreadsheet_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BrokerError::Config("sheets.spreadsheet_id is not set".into()))?;

    let auth = match (&config.access_token, &config.service_account_file) {
        (Some(token), _) if !token.is_empty() => TokenSource::fixed(token.clone()),
        (_, Some(path)) if !path.is_empty() => {
            let key = ServiceAccountKey::from_file(Path::new(path)).await?;
            info!(client_email = %key.client_email, "using service account for sheets");
            TokenSource::service_account(key)
        }
        _ => {
            return Err(BrokerError::Config(
                "set sheets.service_account_file or sheets.access_token".into(),
            ));
        }
    };

    let mut client = SheetsClient::new(spreadsheet_id, auth)?;
    if let Some(url) = config.base_url.as_deref().filter(|u| !u.is_empty()) {
        client = client.with_base_url(url);
    }
    Ok(client)
}
