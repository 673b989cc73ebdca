// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sheets v4 `spreadsheets.values` client.

use std::time::Duration;

use async_trait::async_trait;
use brokerbot_core::{AdapterType, BrokerError, HealthStatus, PluginAdapter, Row, TabularStore};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{bearer, TokenSource};

/// Root of the Sheets v4 spreadsheets collection.
pub const API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Response of `values.get`. `values` is omitted for empty ranges.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct ValueBody<'a> {
    values: &'a [Row],
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

/// A [`TabularStore`] bound to one spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    auth: TokenSource,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, auth: TokenSource) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BrokerError::Store {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the API root (wiremock, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/{spreadsheet}/values/{range}{suffix}`.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, BrokerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BrokerError::Config(format!("invalid sheets base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BrokerError::Config("sheets base url cannot be a base".into()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&[Row]>,
    ) -> Result<String, BrokerError> {
        let token = self.auth.token(&self.http).await?;
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::AUTHORIZATION, bearer(&token));
        if let Some(values) = body {
            request = request.json(&ValueBody { values });
        }

        let response = request.send().await.map_err(|e| BrokerError::Store {
            message: format!("sheets request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| BrokerError::Store {
            message: format!("failed to read sheets response: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(%method, status = %status, "sheets response received");

        if status.is_success() {
            return Ok(text);
        }
        let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(api_err) => format!(
                "Sheets API error ({}): {}",
                api_err.error.status.as_deref().unwrap_or("UNKNOWN"),
                api_err.error.message
            ),
            Err(_) => format!("Sheets API returned {status}: {text}"),
        };
        warn!(%method, status = %status, "sheets request rejected");
        Err(BrokerError::store(message))
    }
}

/// Renders a cell as the string the sheet displays.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl PluginAdapter for SheetsClient {
    fn name(&self) -> &str {
        "google-sheets"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, BrokerError> {
        match self.auth.token(&self.http).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, BrokerError> {
        let url = self.values_url(range, "")?;
        let body = self.send(Method::GET, url, None).await?;
        let parsed: ValueRange = serde_json::from_str(&body).map_err(|e| BrokerError::Store {
            message: format!("invalid values response for {range}: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, range: &str, row: Row) -> Result<(), BrokerError> {
        let mut url = self.values_url(range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.send(Method::POST, url, Some(std::slice::from_ref(&row)))
            .await
            .map(|_| ())
    }

    async fn update_range(&self, range: &str, rows: Vec<Row>) -> Result<(), BrokerError> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send(Method::PUT, url, Some(&rows)).await.map(|_| ())
    }
}
