// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed credential store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brokerbot_core::{BrokerError, CredentialStore};
use tracing::{debug, info};

const CREDS_FILE: &str = "creds.json";

/// Persists the session credential document as `<dir>/creds.json`.
///
/// Writes go to a temporary file that is renamed over the previous one, so a
/// crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn creds_path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }
}

fn io_error(e: impl std::error::Error + Send + Sync + 'static) -> BrokerError {
    BrokerError::Credentials {
        source: Box::new(e),
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<serde_json::Value>, BrokerError> {
        let path = self.creds_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted credentials");
                return Ok(None);
            }
            Err(e) => return Err(io_error(e)),
        };
        serde_json::from_str(&content).map(Some).map_err(io_error)
    }

    async fn save(&self, credentials: &serde_json::Value) -> Result<(), BrokerError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        let body = serde_json::to_vec_pretty(credentials).map_err(io_error)?;
        let tmp = self.dir.join(format!("{CREDS_FILE}.tmp"));
        tokio::fs::write(&tmp, body).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, self.creds_path())
            .await
            .map_err(io_error)?;
        debug!(dir = %self.dir.display(), "credentials persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<(), BrokerError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!(dir = %self.dir.display(), "session credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(tmp.path().join("auth"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_document() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(tmp.path().join("auth"));
        let creds = serde_json::json!({"me": {"id": "972501234567:3@s.whatsapp.net"}, "registered": true});

        store.save(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(creds));
        assert!(!tmp.path().join("auth/creds.json.tmp").exists());
    }

    #[tokio::test]
    async fn clear_removes_directory_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(tmp.path().join("auth"));
        store.save(&serde_json::json!({"k": 1})).await.unwrap();

        store.clear().await.unwrap();
        assert!(!store.dir().exists());
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("auth");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("creds.json"), "{not json").unwrap();

        let store = FileCredentialStore::new(dir);
        assert!(matches!(
            store.load().await,
            Err(BrokerError::Credentials { .. })
        ));
    }
}
