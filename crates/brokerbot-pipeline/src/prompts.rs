// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates with on-disk overrides.
//!
//! Every prompt has a compiled-in default. Writing `<dir>/<id>.txt`
//! overrides it; the file is re-read on each use, so edits apply to the next
//! message without a restart.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use crate::error::PromptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PromptId {
    /// System prompt of the listing extractor.
    GroupsListener,
    /// Turns a question into filter criteria.
    QueryInterpret,
    /// Summarizes matched listings.
    QuerySummarize,
}

impl PromptId {
    pub fn description(self) -> &'static str {
        match self {
            Self::GroupsListener => "עיבוד הודעות קבוצות WhatsApp והסקת מידע על נכסים",
            Self::QueryInterpret => "פירוש שאילתות חיפוש נכסים",
            Self::QuerySummarize => "סיכום תוצאות חיפוש נכסים",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            Self::GroupsListener => include_str!("../prompts/groups_listener.txt"),
            Self::QueryInterpret => include_str!("../prompts/query_interpret.txt"),
            Self::QuerySummarize => include_str!("../prompts/query_summarize.txt"),
        }
    }

    /// Display name: the id with spaces.
    pub fn name(self) -> String {
        self.as_ref().replace('_', " ")
    }
}

/// A row of `prompts list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInfo {
    pub id: PromptId,
    pub name: String,
    pub description: &'static str,
    /// Whether an override file exists.
    pub overridden: bool,
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: PromptId) -> PathBuf {
        self.dir.join(format!("{id}.txt"))
    }

    pub async fn list(&self) -> Vec<PromptInfo> {
        let mut prompts = Vec::new();
        for id in PromptId::iter() {
            let overridden = tokio::fs::try_exists(self.path(id)).await.unwrap_or(false);
            prompts.push(PromptInfo {
                id,
                name: id.name(),
                description: id.description(),
                overridden,
            });
        }
        prompts
    }

    /// Content of the prompt named `id`.
    pub async fn get(&self, id: &str) -> Result<String, PromptError> {
        let id = parse_id(id)?;
        match self.read_override(id).await? {
            Some(content) => Ok(content),
            None => Ok(id.default_text().to_string()),
        }
    }

    /// Writes an override for the prompt named `id`.
    pub async fn save(&self, id: &str, content: &str) -> Result<(), PromptError> {
        let id = parse_id(id)?;
        let io_error = |source| PromptError::Io {
            path: self.path(id),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        tokio::fs::write(self.path(id), content)
            .await
            .map_err(io_error)?;
        debug!(prompt = %id, "prompt override saved");
        Ok(())
    }

    /// The prompt to use right now; an unreadable override falls back to
    /// the default.
    pub async fn load(&self, id: PromptId) -> String {
        match self.read_override(id).await {
            Ok(Some(content)) => content,
            Ok(None) => id.default_text().to_string(),
            Err(e) => {
                warn!(prompt = %id, error = %e, "using default prompt");
                id.default_text().to_string()
            }
        }
    }

    async fn read_override(&self, id: PromptId) -> Result<Option<String>, PromptError> {
        let path = self.path(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PromptError::Io { path, source }),
        }
    }
}

fn parse_id(id: &str) -> Result<PromptId, PromptError> {
    PromptId::from_str(id).map_err(|_| PromptError::NotFound(id.to_string()))
}
