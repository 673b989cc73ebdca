// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `brokerbot prompts` command implementation.

use std::fmt::Write as _;
use std::path::Path;

use brokerbot_pipeline::{PromptError, PromptInfo, PromptStore};

/// Table of the known prompts: id, whether an override exists, description.
pub fn format_list(prompts: &[PromptInfo]) -> String {
    let mut out = String::new();
    for info in prompts {
        let source = if info.overridden { "override" } else { "default" };
        let _ = writeln!(
            out,
            "{:<18} {:<9} {}",
            info.id.to_string(),
            source,
            info.description
        );
    }
    out
}

pub async fn list(store: &PromptStore) -> String {
    format_list(&store.list().await)
}

pub async fn show(store: &PromptStore, id: &str) -> Result<String, PromptError> {
    store.get(id).await
}

/// Replaces prompt `id` with the contents of `file`.
pub async fn set(store: &PromptStore, id: &str, file: &Path) -> Result<(), PromptError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| PromptError::Io {
            path: file.to_path_buf(),
            source,
        })?;
    store.save(id, &content).await
}
