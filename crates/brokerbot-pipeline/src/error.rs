// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline-local error types.
//!
//! Adapter failures arrive as [`BrokerError`] and are wrapped transparently;
//! the variants here cover what only the pipelines can get wrong.

use std::path::PathBuf;

use brokerbot_core::BrokerError;
use thiserror::Error;

/// Failure while turning a group message into a listing row.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The model reply was not a JSON object, even after repair.
    #[error("failed to parse model output: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    /// The row writer has shut down.
    #[error("row writer is not running")]
    WriterClosed,
}

/// Failure while answering an operator question.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Failed to parse query interpretation")]
    Interpret {
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while reading or writing a prompt template.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("failed to access prompt file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
