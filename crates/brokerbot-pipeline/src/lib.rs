// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listing extraction and conversational queries for brokerbot.
//!
//! - [`MessageExtractor`] turns a monitored group message into an Assets row
//!   using the extraction model and the office's reference lists.
//! - [`RowWriter`] is the single task that allocates asset ids and appends
//!   rows.
//! - [`QueryEngine`] answers the operator's questions: interpret, filter,
//!   summarize.
//! - [`MessageRouter`] classifies inbound messages and runs each pipeline on
//!   its own task.
//! - [`PromptStore`] holds the three prompt templates and their overrides.

pub mod assets;
pub mod error;
pub mod extractor;
pub mod location;
pub mod prompts;
pub mod query;
pub mod record;
pub mod router;
pub mod row;
pub mod vocabulary;
pub mod writer;

pub use error::{ExtractError, PromptError, QueryError};
pub use extractor::MessageExtractor;
pub use prompts::{PromptId, PromptInfo, PromptStore};
pub use query::{FilterPredicate, Interpretation, QueryEngine, QuerySettings};
pub use record::ExtractedRecord;
pub use router::{IgnoreReason, MessageRouter, Route, RoutingRules};
pub use row::ListingRow;
pub use vocabulary::VocabularySnapshot;
pub use writer::RowWriter;
