// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational queries over the stored listings.

pub mod engine;
pub mod filter;
pub mod summary;

pub use engine::{Interpretation, QueryEngine, QuerySettings};
pub use filter::{filter_properties, FilterPredicate};
