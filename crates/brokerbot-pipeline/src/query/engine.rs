// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question -> criteria -> matching listings -> summary.

use std::sync::Arc;

use brokerbot_core::{CompletionRequest, ProviderAdapter, Row, TabularStore};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::QueryError;
use crate::prompts::{PromptId, PromptStore};
use crate::query::filter::{filter_properties, FilterPredicate};
use crate::query::summary::short_list;

pub const INTERPRET_SYSTEM: &str =
    "You are a helpful assistant that extracts filter criteria from real estate queries.";
pub const SUMMARIZE_SYSTEM: &str = "אתה עוזר מועיל המסכם תוצאות חיפוש נדלן";

/// Models and limits of the query engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub interpret_model: String,
    pub summarize_model: String,
    /// Matches described to the summarizer.
    pub summary_limit: usize,
}

/// Criteria parsed from a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub predicate: FilterPredicate,
    /// The model's JSON as written, for the summary prompt.
    pub raw: serde_json::Value,
}

/// Answers questions about the stored listings. Keeps no state between
/// questions.
pub struct QueryEngine {
    provider: Arc<dyn ProviderAdapter>,
    store: Arc<dyn TabularStore>,
    prompts: Arc<PromptStore>,
    settings: QuerySettings,
}

impl QueryEngine {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        store: Arc<dyn TabularStore>,
        prompts: Arc<PromptStore>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            provider,
            store,
            prompts,
            settings,
        }
    }

    /// Asks the model for the criteria of `question`.
    pub async fn interpret(&self, question: &str) -> Result<Interpretation, QueryError> {
        let template = self.prompts.load(PromptId::QueryInterpret).await;
        let prompt = template.replacen("<USER_QUERY>", question, 1);
        let reply = self
            .provider
            .complete(CompletionRequest::new(
                self.settings.interpret_model.clone(),
                INTERPRET_SYSTEM,
                prompt,
            ))
            .await?;
        debug!(reply = %reply, "interpretation received");
        let raw: serde_json::Value = serde_json::from_str(reply.trim())
            .map_err(|source| QueryError::Interpret { source })?;
        let predicate = FilterPredicate::deserialize(&raw)
            .map_err(|source| QueryError::Interpret { source })?;
        Ok(Interpretation { predicate, raw })
    }

    /// Asks the model to describe `matches` as an answer to `question`.
    pub async fn summarize(
        &self,
        question: &str,
        criteria: &serde_json::Value,
        matches: &[Row],
    ) -> Result<String, QueryError> {
        let filter_json =
            serde_json::to_string_pretty(criteria).unwrap_or_else(|_| "{}".to_string());
        let template = self.prompts.load(PromptId::QuerySummarize).await;
        let prompt = template
            .replacen("<USER_QUERY>", question, 1)
            .replacen("<FILTER_JSON>", &filter_json, 1)
            .replacen("<COUNT>", &matches.len().to_string(), 1)
            .replacen("<SHORT_LIST>", &short_list(matches, self.settings.summary_limit), 1);
        let summary = self
            .provider
            .complete(CompletionRequest::new(
                self.settings.summarize_model.clone(),
                SUMMARIZE_SYSTEM,
                prompt,
            ))
            .await?;
        Ok(summary.trim().to_string())
    }

    /// Interprets, filters and summarizes.
    pub async fn answer(&self, question: &str) -> Result<String, QueryError> {
        let interpretation = self.interpret(question).await?;
        let matches = filter_properties(self.store.as_ref(), &interpretation.predicate).await?;
        info!(matched = matches.len(), "query matched listings");
        self.summarize(question, &interpretation.raw, &matches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerbot_core::BrokerError;
    use brokerbot_test_utils::{MemoryStore, MockProvider};

    use crate::row::{COLUMN_COUNT, COL_CITY, COL_PRICES, COL_ROOMS, COL_STATUS};

    fn listing(id: &str, city: &str, rooms: &str, price: &str) -> Vec<String> {
        let mut row = vec![String::new(); COLUMN_COUNT];
        row[0] = id.into();
        row[COL_CITY] = city.into();
        row[COL_ROOMS] = rooms.into();
        row[COL_PRICES[0]] = price.into();
        row[COL_STATUS] = "פעיל".into();
        row
    }

    fn engine(provider: Arc<MockProvider>, store: Arc<MemoryStore>, dir: &std::path::Path) -> QueryEngine {
        QueryEngine::new(
            provider,
            store,
            Arc::new(PromptStore::new(dir)),
            QuerySettings {
                interpret_model: "interpret-model".into(),
                summarize_model: "summarize-model".into(),
                summary_limit: 5,
            },
        )
    }

    #[tokio::test]
    async fn answer_runs_interpret_filter_summarize() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new().with_sheet(
            "Assets",
            [
                vec!["מזהה".to_string()],
                listing("0001", "חיפה", "3", "1800000"),
                listing("0002", "חיפה", "3", "2500000"),
                listing("0003", "ירושלים", "4", "1900000"),
            ],
        ));
        let provider = Arc::new(MockProvider::with_responses([
            r#"{"city": "חיפה", "minRooms": 3, "maxPrice": 2000000}"#,
            "  נמצא נכס אחד בחיפה.  ",
        ]));
        let engine = engine(provider.clone(), store, dir.path());

        let answer = engine.answer("3 חדרים בחיפה עד 2 מיליון").await.unwrap();
        assert_eq!(answer, "נמצא נכס אחד בחיפה.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "interpret-model");
        assert_eq!(requests[0].system, INTERPRET_SYSTEM);
        assert!(requests[0].user.contains("Question: 3 חדרים בחיפה עד 2 מיליון"));

        assert_eq!(requests[1].model, "summarize-model");
        assert_eq!(requests[1].system, SUMMARIZE_SYSTEM);
        let summary_prompt = &requests[1].user;
        assert!(summary_prompt.contains("נמצאו 1 נכסים"));
        assert!(summary_prompt.contains("\"city\": \"חיפה\""));
        assert!(summary_prompt.contains("\"maxPrice\": 2000000"));
        assert!(!summary_prompt.contains("2000000.0"));
        assert!(!summary_prompt.contains("includeSold"));
        assert!(summary_prompt.contains("מחיר עדכני: 1,800,000 ₪"));
        assert!(!summary_prompt.contains("<SHORT_LIST>"));
    }

    #[tokio::test]
    async fn unparsable_interpretation_fails_without_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(MockProvider::with_responses(["```json\n{}\n```"]));
        let engine = engine(provider.clone(), store.clone(), dir.path());

        let err = engine.answer("?").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse query interpretation");
        assert!(store.reads().is_empty());
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.fail_reads_of("Assets");
        let provider = Arc::new(MockProvider::with_responses(["{}"]));
        let engine = engine(provider, store, dir.path());

        let err = engine.answer("?").await.unwrap_err();
        assert!(matches!(err, QueryError::Broker(BrokerError::Store { .. })));
    }

    #[tokio::test]
    async fn overridden_prompt_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = PromptStore::new(dir.path());
        prompts.save("query_interpret", "Q=<USER_QUERY>").await.unwrap();
        let provider = Arc::new(MockProvider::with_responses(["{}"]));
        let engine = engine(provider.clone(), Arc::new(MemoryStore::new()), dir.path());

        let interpretation = engine.interpret("דירה בחיפה").await.unwrap();
        assert_eq!(interpretation.predicate, FilterPredicate::default());
        assert_eq!(provider.requests()[0].user, "Q=דירה בחיפה");
    }
}
