// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based listing extraction from group messages.
//!
//! One message yields at most one listing: the message and its metadata go
//! to the extraction model together with the office's reference lists, the
//! JSON reply is parsed (with one repair pass for a common quoting mistake),
//! locations are checked against the lists, and the finished listing is
//! handed to the [`RowWriter`].

use std::sync::Arc;

use brokerbot_core::{
    normalize_jid, CompletionRequest, InboundMessage, ProviderAdapter, Row, Session, TabularStore,
};
use chrono::{Local, TimeZone};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::assets::realtor_name;
use crate::error::ExtractError;
use crate::location::{location_note, validation_error_note, LocationKind};
use crate::prompts::{PromptId, PromptStore};
use crate::record::ExtractedRecord;
use crate::row::ListingRow;
use crate::vocabulary::{render_prompt, VocabularySnapshot};
use crate::writer::RowWriter;

/// Shown to the model when the sender has no display name.
const UNKNOWN_SENDER: &str = "Unknown";

/// Removes markdown code fences (```` ```json ```` and ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

fn parse_object(json: &str) -> Result<ExtractedRecord, serde_json::Error> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    serde_json::from_value(serde_json::Value::Object(object))
}

/// Parses a model reply into a record.
///
/// When the first parse fails, the unescaped quote inside the currency
/// label `ש"ח` is escaped and the reply parsed once more.
pub fn parse_model_output(raw: &str) -> Result<ExtractedRecord, ExtractError> {
    let json = strip_code_fences(raw);
    match parse_object(&json) {
        Ok(record) => Ok(record),
        Err(first) => {
            let repaired = json.replace("ש\"ח", "ש\\\"ח");
            if repaired == json {
                return Err(ExtractError::Parse { source: first });
            }
            debug!("retrying model output with escaped currency label");
            parse_object(&repaired).map_err(|source| ExtractError::Parse { source })
        }
    }
}

/// `dd/mm/yyyy HH:MM` of a unix timestamp in `tz`; now when absent.
pub fn format_timestamp_in<Tz: TimeZone>(timestamp: Option<i64>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let at = timestamp
        .and_then(|secs| tz.timestamp_opt(secs, 0).single())
        .unwrap_or_else(|| chrono::Utc::now().with_timezone(tz));
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// [`format_timestamp_in`] the local time zone.
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    format_timestamp_in(timestamp, &Local)
}

/// Metadata block plus message, as sent to the model.
pub fn build_user_prompt(
    group_id: &str,
    group_name: &str,
    sender_name: &str,
    phone: &str,
    timestamp: &str,
    text: &str,
) -> String {
    format!(
        "Group id: {group_id}\nGroup name: {group_name}\nSender name: {sender_name}\n\
         Phone number: {phone}\nTimestamp: {timestamp}\n\nMessage:\n{text}"
    )
}

/// Notes for every extracted location missing from the vocabulary.
pub fn location_notes(
    record: &ExtractedRecord,
    vocabulary: Result<&VocabularySnapshot, &str>,
) -> Vec<String> {
    LocationKind::iter()
        .filter_map(|kind| {
            let value = kind.value(record);
            if value.trim().is_empty() {
                return None;
            }
            match vocabulary {
                Ok(vocabulary) => location_note(kind, value, vocabulary),
                Err(error) => Some(validation_error_note(kind, error)),
            }
        })
        .collect()
}

/// Turns group messages into listing rows.
pub struct MessageExtractor {
    provider: Arc<dyn ProviderAdapter>,
    store: Arc<dyn TabularStore>,
    prompts: Arc<PromptStore>,
    writer: RowWriter,
    model: String,
}

impl MessageExtractor {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        store: Arc<dyn TabularStore>,
        prompts: Arc<PromptStore>,
        writer: RowWriter,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            prompts,
            writer,
            model: model.into(),
        }
    }

    /// Extracts a listing and writes it.
    ///
    /// Returns the appended row, or `None` when the message has no text.
    pub async fn process(
        &self,
        session: &dyn Session,
        message: &InboundMessage,
    ) -> Result<Option<Row>, ExtractError> {
        let Some(listing) = self.extract(session, message).await? else {
            return Ok(None);
        };
        let row = self.writer.submit(listing).await?;
        Ok(Some(row))
    }

    /// Builds the listing for a message without writing it.
    pub async fn extract(
        &self,
        session: &dyn Session,
        message: &InboundMessage,
    ) -> Result<Option<ListingRow>, ExtractError> {
        let Some(text) = message.text() else {
            debug!(message_id = %message.id, "no text, skipping extraction");
            return Ok(None);
        };

        let group_id = message.chat_id.as_str();
        let group_name = match session.group_metadata(group_id).await {
            Ok(metadata) => metadata.subject,
            Err(e) => {
                warn!(%group_id, error = %e, "group metadata unavailable");
                String::new()
            }
        };
        let phone = normalize_jid(message.sender_jid()).to_string();
        let sender_name = message.push_name.as_deref().unwrap_or(UNKNOWN_SENDER);
        let timestamp = format_timestamp(message.timestamp);

        let vocabulary = VocabularySnapshot::fetch(self.store.as_ref()).await;
        if let Err(e) = &vocabulary {
            warn!(error = %e, "failed to load reference lists");
        }
        let template = self.prompts.load(PromptId::GroupsListener).await;
        let system = render_prompt(&template, vocabulary.as_ref().ok());
        let user = build_user_prompt(group_id, &group_name, sender_name, &phone, &timestamp, text);

        info!(%group_id, %phone, message_id = %message.id, "extracting listing");
        let reply = self
            .provider
            .complete(CompletionRequest::new(self.model.clone(), system, user))
            .await?;
        debug!(reply = %reply, "extraction model replied");

        let mut record = parse_model_output(&reply)?;

        let notes = match &vocabulary {
            Ok(vocabulary) => location_notes(&record, Ok(vocabulary)),
            Err(e) => location_notes(&record, Err(&e.to_string())),
        };
        record.append_internal_notes(&notes);

        let realtor_name = realtor_name(self.store.as_ref(), &phone).await;

        Ok(Some(ListingRow {
            record,
            realtor_name,
            phone,
            timestamp,
            group_name,
        }))
    }
}
