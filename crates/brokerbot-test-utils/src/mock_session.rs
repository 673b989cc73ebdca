// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat session capturing outbound messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use brokerbot_core::{BrokerError, GroupMetadata, InboundMessage, Session};
use tokio::sync::Notify;

/// A message sent through [`MockSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    /// Id of the quoted message, if any.
    pub quoted: Option<String>,
}

/// A session that records sends and serves group metadata from a map.
#[derive(Debug, Default)]
pub struct MockSession {
    sent: Mutex<Vec<SentMessage>>,
    groups: Mutex<HashMap<String, String>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    notify: Notify,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group subject returned by `group_metadata`.
    pub fn with_group(self, id: &str, subject: &str) -> Self {
        if let Ok(mut groups) = self.groups.lock() {
            groups.insert(id.to_string(), subject.to_string());
        }
        self
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` messages were sent.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<SentMessage> {
        loop {
            let notified = self.notify.notified();
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        quoted: Option<&InboundMessage>,
    ) -> Result<(), BrokerError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BrokerError::transport("send failed"));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
                quoted: quoted.map(|m| m.id.clone()),
            });
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn group_metadata(&self, group_id: &str) -> Result<GroupMetadata, BrokerError> {
        let subject = self
            .groups
            .lock()
            .ok()
            .and_then(|g| g.get(group_id).cloned())
            .ok_or_else(|| BrokerError::transport(format!("unknown group {group_id}")))?;
        Ok(GroupMetadata {
            id: group_id.to_string(),
            subject,
            participants: Vec::new(),
        })
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
