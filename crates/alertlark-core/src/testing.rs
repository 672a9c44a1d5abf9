//! In-memory collaborators for exercising the workflows without a chat
//! platform, an alert source or Redis.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::alertmanager::AlertSource;
use crate::error::{CoreError, Result};
use crate::messaging::{CardRenderer, Messenger};
use crate::store::CorrelationStore;
use crate::types::{SilenceRequest, SourceAlert, UserProfile, WebhookAlert};

/// Message id returned by [`FailingStore::deletes_only`] lookups.
pub const FAILING_STORE_MESSAGE: &str = "om_failing_store";

/// A message recorded by [`FakeMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    /// A new message posted to a channel.
    New {
        /// Target channel.
        channel: String,
        /// Id assigned to the message.
        message_id: String,
        /// Rendered card.
        content: String,
    },
    /// A card reply in a message's thread.
    ThreadReply {
        /// Message replied to.
        message_id: String,
        /// Rendered card.
        content: String,
    },
    /// A plain-text reply.
    Text {
        /// Message replied to.
        message_id: String,
        /// Reply text.
        text: String,
    },
}

#[derive(Debug, Default)]
struct MessengerState {
    sent: Vec<SentMessage>,
    next_id: usize,
    users: HashMap<String, UserProfile>,
}

/// Recording [`Messenger`]. Clones share their recorded messages.
#[derive(Debug, Clone, Default)]
pub struct FakeMessenger {
    state: Arc<Mutex<MessengerState>>,
    fail_replies: bool,
    fail_lookup: bool,
    send_limit: Option<usize>,
}

impl FakeMessenger {
    /// Creates a messenger where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes thread and text replies fail.
    #[must_use]
    pub const fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    /// Makes user lookups fail.
    #[must_use]
    pub const fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    /// Lets `count` new messages succeed and fails every one after.
    #[must_use]
    pub const fn failing_after(mut self, count: usize) -> Self {
        self.send_limit = Some(count);
        self
    }

    /// Registers a user profile for lookups.
    #[must_use]
    pub fn with_user(self, open_id: &str, email: Option<&str>) -> Self {
        self.state.lock().users.insert(
            open_id.to_string(),
            UserProfile {
                open_id: open_id.to_string(),
                name: None,
                email: email.map(str::to_string),
            },
        );
        self
    }

    /// Returns every recorded message in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    /// Returns the number of new messages posted.
    #[must_use]
    pub fn new_message_count(&self) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|m| matches!(m, SentMessage::New { .. }))
            .count()
    }

    /// Returns the number of card replies to `message_id`.
    #[must_use]
    pub fn replies_to(&self, message_id: &str) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|m| matches!(m, SentMessage::ThreadReply { message_id: id, .. } if id == message_id))
            .count()
    }

    /// Returns the plain-text replies to `message_id`.
    #[must_use]
    pub fn texts_to(&self, message_id: &str) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|m| match m {
                SentMessage::Text { message_id: id, text } if id == message_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Messenger for FakeMessenger {
    async fn send_new_message(&self, channel: &str, content: &str) -> Result<String> {
        let mut state = self.state.lock();
        if self.send_limit.is_some_and(|limit| state.next_id >= limit) {
            return Err(CoreError::messaging("send rejected"));
        }
        state.next_id += 1;
        let message_id = format!("om_{}", state.next_id);
        state.sent.push(SentMessage::New {
            channel: channel.to_string(),
            message_id: message_id.clone(),
            content: content.to_string(),
        });
        Ok(message_id)
    }

    async fn reply_in_thread(&self, message_id: &str, content: &str) -> Result<()> {
        if self.fail_replies {
            return Err(CoreError::messaging("reply rejected"));
        }
        self.state.lock().sent.push(SentMessage::ThreadReply {
            message_id: message_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn reply_text(&self, message_id: &str, text: &str) -> Result<()> {
        if self.fail_replies {
            return Err(CoreError::messaging("reply rejected"));
        }
        self.state.lock().sent.push(SentMessage::Text {
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn lookup_user(&self, open_id: &str) -> Result<UserProfile> {
        if self.fail_lookup {
            return Err(CoreError::messaging("user lookup rejected"));
        }
        self.state
            .lock()
            .users
            .get(open_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                what: "user",
                id: open_id.to_string(),
            })
    }
}

/// [`CorrelationStore`] whose operations fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore {
    deletes_only: bool,
}

impl FailingStore {
    /// Creates a store where every operation fails.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deletes_only: false,
        }
    }

    /// Creates a store that always holds [`FAILING_STORE_MESSAGE`] and fails
    /// only on delete.
    #[must_use]
    pub const fn deletes_only() -> Self {
        Self { deletes_only: true }
    }
}

impl CorrelationStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        if self.deletes_only {
            Ok(Some(FAILING_STORE_MESSAGE.to_string()))
        } else {
            Err(CoreError::store("connection refused"))
        }
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        if self.deletes_only {
            Ok(())
        } else {
            Err(CoreError::store("connection refused"))
        }
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(CoreError::store("connection refused"))
    }
}

/// Recording [`AlertSource`] with a fixed set of alerts.
#[derive(Debug, Clone, Default)]
pub struct FakeAlertSource {
    alerts: Vec<SourceAlert>,
    silences: Arc<Mutex<Vec<SilenceRequest>>>,
    fail_lookup: bool,
    fail_silence: bool,
}

impl FakeAlertSource {
    /// Creates a source that knows no alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a known alert.
    #[must_use]
    pub fn with_alert(mut self, alert: SourceAlert) -> Self {
        self.alerts.push(alert);
        self
    }

    /// Makes alert lookups fail.
    #[must_use]
    pub const fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    /// Makes silence creation fail.
    #[must_use]
    pub const fn failing_silence(mut self) -> Self {
        self.fail_silence = true;
        self
    }

    /// Returns every silence submitted so far.
    #[must_use]
    pub fn silences(&self) -> Vec<SilenceRequest> {
        self.silences.lock().clone()
    }
}

impl AlertSource for FakeAlertSource {
    async fn alerts_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<SourceAlert>> {
        if self.fail_lookup {
            return Err(CoreError::alert_source("alertmanager returned 503"));
        }
        Ok(self
            .alerts
            .iter()
            .find(|alert| alert.fingerprint == fingerprint)
            .cloned()
            .into_iter()
            .collect())
    }

    async fn create_silence(&self, request: &SilenceRequest) -> Result<String> {
        if self.fail_silence {
            return Err(CoreError::alert_source("alertmanager returned 400"));
        }
        let mut silences = self.silences.lock();
        silences.push(request.clone());
        Ok(format!("sil-{}", silences.len()))
    }
}

/// [`CardRenderer`] producing a small JSON document per alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl CardRenderer for JsonRenderer {
    fn render(&self, alert: &WebhookAlert) -> Result<String> {
        let card = serde_json::json!({
            "title": alert.title,
            "color": alert.color,
            "callback_id": alert.callback_id,
        });
        Ok(serde_json::to_string(&card)?)
    }
}
