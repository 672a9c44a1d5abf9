//! Notification workflow: post, thread and resolve alert cards.
//!
//! A firing alert creates a new message and records `callback_id -> message id`
//! in the correlation store. A resolved alert replies into that message's
//! thread and removes the entry; without an entry it is posted as a new
//! standalone message.
//!
//! Only messaging and rendering failures are fatal. Store failures happen
//! after (or instead of) a user-visible side effect that already succeeded,
//! so they are logged and reported in [`AlertOutcome::bookkeeping`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::messaging::{CardRenderer, Messenger};
use crate::store::CorrelationStore;
use crate::types::{WebhookAlert, WebhookPayload};

/// How a single alert was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A firing alert was posted as a new message.
    Created,
    /// A resolved alert was replied into the open message's thread.
    Resolved,
    /// A resolved alert had no open message and was posted as a new message.
    ResolvedAsNew,
}

/// Result of delivering one alert.
#[derive(Debug)]
pub struct AlertOutcome {
    /// The alert's callback id.
    pub callback_id: String,
    /// The message created, or the message replied to.
    pub message_id: String,
    /// How the alert was delivered.
    pub delivery: Delivery,
    /// A store failure that was logged and not propagated.
    pub bookkeeping: Option<CoreError>,
}

impl AlertOutcome {
    fn new(alert: &WebhookAlert, message_id: String, delivery: Delivery) -> Self {
        Self {
            callback_id: alert.callback_id.clone(),
            message_id,
            delivery,
            bookkeeping: None,
        }
    }

    fn with_bookkeeping(mut self, err: Option<CoreError>) -> Self {
        self.bookkeeping = err;
        self
    }
}

/// Posts alerts to chat and keeps the correlation store in step.
#[derive(Debug)]
pub struct NotificationWorkflow<M, S, R> {
    messenger: Arc<M>,
    store: Arc<S>,
    renderer: R,
}

impl<M, S, R> NotificationWorkflow<M, S, R>
where
    M: Messenger,
    S: CorrelationStore,
    R: CardRenderer,
{
    /// Creates a new workflow.
    pub const fn new(messenger: Arc<M>, store: Arc<S>, renderer: R) -> Self {
        Self {
            messenger,
            store,
            renderer,
        }
    }

    /// Returns the correlation store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Delivers every alert of a webhook to its channel, in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first rendering or messaging failure; alerts
    /// after it are not delivered.
    pub async fn notify_alerts(&self, webhook: &WebhookPayload) -> Result<Vec<AlertOutcome>> {
        let mut outcomes = Vec::with_capacity(webhook.alerts.len());
        for alert in &webhook.alerts {
            outcomes.push(self.notify_alert(alert, &webhook.channel).await?);
        }
        Ok(outcomes)
    }

    /// Delivers a single alert to `channel`.
    ///
    /// # Errors
    ///
    /// Returns rendering and messaging failures.
    pub async fn notify_alert(&self, alert: &WebhookAlert, channel: &str) -> Result<AlertOutcome> {
        let content = self.renderer.render(alert)?;

        if alert.is_resolved() {
            self.resolve(alert, channel, &content).await
        } else {
            self.create(alert, channel, &content).await
        }
    }

    async fn create(&self, alert: &WebhookAlert, channel: &str, content: &str) -> Result<AlertOutcome> {
        let message_id = self.messenger.send_new_message(channel, content).await?;
        info!(
            alert_id = %alert.callback_id,
            chat_id = %channel,
            message_id = %message_id,
            "created alert message"
        );

        let outcome = AlertOutcome::new(alert, message_id, Delivery::Created);
        let Some(key) = alert.correlation_key() else {
            debug!(chat_id = %channel, "alert has no callback id, not correlating");
            return Ok(outcome);
        };

        let bookkeeping = match self.store.set(key, &outcome.message_id).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    alert_id = %key,
                    message_id = %outcome.message_id,
                    error = %err,
                    "failed to save message id to store"
                );
                Some(err)
            }
        };
        Ok(outcome.with_bookkeeping(bookkeeping))
    }

    async fn resolve(&self, alert: &WebhookAlert, channel: &str, content: &str) -> Result<AlertOutcome> {
        let (open_message, lookup_error) = match alert.correlation_key() {
            Some(key) => match self.store.get(key).await {
                Ok(found) => (found, None),
                Err(err) => {
                    warn!(alert_id = %key, error = %err, "failed to read message id from store");
                    (None, Some(err))
                }
            },
            None => (None, None),
        };

        let Some(message_id) = open_message else {
            info!(
                alert_id = %alert.callback_id,
                chat_id = %channel,
                "no open message for resolved alert, falling back to new message"
            );
            let message_id = self.messenger.send_new_message(channel, content).await?;
            return Ok(AlertOutcome::new(alert, message_id, Delivery::ResolvedAsNew)
                .with_bookkeeping(lookup_error));
        };

        self.messenger.reply_in_thread(&message_id, content).await?;
        info!(
            alert_id = %alert.callback_id,
            chat_id = %channel,
            message_id = %message_id,
            "replied resolved alert in thread"
        );

        let bookkeeping = match self.store.delete(&alert.callback_id).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    alert_id = %alert.callback_id,
                    error = %err,
                    "failed to delete message id from store"
                );
                Some(err)
            }
        };
        Ok(AlertOutcome::new(alert, message_id, Delivery::Resolved).with_bookkeeping(bookkeeping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FailingStore, FakeMessenger, JsonRenderer, SentMessage};

    type Workflow<S> = NotificationWorkflow<FakeMessenger, S, JsonRenderer>;

    fn workflow_with<S: CorrelationStore>(messenger: &FakeMessenger, store: S) -> Workflow<S> {
        NotificationWorkflow::new(Arc::new(messenger.clone()), Arc::new(store), JsonRenderer)
    }

    fn alert(color: &str, callback_id: &str) -> WebhookAlert {
        WebhookAlert {
            color: color.into(),
            callback_id: callback_id.into(),
            title: "T".into(),
            text: "t".into(),
            ..WebhookAlert::default()
        }
    }

    fn webhook(alerts: Vec<WebhookAlert>) -> WebhookPayload {
        WebhookPayload {
            alerts,
            channel: "C".into(),
            username: String::new(),
        }
    }

    mod firing_tests {
        use super::*;

        #[tokio::test]
        async fn firing_alert_creates_message_and_entry() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("red", "X")]))
                .await
                .unwrap();

            assert_eq!(outcomes.len(), 1);
            assert_eq!(outcomes[0].delivery, Delivery::Created);
            assert!(outcomes[0].bookkeeping.is_none());

            let sent = messenger.sent();
            assert_eq!(sent.len(), 1);
            let SentMessage::New { channel, message_id, .. } = &sent[0] else {
                panic!("expected new message, got {:?}", sent[0]);
            };
            assert_eq!(channel, "C");
            assert_eq!(store.peek("X").as_ref(), Some(message_id));
        }

        #[tokio::test]
        async fn any_non_green_color_is_firing() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            workflow
                .notify_alerts(&webhook(vec![alert("warning", "A"), alert("", "B")]))
                .await
                .unwrap();

            assert_eq!(messenger.new_message_count(), 2);
            assert!(store.peek("A").is_some());
            assert!(store.peek("B").is_some());
        }

        #[tokio::test]
        async fn empty_callback_id_is_not_correlated() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            workflow
                .notify_alerts(&webhook(vec![alert("red", "")]))
                .await
                .unwrap();

            assert_eq!(messenger.new_message_count(), 1);
            assert!(store.is_empty());
        }

        #[tokio::test]
        async fn store_write_failure_is_not_fatal() {
            let messenger = FakeMessenger::new();
            let workflow = workflow_with(&messenger, FailingStore::new());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("red", "X"), alert("red", "Y")]))
                .await
                .unwrap();

            assert_eq!(outcomes.len(), 2);
            assert!(outcomes.iter().all(|o| o.bookkeeping.is_some()));
            assert_eq!(messenger.new_message_count(), 2);
        }
    }

    mod resolved_tests {
        use super::*;

        #[tokio::test]
        async fn resolved_alert_replies_in_thread_and_clears_entry() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            store.set("X", "om_open").await.unwrap();
            let workflow = workflow_with(&messenger, store.clone());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await
                .unwrap();

            assert_eq!(outcomes[0].delivery, Delivery::Resolved);
            assert_eq!(outcomes[0].message_id, "om_open");
            assert_eq!(messenger.replies_to("om_open"), 1);
            assert_eq!(messenger.new_message_count(), 0);
            assert!(store.peek("X").is_none());
        }

        #[tokio::test]
        async fn resolved_without_entry_falls_back_to_new_message() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await
                .unwrap();

            assert_eq!(outcomes[0].delivery, Delivery::ResolvedAsNew);
            assert_eq!(messenger.new_message_count(), 1);
            assert!(store.is_empty());
        }

        #[tokio::test]
        async fn store_read_failure_falls_back_to_new_message() {
            let messenger = FakeMessenger::new();
            let workflow = workflow_with(&messenger, FailingStore::new());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await
                .unwrap();

            assert_eq!(outcomes[0].delivery, Delivery::ResolvedAsNew);
            assert!(outcomes[0].bookkeeping.is_some());
            assert_eq!(messenger.new_message_count(), 1);
        }

        #[tokio::test]
        async fn delete_failure_is_not_fatal() {
            let messenger = FakeMessenger::new();
            let store = FailingStore::deletes_only();
            let workflow = workflow_with(&messenger, store);

            let outcomes = workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await
                .unwrap();

            assert_eq!(outcomes[0].delivery, Delivery::Resolved);
            assert!(outcomes[0].bookkeeping.is_some());
            assert_eq!(messenger.replies_to(crate::testing::FAILING_STORE_MESSAGE), 1);
        }

        #[tokio::test]
        async fn reply_failure_is_fatal_and_keeps_entry() {
            let messenger = FakeMessenger::new().failing_replies();
            let store = MemoryStore::new();
            store.set("X", "om_open").await.unwrap();
            let workflow = workflow_with(&messenger, store.clone());

            let result = workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await;

            assert!(result.is_err());
            assert_eq!(store.peek("X"), Some("om_open".to_string()));
        }
    }

    mod batch_tests {
        use super::*;

        #[tokio::test]
        async fn fire_then_resolve_round_trip() {
            let messenger = FakeMessenger::new();
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            workflow
                .notify_alerts(&webhook(vec![alert("red", "X")]))
                .await
                .unwrap();
            let message_id = store.peek("X").unwrap();

            workflow
                .notify_alerts(&webhook(vec![alert("green", "X")]))
                .await
                .unwrap();

            assert_eq!(messenger.new_message_count(), 1);
            assert_eq!(messenger.replies_to(&message_id), 1);
            assert!(store.peek("X").is_none());
        }

        #[tokio::test]
        async fn send_failure_halts_batch() {
            let messenger = FakeMessenger::new().failing_after(1);
            let store = MemoryStore::new();
            let workflow = workflow_with(&messenger, store.clone());

            let result = workflow
                .notify_alerts(&webhook(vec![
                    alert("red", "A"),
                    alert("red", "B"),
                    alert("red", "C"),
                ]))
                .await;

            assert!(matches!(result, Err(CoreError::Collaborator { .. })));
            assert_eq!(messenger.new_message_count(), 1);
            assert!(store.peek("A").is_some());
            assert!(store.peek("B").is_none());
            assert!(store.peek("C").is_none());
        }

        #[tokio::test]
        async fn alerts_are_delivered_in_order() {
            let messenger = FakeMessenger::new();
            let workflow = workflow_with(&messenger, MemoryStore::new());

            let outcomes = workflow
                .notify_alerts(&webhook(vec![
                    alert("red", "first"),
                    alert("red", "second"),
                    alert("red", "third"),
                ]))
                .await
                .unwrap();

            let ids: Vec<_> = outcomes.iter().map(|o| o.callback_id.as_str()).collect();
            assert_eq!(ids, ["first", "second", "third"]);
        }

        #[tokio::test]
        async fn empty_batch_is_ok() {
            let messenger = FakeMessenger::new();
            let workflow = workflow_with(&messenger, MemoryStore::new());

            let outcomes = workflow.notify_alerts(&webhook(vec![])).await.unwrap();

            assert!(outcomes.is_empty());
            assert!(messenger.sent().is_empty());
        }
    }
}
