//! Callback workflow: turn a card interaction into a silence and report the
//! result in the card's thread.

use std::sync::Arc;

use tracing::{info, warn};

use crate::alertmanager::AlertSource;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::messaging::Messenger;
use crate::silence::{CreatedSilence, SilenceService};
use crate::types::CallbackEvent;

/// What processing a callback event did.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// The action does not request a silence.
    Ignored {
        /// The ignored action tag.
        tag: String,
    },
    /// The silence was created.
    Silenced {
        /// The created silence.
        silence: CreatedSilence,
        /// A failure sending the confirmation, logged and not propagated.
        reply_error: Option<CoreError>,
    },
    /// The silence could not be created.
    Failed {
        /// Why the silence failed.
        error: CoreError,
        /// A failure sending the failure notice, logged and not propagated.
        reply_error: Option<CoreError>,
    },
}

/// Builds the confirmation posted after a silence is created.
#[must_use]
pub fn success_text(silence: &CreatedSilence, email: &str) -> String {
    format!(
        "Silence created successfully. It will expire at {} by {email}.",
        silence.display_expiry()
    )
}

/// Builds the notice posted when a silence could not be created.
#[must_use]
pub fn failure_text(alert_id: &str, email: &str) -> String {
    format!("Failed to create silence for alert {alert_id} by {email}.")
}

/// Processes card interactions.
#[derive(Debug)]
pub struct CallbackWorkflow<M, A, C> {
    messenger: Arc<M>,
    silences: SilenceService<A, C>,
}

impl<M, A, C> CallbackWorkflow<M, A, C>
where
    M: Messenger,
    A: AlertSource,
    C: Clock,
{
    /// Creates a new workflow.
    pub const fn new(messenger: Arc<M>, source: Arc<A>, clock: C) -> Self {
        Self {
            messenger,
            silences: SilenceService::new(source, clock),
        }
    }

    /// Returns the silence service.
    #[must_use]
    pub const fn silences(&self) -> &SilenceService<A, C> {
        &self.silences
    }

    /// Processes one card interaction.
    ///
    /// Silence failures are reported to the user in the card's thread and
    /// returned as [`CallbackOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the acting user cannot be resolved to an email
    /// address. Nothing is posted in that case.
    pub async fn process_event(&self, event: &CallbackEvent) -> Result<CallbackOutcome> {
        let Some(token) = event.action.duration_token() else {
            info!(action = %event.action, alert_id = %event.alert_id, "ignoring card action");
            return Ok(CallbackOutcome::Ignored {
                tag: event.action.tag().to_string(),
            });
        };

        let profile = self.messenger.lookup_user(&event.open_id).await?;
        let email = profile.email.filter(|e| !e.is_empty()).ok_or_else(|| CoreError::NotFound {
            what: "user email",
            id: event.open_id.clone(),
        })?;

        info!(
            alert_id = %event.alert_id,
            action = %event.action,
            duration = token,
            user = %email,
            "creating silence from card action"
        );

        match self
            .silences
            .handle_create_silence(&event.alert_id, &email, token)
            .await
        {
            Ok(silence) => {
                let reply_error = self
                    .reply(&event.message_id, &success_text(&silence, &email))
                    .await;
                Ok(CallbackOutcome::Silenced {
                    silence,
                    reply_error,
                })
            }
            Err(error) => {
                warn!(alert_id = %event.alert_id, error = %error, "failed to create silence");
                let reply_error = self
                    .reply(&event.message_id, &failure_text(&event.alert_id, &email))
                    .await;
                Ok(CallbackOutcome::Failed { error, reply_error })
            }
        }
    }

    async fn reply(&self, message_id: &str, text: &str) -> Option<CoreError> {
        match self.messenger.reply_text(message_id, text).await {
            Ok(()) => None,
            Err(err) => {
                warn!(message_id, error = %err, "failed to reply to card message");
                Some(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::{FakeAlertSource, FakeMessenger};
    use crate::types::{CallbackAction, SourceAlert};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const EMAIL: &str = "oncall@example.com";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn workflow(
        messenger: &FakeMessenger,
        source: &FakeAlertSource,
    ) -> CallbackWorkflow<FakeMessenger, FakeAlertSource, FixedClock> {
        CallbackWorkflow::new(
            Arc::new(messenger.clone()),
            Arc::new(source.clone()),
            FixedClock(start()),
        )
    }

    fn event(action: CallbackAction, alert_id: &str) -> CallbackEvent {
        CallbackEvent::new(action, alert_id, "ou_1", "om_card", "oc_1")
    }

    fn select(option: &str) -> CallbackAction {
        CallbackAction::SelectStatic {
            option: option.into(),
        }
    }

    fn known_source() -> FakeAlertSource {
        FakeAlertSource::new().with_alert(SourceAlert::new("X").with_label("alertname", "HighCPU"))
    }

    mod silence_tests {
        use super::*;

        #[tokio::test]
        async fn select_one_hour_creates_silence_and_confirms() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = known_source();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "X,"))
                .await
                .unwrap();

            let CallbackOutcome::Silenced { silence, reply_error } = outcome else {
                panic!("expected silence, got {outcome:?}");
            };
            assert!(reply_error.is_none());
            assert_eq!(silence.ends_at, start() + Duration::hours(1));

            let requests = source.silences();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].ends_at - requests[0].starts_at, Duration::hours(1));
            assert_eq!(requests[0].created_by, EMAIL);

            assert_eq!(
                messenger.texts_to("om_card"),
                vec![format!(
                    "Silence created successfully. It will expire at 2024-05-01 18:00:00 WIB by {EMAIL}."
                )]
            );
        }

        #[tokio::test]
        async fn button_uses_default_duration() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = known_source();

            workflow(&messenger, &source)
                .process_event(&event(CallbackAction::Button, "X,"))
                .await
                .unwrap();

            let requests = source.silences();
            assert_eq!(requests[0].ends_at - requests[0].starts_at, Duration::hours(6));
        }

        #[tokio::test]
        async fn silence_failure_posts_failure_reply() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = known_source().failing_silence();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "X,"))
                .await
                .unwrap();

            assert!(matches!(outcome, CallbackOutcome::Failed { .. }));
            assert_eq!(
                messenger.texts_to("om_card"),
                vec![format!("Failed to create silence for alert X by {EMAIL}.")]
            );
        }

        #[tokio::test]
        async fn unknown_alert_posts_failure_reply() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = FakeAlertSource::new();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "gone,"))
                .await
                .unwrap();

            let CallbackOutcome::Failed { error, .. } = outcome else {
                panic!("expected failure, got {outcome:?}");
            };
            assert!(error.is_not_found());
            assert_eq!(messenger.texts_to("om_card").len(), 1);
        }

        #[tokio::test]
        async fn invalid_duration_posts_failure_reply() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = known_source();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(select("2h"), "X,"))
                .await
                .unwrap();

            assert!(matches!(
                outcome,
                CallbackOutcome::Failed {
                    error: CoreError::InvalidDuration { .. },
                    ..
                }
            ));
            assert!(source.silences().is_empty());
        }

        #[tokio::test]
        async fn reply_failure_is_reported_not_fatal() {
            let messenger = FakeMessenger::new()
                .with_user("ou_1", Some(EMAIL))
                .failing_replies();
            let source = known_source();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "X,"))
                .await
                .unwrap();

            assert!(matches!(
                outcome,
                CallbackOutcome::Silenced {
                    reply_error: Some(_),
                    ..
                }
            ));
            assert_eq!(source.silences().len(), 1);
        }
    }

    mod user_tests {
        use super::*;

        #[tokio::test]
        async fn lookup_failure_aborts_without_reply() {
            let messenger = FakeMessenger::new().failing_lookup();
            let source = known_source();

            let result = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "X,"))
                .await;

            assert!(result.is_err());
            assert!(messenger.sent().is_empty());
            assert!(source.silences().is_empty());
        }

        #[tokio::test]
        async fn user_without_email_aborts() {
            let messenger = FakeMessenger::new().with_user("ou_1", None);
            let source = known_source();

            let err = workflow(&messenger, &source)
                .process_event(&event(select("1h"), "X,"))
                .await
                .unwrap_err();

            assert!(err.is_not_found());
            assert!(messenger.sent().is_empty());
        }
    }

    mod ignore_tests {
        use super::*;

        #[tokio::test]
        async fn other_actions_have_no_side_effects() {
            let messenger = FakeMessenger::new().with_user("ou_1", Some(EMAIL));
            let source = known_source();

            let outcome = workflow(&messenger, &source)
                .process_event(&event(CallbackAction::Other("input".into()), "X,"))
                .await
                .unwrap();

            assert!(matches!(outcome, CallbackOutcome::Ignored { tag } if tag == "input"));
            assert!(messenger.sent().is_empty());
            assert!(source.silences().is_empty());
        }
    }

    #[test]
    fn reply_texts() {
        assert_eq!(
            failure_text("X", "a@b.c"),
            "Failed to create silence for alert X by a@b.c."
        );
    }
}
