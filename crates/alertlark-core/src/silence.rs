//! Silence creation from an alert fingerprint and a duration token.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::alertmanager::AlertSource;
use crate::clock::Clock;
use crate::duration::DurationToken;
use crate::error::{CoreError, Result};
use crate::types::{Matcher, SILENCE_COMMENT, SilenceRequest};

/// A silence accepted by the alert source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSilence {
    /// Id assigned by the alert source.
    pub silence_id: String,
    /// The resolved duration.
    pub duration: DurationToken,
    /// When the silence starts.
    pub starts_at: DateTime<Utc>,
    /// When the silence ends.
    pub ends_at: DateTime<Utc>,
}

impl CreatedSilence {
    /// Formats the expiry shown to users.
    #[must_use]
    pub fn display_expiry(&self) -> String {
        self.duration.display_expiry(self.starts_at)
    }
}

/// Creates silences that match every label of a known alert.
#[derive(Debug)]
pub struct SilenceService<A, C> {
    source: Arc<A>,
    clock: C,
}

impl<A: AlertSource, C: Clock> SilenceService<A, C> {
    /// Creates a new service.
    pub const fn new(source: Arc<A>, clock: C) -> Self {
        Self { source, clock }
    }

    /// Silences the alert with fingerprint `alert_id` on behalf of
    /// `requester` for the duration named by `token`.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if the alert source does not know `alert_id`
    /// - `CoreError::InvalidDuration` if `token` is not a supported duration
    /// - `CoreError::Collaborator` if the alert source fails
    pub async fn handle_create_silence(
        &self,
        alert_id: &str,
        requester: &str,
        token: &str,
    ) -> Result<CreatedSilence> {
        let alerts = self.source.alerts_by_fingerprint(alert_id).await?;
        if alerts.is_empty() {
            return Err(CoreError::NotFound {
                what: "alert",
                id: alert_id.to_string(),
            });
        }

        let matchers = Matcher::for_alerts(&alerts);
        let duration = DurationToken::parse(token)?;
        let starts_at = self.clock.now();
        let ends_at = duration.deadline(starts_at, Duration::zero());
        debug!(
            alert_id,
            matchers = matchers.len(),
            duration = duration.label(),
            "built silence request"
        );

        let request = SilenceRequest::new(matchers, starts_at, ends_at, requester, SILENCE_COMMENT)?;
        let silence_id = self.source.create_silence(&request).await?;

        info!(
            alert_id,
            silence_id = %silence_id,
            created_by = requester,
            ends_at = %ends_at,
            "created silence"
        );
        Ok(CreatedSilence {
            silence_id,
            duration,
            starts_at,
            ends_at,
        })
    }
}
