//! Core types shared by the notification and silence workflows.
//!
//! - [`WebhookPayload`] / [`WebhookAlert`]: the Slack-attachment style webhook
//!   the alert source posts to `/notify`
//! - [`SourceAlert`]: an alert as currently known by the alert source
//! - [`Matcher`] / [`SilenceRequest`]: a suppression rule to submit
//! - [`CallbackEvent`]: a user interaction on a rendered alert card

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The color the alert source uses for resolved alerts.
pub const RESOLVED_COLOR: &str = "green";

/// Comment attached to every silence created from a card action.
pub const SILENCE_COMMENT: &str = "create silence";

/// A webhook delivery from the alert source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Alerts carried by this delivery, in delivery order.
    #[serde(rename = "attachments", default)]
    pub alerts: Vec<WebhookAlert>,
    /// Chat identifier the alerts are posted to.
    #[serde(default)]
    pub channel: String,
    /// Sender name configured on the alert source.
    #[serde(default)]
    pub username: String,
}

/// One firing or resolved alert inside a webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookAlert {
    /// Status color; [`RESOLVED_COLOR`] marks a resolution.
    pub color: String,
    /// Stable alert identity (the Alertmanager fingerprint).
    pub callback_id: String,
    /// Footer text.
    pub footer: String,
    /// Fields the sender marks as markdown.
    pub mrkdwn_in: Vec<String>,
    /// Link attached to the title.
    pub title_link: String,
    /// Body text.
    pub text: String,
    /// Title text.
    pub title: String,
    /// Plain-text fallback.
    pub fallback: String,
    /// Link actions offered with the alert.
    pub actions: Vec<WebhookAction>,
}

impl WebhookAlert {
    /// Returns true if this delivery reports the alert as resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.color == RESOLVED_COLOR
    }

    /// Returns the key used to correlate this alert with a chat message.
    ///
    /// Alerts without a callback id never participate in correlation.
    #[must_use]
    pub fn correlation_key(&self) -> Option<&str> {
        if self.callback_id.is_empty() {
            None
        } else {
            Some(&self.callback_id)
        }
    }
}

/// A link action attached to a webhook alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAction {
    /// Button label.
    #[serde(default)]
    pub text: String,
    /// Action type as sent by the alert source.
    #[serde(rename = "type", default)]
    pub action_type: String,
    /// Target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WebhookAction {
    /// Returns the target URL if the action links somewhere.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// An alert as reported by the alert source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAlert {
    /// Alert fingerprint.
    #[serde(default)]
    pub fingerprint: String,
    /// Alert labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl SourceAlert {
    /// Creates an alert with the given fingerprint and no labels.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A label condition inside a silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    /// Label name.
    pub name: String,
    /// Label value.
    pub value: String,
    /// Whether `value` is a regular expression.
    pub is_regex: bool,
    /// Whether the matcher selects equal (true) or unequal (false) values.
    pub is_equal: bool,
}

impl Matcher {
    /// Creates an exact, non-regex equality matcher.
    #[must_use]
    pub fn exact(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: false,
            is_equal: true,
        }
    }

    /// Builds one exact matcher per label across all given alerts.
    #[must_use]
    pub fn for_alerts(alerts: &[SourceAlert]) -> Vec<Self> {
        alerts
            .iter()
            .flat_map(|alert| alert.labels.iter())
            .map(|(name, value)| Self::exact(name, value))
            .collect()
    }
}

/// A suppression rule to submit to the alert source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceRequest {
    /// Label matchers (all must match).
    pub matchers: Vec<Matcher>,
    /// When the silence starts.
    pub starts_at: DateTime<Utc>,
    /// When the silence ends.
    pub ends_at: DateTime<Utc>,
    /// Who requested the silence.
    pub created_by: String,
    /// Free-form comment.
    pub comment: String,
}

impl SilenceRequest {
    /// Creates a new silence request.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDuration` if `ends_at` is not after `starts_at`.
    pub fn new(
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Self> {
        if ends_at <= starts_at {
            return Err(CoreError::InvalidDuration {
                token: format!("{starts_at}..{ends_at}"),
            });
        }

        Ok(Self {
            matchers,
            starts_at,
            ends_at,
            created_by: created_by.into(),
            comment: comment.into(),
        })
    }
}

/// Profile of a chat-platform user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform identity the profile was looked up by.
    pub open_id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address, if the app is allowed to read it.
    #[serde(default)]
    pub email: Option<String>,
}

/// The action a user took on an alert card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// A duration was picked from the dropdown.
    SelectStatic {
        /// The selected option value.
        option: String,
    },
    /// The default "Silence" button was pressed.
    Button,
    /// Any other interaction; ignored.
    Other(String),
}

impl CallbackAction {
    /// Builds an action from the platform's action tag.
    #[must_use]
    pub fn from_tag(tag: &str, option: Option<String>) -> Self {
        match tag {
            "select_static" => Self::SelectStatic {
                option: option.unwrap_or_default(),
            },
            "button" => Self::Button,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the duration token this action requests, if it requests a silence.
    #[must_use]
    pub fn duration_token(&self) -> Option<&str> {
        match self {
            Self::SelectStatic { option } => Some(option),
            Self::Button => Some("default"),
            Self::Other(_) => None,
        }
    }

    /// Returns the platform tag for this action.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::SelectStatic { .. } => "select_static",
            Self::Button => "button",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A user interaction on an alert card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEvent {
    /// What the user did.
    pub action: CallbackAction,
    /// The alert the card represents.
    pub alert_id: String,
    /// Platform identity of the acting user.
    pub open_id: String,
    /// Message the interaction happened on; replies go into its thread.
    pub message_id: String,
    /// Chat containing the message.
    pub chat_id: String,
}

impl CallbackEvent {
    /// Creates a new callback event.
    ///
    /// The card embeds the alert id with a trailing comma; it is stripped here.
    #[must_use]
    pub fn new(
        action: CallbackAction,
        alert_id: &str,
        open_id: impl Into<String>,
        message_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            alert_id: alert_id.strip_suffix(',').unwrap_or(alert_id).to_string(),
            open_id: open_id.into(),
            message_id: message_id.into(),
            chat_id: chat_id.into(),
        }
    }
}
