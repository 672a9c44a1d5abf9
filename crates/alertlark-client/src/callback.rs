//! Wire types of the card callback endpoint.
//!
//! Lark posts two kinds of bodies to the callback URL: a one-off
//! `url_verification` challenge when the URL is registered, and card action
//! events afterwards. The endpoint answers actions with a toast.

use alertlark_core::{CallbackAction, CallbackEvent};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The `type` of a URL verification challenge.
pub const URL_VERIFICATION: &str = "url_verification";

/// Toast shown while an action is processed in the background.
pub const PROCESSING_MESSAGE: &str = "Request received, processing...";

/// Toast shown when the callback body cannot be read.
pub const UNREADABLE_BODY_MESSAGE: &str = "Failed to read request body";

/// URL verification challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlVerificationRequest {
    /// Value to echo back.
    #[serde(default)]
    pub challenge: String,
    /// Always [`URL_VERIFICATION`] for challenges.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Verification token configured on the app.
    #[serde(default)]
    pub token: String,
}

impl UrlVerificationRequest {
    /// Returns true if this body is a challenge.
    #[must_use]
    pub fn is_challenge(&self) -> bool {
        self.kind == URL_VERIFICATION
    }
}

/// Answer to a URL verification challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// The echoed challenge.
    pub challenge: String,
}

/// Event header of a card action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventHeader {
    /// Event id.
    pub event_id: String,
    /// Verification token configured on the app.
    pub token: String,
}

/// Where the action happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionContext {
    /// Message carrying the card.
    pub open_message_id: String,
    /// Chat containing the message.
    pub open_chat_id: String,
}

/// Value embedded in the component that was used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionPayloadValue {
    /// The alert's callback id.
    pub alert_id: String,
}

/// The component interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionDetail {
    /// Component tag, e.g. `select_static` or `button`.
    pub tag: String,
    /// Embedded value.
    pub value: ActionPayloadValue,
    /// Selected dropdown option.
    pub option: Option<String>,
}

/// The acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Operator {
    /// App-scoped user id.
    pub open_id: String,
}

/// Event body of a card action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionEvent {
    /// Where the action happened.
    pub context: ActionContext,
    /// What was done.
    pub action: ActionDetail,
    /// Who did it.
    pub operator: Operator,
}

/// A card action callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardActionPayload {
    /// Event header.
    pub header: EventHeader,
    /// Event body.
    pub event: ActionEvent,
}

impl CardActionPayload {
    /// Verification token carried in the event header.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.header.token
    }

    /// Event id from the header.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.header.event_id
    }

    /// Converts the payload into the workflow's event.
    #[must_use]
    pub fn into_event(self) -> CallbackEvent {
        let ActionEvent {
            context,
            action,
            operator,
        } = self.event;
        CallbackEvent::new(
            CallbackAction::from_tag(&action.tag, action.option),
            &action.value.alert_id,
            operator.open_id,
            context.open_message_id,
            context.open_chat_id,
        )
    }
}

/// A parsed callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackBody {
    /// A URL verification challenge.
    UrlVerification(UrlVerificationRequest),
    /// A card action.
    CardAction(CardActionPayload),
}

impl CallbackBody {
    /// Parses a callback body.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the body is not a JSON object of
    /// either kind.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let envelope: UrlVerificationRequest = serde_json::from_slice(body)?;
        if envelope.is_challenge() {
            return Ok(Self::UrlVerification(envelope));
        }
        Ok(Self::CardAction(serde_json::from_slice(body)?))
    }
}

/// Toast style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    /// Informational.
    Info,
    /// Success.
    Success,
    /// Error.
    Error,
    /// Warning.
    Warning,
}

/// A toast shown to the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Toast style.
    #[serde(rename = "type")]
    pub kind: ToastKind,
    /// Toast text.
    pub content: String,
}

/// Immediate answer to a card action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// Toast to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<Toast>,
}

impl CallbackResponse {
    /// Creates a response showing a toast.
    #[must_use]
    pub fn toast(kind: ToastKind, content: impl Into<String>) -> Self {
        Self {
            toast: Some(Toast {
                kind,
                content: content.into(),
            }),
        }
    }

    /// The acknowledgment sent before an action is processed.
    #[must_use]
    pub fn processing() -> Self {
        Self::toast(ToastKind::Info, PROCESSING_MESSAGE)
    }

    /// The answer to a body that cannot be read.
    #[must_use]
    pub fn unreadable_body() -> Self {
        Self::toast(ToastKind::Error, UNREADABLE_BODY_MESSAGE)
    }
}
