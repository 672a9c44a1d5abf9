//! Interactive card rendering for alert messages.
//!
//! Layout: a header carrying the alert title colored by the alert color,
//! the markdown body, a divider, then one action row with link buttons,
//! the silence duration dropdown and the "Silence" button.

use alertlark_core::{CardRenderer, DurationToken, WebhookAlert};
use serde::Serialize;

/// Placeholder of the duration dropdown.
pub const DURATION_PLACEHOLDER: &str = "Select duration";

/// Label of the default-duration silence button.
pub const SILENCE_BUTTON_LABEL: &str = "Silence";

/// A Lark interactive card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Card header.
    pub header: CardHeader,
    /// Body elements, top to bottom.
    pub elements: Vec<CardElement>,
}

/// Card header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    /// Title text.
    pub title: CardText,
    /// Header color template.
    pub template: String,
}

/// A text node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardText {
    /// Text content.
    pub content: String,
    /// `plain_text` or `lark_md`.
    pub tag: &'static str,
}

impl CardText {
    fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tag: "plain_text",
        }
    }

    fn markdown(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tag: "lark_md",
        }
    }
}

/// A body element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CardElement {
    /// A text block.
    Div {
        /// Block text.
        text: CardText,
    },
    /// A horizontal rule.
    Hr,
    /// A row of interactive components.
    Action {
        /// Components in the row.
        actions: Vec<CardAction>,
    },
}

/// Payload returned to the callback when a component is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionValue {
    /// The alert's callback id.
    pub alert_id: String,
}

/// Target of a link button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiUrl {
    /// Default URL.
    pub url: String,
}

/// A dropdown option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    /// Option label.
    pub text: CardText,
    /// Option value, sent back as the callback's `option`.
    pub value: String,
}

/// An interactive component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CardAction {
    /// A button, either a link or a callback trigger.
    Button {
        /// Button style.
        #[serde(rename = "type")]
        button_type: &'static str,
        /// Button label.
        text: CardText,
        /// Link target.
        #[serde(skip_serializing_if = "Option::is_none")]
        multi_url: Option<MultiUrl>,
        /// Callback payload.
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<ActionValue>,
    },
    /// A static dropdown.
    SelectStatic {
        /// Text shown before a choice is made.
        placeholder: CardText,
        /// Choices.
        options: Vec<SelectOption>,
        /// Callback payload.
        value: ActionValue,
    },
}

impl Card {
    /// Builds the card for an alert.
    #[must_use]
    pub fn for_alert(alert: &WebhookAlert) -> Self {
        Self {
            header: CardHeader {
                title: CardText::plain(&alert.title),
                template: alert.color.clone(),
            },
            elements: vec![
                CardElement::Div {
                    text: CardText::markdown(&alert.text),
                },
                CardElement::Hr,
                CardElement::Action {
                    actions: actions_for(alert),
                },
            ],
        }
    }
}

fn actions_for(alert: &WebhookAlert) -> Vec<CardAction> {
    let mut actions: Vec<CardAction> = alert
        .actions
        .iter()
        .filter_map(|action| {
            action.link().map(|url| CardAction::Button {
                button_type: "default",
                text: CardText::plain(&action.text),
                multi_url: Some(MultiUrl {
                    url: url.to_string(),
                }),
                value: None,
            })
        })
        .collect();

    actions.push(CardAction::SelectStatic {
        placeholder: CardText::plain(DURATION_PLACEHOLDER),
        options: DurationToken::SELECTABLE
            .iter()
            .map(|token| SelectOption {
                text: CardText::plain(token.label()),
                value: token.as_str().to_string(),
            })
            .collect(),
        value: ActionValue {
            alert_id: alert.callback_id.clone(),
        },
    });

    if !alert.callback_id.is_empty() {
        actions.push(CardAction::Button {
            button_type: "danger",
            text: CardText::plain(SILENCE_BUTTON_LABEL),
            multi_url: None,
            value: Some(ActionValue {
                alert_id: alert.callback_id.clone(),
            }),
        });
    }

    actions
}

/// Renders alerts as serialized Lark interactive cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct LarkCardRenderer;

impl CardRenderer for LarkCardRenderer {
    fn render(&self, alert: &WebhookAlert) -> alertlark_core::Result<String> {
        Ok(serde_json::to_string(&Card::for_alert(alert))?)
    }
}
