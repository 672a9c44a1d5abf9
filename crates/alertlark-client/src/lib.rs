//! Lark Open Platform integration for alertlark.
//!
//! This crate implements the chat side of the bridge: an authenticated HTTP
//! client, the interactive alert card and the wire types of the card
//! callback endpoint.
//!
//! # Features
//!
//! - Tenant access token caching with refresh ahead of expiry
//! - [`Messenger`](alertlark_core::Messenger) implementation over the IM and contact APIs
//! - [`CardRenderer`](alertlark_core::CardRenderer) producing the alert card
//! - Parsing of URL verification challenges and card action events
//!
//! # Example
//!
//! ```rust,no_run
//! use alertlark_client::{LarkClient, LarkConfig};
//!
//! # async fn example() -> alertlark_client::Result<()> {
//! let client = LarkClient::new(LarkConfig::new("cli_xxx", "secret"))?;
//! let message_id = client.create_message("oc_chat", "{}").await?;
//! client.reply_message(&message_id, "interactive", "{}", true).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod callback;
pub mod card;
pub mod client;
pub mod error;

pub use callback::{
    CallbackBody, CallbackResponse, CardActionPayload, ChallengeResponse, Toast, ToastKind,
    UrlVerificationRequest,
};
pub use card::{Card, LarkCardRenderer};
pub use client::{DEFAULT_BASE_URL, LarkClient, LarkConfig};
pub use error::{LarkError, Result};
