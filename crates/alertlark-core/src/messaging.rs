//! Chat-platform collaborators consumed by the workflows.

use std::future::Future;

use crate::error::Result;
use crate::types::{UserProfile, WebhookAlert};

/// Sends and threads messages on the chat platform.
///
/// Implementations own authentication and are shared by every request, so
/// they must be cheap to call concurrently.
pub trait Messenger: Send + Sync {
    /// Posts `content` (a rendered card) to `channel` and returns the new message id.
    fn send_new_message(
        &self,
        channel: &str,
        content: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Replies to `message_id` in its thread with a rendered card.
    fn reply_in_thread(
        &self,
        message_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Replies to `message_id` with plain text.
    fn reply_text(&self, message_id: &str, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Looks up a user by platform identity.
    fn lookup_user(&self, open_id: &str) -> impl Future<Output = Result<UserProfile>> + Send;
}

/// Renders an alert into the chat platform's card payload.
pub trait CardRenderer: Send + Sync {
    /// Renders `alert` as a serialized card.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Serialization` if the card cannot be encoded.
    fn render(&self, alert: &WebhookAlert) -> Result<String>;
}
