//! Shared state for the alertlark server.

use std::sync::Arc;

use alertlark_client::LarkCardRenderer;
use alertlark_core::{
    AlertSource, CallbackWorkflow, CorrelationStore, Messenger, NotificationWorkflow, SystemClock,
};

/// Workflows and settings shared by every request.
///
/// The messenger is shared by both workflows; it is built once at startup.
#[derive(Debug)]
pub struct AppState<M, S, A> {
    notify: NotificationWorkflow<M, S, LarkCardRenderer>,
    callback: Arc<CallbackWorkflow<M, A, SystemClock>>,
    verification_token: String,
}

impl<M, S, A> AppState<M, S, A>
where
    M: Messenger,
    S: CorrelationStore,
    A: AlertSource,
{
    /// Create a new state from its collaborators.
    pub fn new(
        messenger: Arc<M>,
        store: Arc<S>,
        source: Arc<A>,
        verification_token: impl Into<String>,
    ) -> Self {
        Self {
            notify: NotificationWorkflow::new(messenger.clone(), store, LarkCardRenderer),
            callback: Arc::new(CallbackWorkflow::new(messenger, source, SystemClock)),
            verification_token: verification_token.into(),
        }
    }

    /// Get the notification workflow.
    #[must_use]
    pub const fn notify(&self) -> &NotificationWorkflow<M, S, LarkCardRenderer> {
        &self.notify
    }

    /// Get the callback workflow.
    #[must_use]
    pub fn callback(&self) -> Arc<CallbackWorkflow<M, A, SystemClock>> {
        self.callback.clone()
    }

    /// Returns true if `token` is the configured verification token.
    #[must_use]
    pub fn verifies(&self, token: &str) -> bool {
        !self.verification_token.is_empty() && self.verification_token == token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertlark_core::MemoryStore;
    use alertlark_core::testing::{FakeAlertSource, FakeMessenger};

    fn state(token: &str) -> AppState<FakeMessenger, MemoryStore, FakeAlertSource> {
        AppState::new(
            Arc::new(FakeMessenger::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(FakeAlertSource::new()),
            token,
        )
    }

    #[test]
    fn verification_token_must_match() {
        let state = state("vt");
        assert!(state.verifies("vt"));
        assert!(!state.verifies("other"));
        assert!(!state.verifies(""));
    }

    #[test]
    fn empty_configured_token_verifies_nothing() {
        assert!(!state("").verifies(""));
    }

    #[test]
    fn callback_workflow_is_shared() {
        let state = state("vt");
        assert!(Arc::ptr_eq(&state.callback(), &state.callback()));
    }
}
