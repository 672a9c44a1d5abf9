//! Error types for the alertlark-core crate.

use std::fmt;

use thiserror::Error;

/// The external system a [`CoreError::Collaborator`] failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// The correlation store.
    Store,
    /// The alert source (Alertmanager).
    AlertSource,
    /// The chat platform.
    Messaging,
}

impl Collaborator {
    /// Returns the collaborator name used in logs and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::AlertSource => "alert source",
            Self::Messaging => "messaging",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the correlation and silence workflows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lookup produced no match.
    #[error("{what} not found: {id}")]
    NotFound {
        /// The kind of thing that was looked up.
        what: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// The silence duration token is not part of the supported vocabulary.
    #[error("invalid silence duration: {token:?}")]
    InvalidDuration {
        /// The rejected token.
        token: String,
    },

    /// An external collaborator failed or timed out.
    #[error("{collaborator} failure: {reason}")]
    Collaborator {
        /// Which collaborator failed.
        collaborator: Collaborator,
        /// Description of the failure.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Creates a store failure.
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::Store,
            reason: reason.into(),
        }
    }

    /// Creates an alert-source failure.
    pub fn alert_source(reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::AlertSource,
            reason: reason.into(),
        }
    }

    /// Creates a messaging failure.
    pub fn messaging(reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::Messaging,
            reason: reason.into(),
        }
    }

    /// Returns true if this is a [`CoreError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
