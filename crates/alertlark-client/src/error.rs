//! Error types for Lark Open Platform operations.

use alertlark_core::CoreError;
use thiserror::Error;

/// Result type alias for Lark operations.
pub type Result<T> = std::result::Result<T, LarkError>;

/// Tenant token error codes returned when the cached token is no longer valid.
const TOKEN_ERROR_CODES: [i64; 2] = [99_991_661, 99_991_663];

/// Errors that can occur when calling the Lark Open Platform.
#[derive(Debug, Error)]
pub enum LarkError {
    /// The request failed in transport or timed out.
    #[error("lark request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-zero code.
    #[error("lark API error {code}: {msg}")]
    Api {
        /// Lark error code.
        code: i64,
        /// Lark error message.
        msg: String,
    },

    /// A successful response lacked a field the caller needs.
    #[error("lark response missing {0}")]
    MissingField(&'static str),

    /// The configured base URL cannot be used.
    #[error("invalid lark base url: {0}")]
    InvalidUrl(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LarkError {
    /// Returns true if the error means the tenant access token must be refreshed.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::Api { code, .. } if TOKEN_ERROR_CODES.contains(code))
    }
}

impl From<LarkError> for CoreError {
    fn from(err: LarkError) -> Self {
        match err {
            LarkError::Serialization(e) => Self::Serialization(e.to_string()),
            other => Self::messaging(other.to_string()),
        }
    }
}
