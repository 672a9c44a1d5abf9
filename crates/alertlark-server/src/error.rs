//! Error types for the alertlark server.

use alertlark_core::CoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the alertlark server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request body could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The URL verification token did not match.
    #[error("unauthorized: invalid verification token")]
    Unauthorized,

    /// A workflow failed.
    #[error(transparent)]
    Workflow(#[from] CoreError),

    /// Lark client setup failed.
    #[error(transparent)]
    Lark(#[from] alertlark_client::LarkError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BindFailed(_, _)
            | Self::Config(_)
            | Self::Workflow(_)
            | Self::Lark(_)
            | Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn invalid_request_is_bad_request() {
        let err = ServerError::InvalidRequest("expected value".to_string());
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert!(json["message"].as_str().unwrap().contains("expected value"));
    }

    #[tokio::test]
    async fn unauthorized_response() {
        let response = ServerError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn workflow_error_is_internal() {
        let err = ServerError::from(CoreError::messaging("bot not in chat"));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err = ServerError::from(serde_err);

        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn error_display() {
        let err = ServerError::Config("PORT".to_string());
        assert_eq!(err.to_string(), "invalid configuration: PORT");

        let err = ServerError::from(CoreError::store("timeout"));
        assert_eq!(err.to_string(), "store failure: timeout");
    }
}
