//! Error types for the outbound gateways and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every way a call to an external service can fail.
///
/// Gateways never panic or propagate raw transport errors; each failure path
/// ends up as one of these variants. The `Display` text is what a user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A required credential is not configured.
    #[error("{0}")]
    Configuration(String),

    /// The service answered with a non-success status or an error payload.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The service answered successfully but produced no candidates.
    #[error("{0}")]
    EmptyResponse(String),

    /// The response did not have the expected shape.
    #[error("{0}")]
    MalformedResponse(String),

    /// Network or decoding failure. `details` carries the underlying cause
    /// for diagnostics and is not part of the user-facing text.
    #[error("{message}")]
    Transport { message: String, details: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>, details: impl ToString) -> Self {
        GatewayError::Transport {
            message: message.into(),
            details: details.to_string(),
        }
    }
}

/// Error body returned by the JSON endpoints: `{error, details?}`.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display_is_user_text() {
        let err = GatewayError::Upstream {
            status: 429,
            message: "Quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Quota exceeded");

        let err = GatewayError::transport("Failed to process request", "connection refused");
        assert_eq!(err.to_string(), "Failed to process request");
        match err {
            GatewayError::Transport { details, .. } => assert_eq!(details, "connection refused"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::new(StatusCode::TOO_MANY_REQUESTS, "x").status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::internal("YouTube API error").with_details("quota");
        assert_eq!(err.to_string(), "YouTube API error");
    }
}
