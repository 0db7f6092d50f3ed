//! Connect SSO error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type alias for Connect operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Errors produced while processing a Connect SSO exchange.
///
/// Every variant is request-scoped; none of them should ever take the
/// process down.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The `sso` or `sig` request parameter was absent or empty.
    #[error("sso and sig parameters are required")]
    MissingParameters,

    /// Supplied signature does not match the payload.
    #[error("payload signature mismatch")]
    InvalidSignature,

    /// Payload was not valid Base64, UTF-8 or a parseable query string.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A required payload field was absent after decoding.
    #[error("payload missing required field: {field}")]
    MissingField { field: &'static str },

    /// The return URL failed validation.
    #[error("invalid return URL: {reason}")]
    InvalidReturnUrl { reason: String },

    /// Login-callback leg: `external_id` does not resolve to a local user.
    #[error("no local user for supplied external id")]
    UserNotFound,

    /// Forum sync endpoint answered with a non-success status.
    #[error("forum sync rejected: HTTP {status}")]
    SyncFailed { status: u16 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected failure while building the outbound response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConnectError {
    /// Short machine-readable code, used in logs and audit rows.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectError::MissingParameters => "missing_parameters",
            ConnectError::InvalidSignature => "invalid_signature",
            ConnectError::MalformedPayload(_) => "malformed_payload",
            ConnectError::MissingField { .. } => "missing_field",
            ConnectError::InvalidReturnUrl { .. } => "invalid_return_url",
            ConnectError::UserNotFound => "user_not_found",
            ConnectError::SyncFailed { .. } => "sync_failed",
            ConnectError::Database(_) => "database_error",
            ConnectError::Http(_) => "http_error",
            ConnectError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConnectError::MissingParameters
            | ConnectError::InvalidSignature
            | ConnectError::MalformedPayload(_)
            | ConnectError::MissingField { .. }
            | ConnectError::InvalidReturnUrl { .. }
            | ConnectError::UserNotFound => StatusCode::BAD_REQUEST,
            ConnectError::SyncFailed { .. } | ConnectError::Http(_) => StatusCode::BAD_GATEWAY,
            ConnectError::Database(_) | ConnectError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // SECURITY: the body must not reveal which check failed; a forged
        // probe learns nothing beyond "400". The distinction lives in
        // server-side logs. InvalidSignature logs at WARN: it can mean a
        // forged request or a shared-secret mismatch between the two systems.
        match &self {
            ConnectError::InvalidSignature => {
                tracing::warn!(code = self.error_code(), "SSO request rejected");
            }
            ConnectError::Database(e) => {
                tracing::error!(error = %e, "database error during SSO exchange");
            }
            ConnectError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error during SSO exchange");
            }
            ConnectError::SyncFailed { status } => {
                tracing::warn!(status = *status, "forum sync failure surfaced");
            }
            ConnectError::Http(e) => {
                tracing::warn!(error = %e, "HTTP client failure surfaced");
            }
            other => {
                tracing::info!(code = other.error_code(), detail = %other, "SSO request rejected");
            }
        }

        // Absent parameters are a framing mistake, not a security signal;
        // naming them helps forum-side debugging.
        let body = if matches!(self, ConnectError::MissingParameters) {
            "SSO parameters are required."
        } else if status == StatusCode::BAD_REQUEST {
            "Invalid SSO request."
        } else {
            "Error processing SSO request."
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_map_to_400() {
        for e in [
            ConnectError::MissingParameters,
            ConnectError::InvalidSignature,
            ConnectError::MalformedPayload("x".into()),
            ConnectError::MissingField { field: "nonce" },
            ConnectError::InvalidReturnUrl {
                reason: "relative".into(),
            },
            ConnectError::UserNotFound,
        ] {
            assert_eq!(e.status_code(), StatusCode::BAD_REQUEST, "{e}");
        }
    }

    #[test]
    fn test_signature_and_decode_failures_are_distinct_codes() {
        assert_ne!(
            ConnectError::InvalidSignature.error_code(),
            ConnectError::MalformedPayload("bad base64".into()).error_code()
        );
    }

    #[test]
    fn test_internal_maps_to_500() {
        assert_eq!(
            ConnectError::Internal("encode failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
