//! Runtime handler errors.
//!
//! [`HandlerError`] is what a callback returns when it cannot produce a
//! payload. The compiled request handler renders it into a [`Reply`](crate::Reply)
//! carrying the error status and the envelope:
//!
//! ```json
//! { "code": "not_found", "message": "post 7 does not exist", "data": { "status": 404 } }
//! ```

use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::di::InjectionError;

/// Result type alias using [`HandlerError`].
pub type HandlerResult<T> = Result<T, HandlerError>;

/// A per-request failure with an HTTP status and a machine-readable code.
///
/// # Example
///
/// ```
/// use trellis_core::HandlerError;
/// use http::StatusCode;
///
/// let err = HandlerError::not_found("post 7 does not exist");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// assert_eq!(err.to_payload()["code"], "not_found");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct HandlerError {
    status: StatusCode,
    code: String,
    message: String,
}

impl HandlerError {
    /// Creates an error with an explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// 400 `bad_request`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// 403 `forbidden`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    /// 404 `not_found`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// 500 `internal_error`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the `{code, message, data: {status}}` envelope.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "code": self.code,
            "message": self.message,
            "data": { "status": self.status.as_u16() },
        })
    }
}

impl From<InjectionError> for HandlerError {
    fn from(err: InjectionError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "injection_failed",
            err.to_string(),
        )
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "serialization_failed",
            err.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_envelope() {
        let err = HandlerError::bad_request("title is required");
        assert_eq!(
            err.to_payload(),
            json!({
                "code": "bad_request",
                "message": "title is required",
                "data": { "status": 400 }
            })
        );
    }

    #[test]
    fn test_from_injection_error() {
        let err: HandlerError = InjectionError::not_registered::<String>().into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "injection_failed");
        assert!(err.message().contains("not registered"));
    }

    #[test]
    fn test_display() {
        let err = HandlerError::forbidden("nope");
        assert_eq!(err.to_string(), "forbidden: nope");
    }
}
