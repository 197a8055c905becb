//! Error types for the Corpora client.

use thiserror::Error;

/// Result type alias using the Corpora client's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Corpora client operations.
///
/// Network, authorization and validation failures are kept apart so callers
/// (widgets, the CLI) can react differently to each.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection refused, DNS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not complete within its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Authentication failed (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server rejected the request payload (HTTP 400/422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server-side failure (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input caught before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field or parameter type tag with no registered behaviour
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map a non-success HTTP status and its body to an error variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            400 | 422 => Error::Validation(body),
            401 => Error::Unauthorized(body),
            403 => Error::Forbidden(body),
            404 => Error::NotFound(body),
            408 | 504 => Error::Timeout(body),
            500..=599 => Error::Server {
                status,
                message: body,
            },
            _ => Error::Internal(format!("unexpected status {}: {}", status, body)),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::Server { .. }
        )
    }

    /// Whether the failure stems from identity or role checks.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::Forbidden(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Error::Timeout(e.to_string());
        }
        if e.is_decode() {
            return Error::Serialization(e.to_string());
        }
        if let Some(status) = e.status() {
            return Error::from_status(status.as_u16(), e.to_string());
        }
        Error::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_validation() {
        assert!(matches!(
            Error::from_status(400, "bad field"),
            Error::Validation(_)
        ));
        assert!(matches!(
            Error::from_status(422, "bad field"),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_from_status_auth() {
        let err = Error::from_status(401, "token expired");
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Unauthorized: token expired");

        let err = Error::from_status(403, "not an admin");
        assert!(err.is_auth());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_status_not_found() {
        let err = Error::from_status(404, "/corpus/1/Book/9");
        assert_eq!(err.to_string(), "Not found: /corpus/1/Book/9");
    }

    #[test]
    fn test_from_status_server_is_retryable() {
        let err = Error::from_status(502, "bad gateway");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Server error (502): bad gateway");
    }

    #[test]
    fn test_from_status_gateway_timeout() {
        assert!(matches!(Error::from_status(504, ""), Error::Timeout(_)));
    }

    #[test]
    fn test_from_status_unexpected() {
        let err = Error::from_status(418, "teapot");
        assert!(matches!(err, Error::Internal(_)));
        assert!(err.to_string().contains("418"));
    }

    #[test]
    fn test_network_is_retryable() {
        assert!(Error::Network("reset".into()).is_retryable());
        assert!(!Error::Validation("nope".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
