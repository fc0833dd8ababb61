//! Gateway error types.

use crate::types::LogoutReason;
use menudesk_storage::StorageError;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Maximum length for response bodies carried in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced to callers of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },

    #[error("authentication failed: {0}")]
    InvalidCredentials(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Maps a non-success response to an error, truncating the body.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let body = truncate_body(&String::from_utf8_lossy(body));
        if status == StatusCode::UNAUTHORIZED {
            GatewayError::Unauthorized { body }
        } else {
            GatewayError::Status { status, body }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Network-level failures reported by an [`crate::HttpTransport`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Why a token refresh could not produce a new session.
///
/// Shared by every caller waiting on the same refresh, hence `Clone`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("refresh response could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("refresh transport error: {0}")]
    Transport(TransportError),

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("session ended while the refresh was in flight")]
    SessionEnded,

    #[error("refresh task aborted: {0}")]
    Aborted(String),
}

impl AuthFailure {
    /// Reason recorded when this failure ends the session.
    pub fn logout_reason(&self) -> LogoutReason {
        match self {
            AuthFailure::MissingRefreshToken => LogoutReason::MissingRefreshToken,
            _ => LogoutReason::RefreshFailed,
        }
    }
}
