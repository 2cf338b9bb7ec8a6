//! Client error types

use peopleos_core::CoreError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials missing or rejected after any recovery attempt
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden on an endpoint outside the authenticated session
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflicting state on the server
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payload failed server-side validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Session token could not be read or written
    #[error("Session storage error: {0}")]
    Storage(#[from] CoreError),

    /// The shared token refresh this request waited on failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(RefreshError),

    /// The session ended and the user was sent back to the login page
    #[error("Session ended: {0}")]
    SessionTerminated(SessionEnd),

    /// The refresh coordinator task is no longer running
    #[error("Refresh coordinator unavailable")]
    Coordinator,
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::Validation(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status behind this error, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Validation(_) => Some(422),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the session was ended and a login redirect already issued
    ///
    /// Callers should not surface their own error message for these: the
    /// user is already on the way back to the login page.
    pub fn is_session_terminated(&self) -> bool {
        matches!(self, Self::SessionTerminated(_))
    }

    /// Whether this error means the caller is not (or no longer) authenticated
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::RefreshFailed(_) | Self::SessionTerminated(_)
        )
    }

    /// Login redirect issued for this error, if any
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::SessionTerminated(end) => Some(&end.redirect),
            _ => None,
        }
    }
}

/// Why a token refresh did not produce a usable token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with a non-success status
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh request never got a response
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint succeeded but returned no token
    #[error("refresh response did not contain a token")]
    MissingToken,

    /// The new token could not be persisted
    #[error("could not store refreshed token: {0}")]
    Storage(String),

    /// The session had already ended before this request asked for a refresh
    #[error("session already ended")]
    SessionEnded,
}

/// Terminal end of an authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// What ended the session
    pub reason: SessionEndReason,
    /// Navigation target the user was sent to
    pub redirect: String,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (redirected to {})", self.reason, self.redirect)
    }
}

/// What ended a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The account was denied access (suspended, deleted)
    Forbidden(Option<String>),
    /// The token could not be refreshed
    RefreshFailed(RefreshError),
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden(Some(message)) => write!(f, "access denied: {message}"),
            Self::Forbidden(None) => write!(f, "access denied"),
            Self::RefreshFailed(error) => write!(f, "{error}"),
        }
    }
}

/// Pull a human-readable message out of an error response body
///
/// The backend reports errors as `{"error": "..."}` or `{"message": "..."}`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// Message to attach to an error built from a response
pub(crate) fn describe_failure(status: StatusCode, body: &str) -> String {
    if let Some(message) = error_message(body) {
        return message;
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string())
    } else {
        body.to_string()
    }
}
