//! Error types for the mindrecord client.
//!
//! One unified error type with explicit variants for token decoding,
//! session persistence, authentication preconditions, remote failures,
//! local storage and input validation.

use std::fmt;
use thiserror::Error;

/// The unified error type for mindrecord operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Token payload could not be decoded.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Tokens failed structural validation before being persisted.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Authentication errors (missing token, malformed login response).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-success HTTP responses from the remote API.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Durable key-value storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true for failures surfaced by the transport or the remote API.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Protocol(_))
    }

    /// Returns true if the call was refused because no access token is stored.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Auth(AuthError::Unauthorized))
    }
}

/// Token decoding errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The payload segment is not base64url-encoded JSON object text.
    #[error("malformed claims: {reason}")]
    MalformedClaims { reason: String },
}

/// Session persistence errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// At least one token is not a three-part token.
    #[error("invalid session data")]
    InvalidSessionData,
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An authenticated call was attempted with no stored access token.
    #[error("unauthorized: no access token stored")]
    Unauthorized,

    /// The server answered a login with data that is not a usable token pair.
    #[error("invalid authorization data")]
    InvalidAuthorizationData,
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error, including undecodable bodies.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Protocol-level errors from API responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if the server rejected the caller's credentials.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Local storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The backing file exists but is not a JSON string map.
    #[error("corrupt store {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },
}
