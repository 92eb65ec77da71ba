//! Error types for twintoken.

use derive_more::{Display, Error, From};

/// Main error type for twintoken operations.
///
/// Transport failures (`Connection`, `Tls`, `Timeout`) come from the hosting
/// client and are passed through the dual-token middleware untouched.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// A header name or value is not valid HTTP.
    #[display("invalid header '{name}': {reason}")]
    #[from(skip)]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The credential provider failed to refresh the short credential.
    #[display("credential refresh failed: {_0}")]
    #[from(skip)]
    CredentialRefresh(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a credential refresh error.
    #[must_use]
    pub fn credential_refresh(message: impl Into<String>) -> Self {
        Self::CredentialRefresh(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this is a credential refresh error.
    #[must_use]
    pub const fn is_credential_refresh(&self) -> bool {
        matches!(self, Self::CredentialRefresh(_))
    }
}
