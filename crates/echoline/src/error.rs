//! Error types for the chat client.

use std::fmt;

/// Convenience alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// Chat client errors.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// The configured page origin could not be turned into a server address.
    InvalidOrigin(String),
    /// An operation required a live connection and none was present.
    NotConnected,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrigin(msg) => write!(f, "Invalid origin: {msg}"),
            Self::NotConnected => write!(f, "Not connected"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidOrigin(err.to_string())
    }
}
