use thiserror::Error;

use crate::error::PortalError;

/// Authentication and token-refresh errors.
///
/// Cloneable so a single refresh failure can be handed to every caller that
/// was queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No refresh credential available")]
    RefreshCredentialMissing,
    #[error("Refresh rejected with status {status}")]
    RefreshRejected { status: u16 },
    #[error("Refresh timed out after {0}ms")]
    Timeout(u64),
    #[error("Refresh aborted before settling")]
    RefreshAborted,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Whether this error ends the session (the user must sign in again).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidCredentials)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for PortalError {
    fn from(error: AuthError) -> Self {
        PortalError::Authentication(error)
    }
}
