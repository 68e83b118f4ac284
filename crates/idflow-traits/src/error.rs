//! Failure values reported by collaborators.

use thiserror::Error;

/// Failure reported by an identity provider.
///
/// The message is shown to the user verbatim as the sign-in error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure code returned by the remote authentication service.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("remote error code {code}")]
pub struct RemoteFailure {
    pub code: i32,
}

impl RemoteFailure {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}
