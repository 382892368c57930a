use thiserror::Error;

use crate::fragment::FragmentId;
use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Failed to decode document: {0}")]
    DecodeFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error("Session is not ready (state: {0})")]
    NotReady(SessionState),

    #[error("Fragment {0} is already registered")]
    DuplicateFragment(FragmentId),
}

impl EditorError {
    /// Message shown to the user by the surrounding shell.
    pub fn user_message(&self) -> &'static str {
        match self {
            EditorError::DecodeFailure(_) => "Failed to load PDF. Please try another file.",
            EditorError::ExportFailure(_) => "Failed to export PDF. Please try again.",
            EditorError::NotReady(_) => "The document is still loading.",
            EditorError::InvalidConfiguration(_) | EditorError::DuplicateFragment(_) => {
                "Something went wrong. Please reload the editor."
            }
        }
    }
}

/// Failure reported by a decoder or mutator implementation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<lopdf::Error> for BackendError {
    fn from(e: lopdf::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self(format!("I/O error: {}", e))
    }
}
