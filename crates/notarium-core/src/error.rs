//! Error types for the Notarium engine.

use thiserror::Error;

/// Result type alias using Notarium's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Notarium operations.
///
/// The five leading variants form the engine's error taxonomy; callers can
/// match on them to decide whether an operation may be retried (`Transport`)
/// or must not be (`Auth`, `Precondition`, `Device`).
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or rejected bearer credential. Fatal to the operation,
    /// must not be retried automatically.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network or remote failure. May be retried by the caller; the engine
    /// never retries on its own.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Operation attempted against the wrong state (media attach on a
    /// draft, duplicate recording session, illegal state transition).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Capture device denied or unavailable. Terminal for the session.
    #[error("Device error: {0}")]
    Device(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
