//! Error types for the cable trainer controller.

use thiserror::Error;

use crate::SessionId;

/// Main error type for cable trainer operations.
///
/// Guard hits (a second stop while one is already running) are not errors
/// and never surface through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// The device link is not connected
    #[error("Device not connected")]
    DeviceNotConnected,

    /// A command could not be delivered to the device
    #[error("Device command failed: {0}")]
    CommandFailed(String),

    /// Saving a session record failed; the set summary is kept for retry
    #[error("Failed to persist session {session_id}: {reason}")]
    PersistenceFailed {
        /// Session whose record could not be saved
        session_id: SessionId,
        /// Underlying failure
        reason: String,
    },

    /// An operation needs a loaded routine
    #[error("No routine loaded")]
    NoRoutineLoaded,

    /// There is no pending session record to save
    #[error("No pending session to save")]
    NothingToSave,

    /// A save of this session is already running
    #[error("Save of session {0} already in progress")]
    SaveInProgress(SessionId),

    /// The finished set has not been stored; retry the save or discard it first
    #[error("Session {0} has not been saved; retry the save or discard the set")]
    UnsavedSet(SessionId),

    /// An operation was requested from a state that cannot honour it
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::DeviceNotConnected | Error::CommandFailed(_) | Error::PersistenceFailed { .. }
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
