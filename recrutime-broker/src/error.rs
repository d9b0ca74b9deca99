//! Error types for the interview broker and the file-backed stores

use crate::session::SessionState;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Result type for the handoff and job configuration stores.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error type for session and broker operations
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// No session with this id was ever created
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    /// The operation is not valid in the session's current state
    #[error("Invalid transition for session {session_id} in state {state}")]
    InvalidTransition {
        session_id: String,
        state: SessionState,
    },
}

impl BrokerError {
    pub fn not_found<S: Into<String>>(session_id: S) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }

    pub fn invalid_transition<S: Into<String>>(session_id: S, state: SessionState) -> Self {
        Self::InvalidTransition {
            session_id: session_id.into(),
            state,
        }
    }
}

/// Error type for the file-backed JSON stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Malformed store document: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// The temporary file could not replace the store
    #[error("Failed to persist store document: {source}")]
    Persist {
        #[from]
        source: tempfile::PersistError,
    },
}
