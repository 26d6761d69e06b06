//! Error types for monitor operations.

/// Everything a session/backend operation can fail with.
///
/// None of these are fatal to the process: the controller maps each one onto
/// "state did not change" and hands it back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("network failure during {operation}: {details}")]
    Network {
        operation: &'static str,
        details: String,
    },

    #[error("invalid response from {operation}: {details}")]
    InvalidResponse {
        operation: &'static str,
        details: String,
    },

    #[error("missing precondition: {0}")]
    PreconditionMissing(&'static str),

    #[error("a focus session is already active")]
    SessionAlreadyActive,

    #[error("invalid session parameters: {0}")]
    InvalidSpec(String),

    #[error("session start was cancelled before the backend answered")]
    StartCancelled,
}

impl MonitorError {
    pub(crate) fn network(operation: &'static str, err: impl std::fmt::Display) -> Self {
        MonitorError::Network {
            operation,
            details: err.to_string(),
        }
    }

    pub(crate) fn invalid_response(operation: &'static str, err: impl std::fmt::Display) -> Self {
        MonitorError::InvalidResponse {
            operation,
            details: err.to_string(),
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
