use thiserror::Error;

use super::models::RecordId;

/// Errors returned by the timer engine's state-changing operations.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer already running")]
    AlreadyRunning,
    #[error("no timer running")]
    NotRunning,
    /// Any failure of the remote backend. The engine reacts to all of them
    /// the same way, the source is kept for logging and display.
    #[error("timesheet backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
}

/// Errors raised by a [`TimerBackend`](crate::domain::ports::outbound::TimerBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("session expired or invalid")]
    Unauthorized,
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("record {0} has no running timer")]
    NotRunning(RecordId),
    #[error("server error: {0}")]
    Server(String),
    #[error("unusable response from backend: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Errors raised by a [`StateStore`](crate::domain::ports::outbound::StateStore).
///
/// Persistence is an optimization, so the engine logs these and carries on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store contents could not be decoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
