//! Debugger failures.

use serde::Serialize;
use thiserror::Error;

pub type DebuggerResult<T> = Result<T, DebuggerError>;

/// Coarse failure class reported to clients next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Timeout,
    NotConnected,
    StateConflict,
    Resolution,
    Evaluation,
    Unsupported,
    UnknownDebuggerType,
    InvalidRequest,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebuggerError {
    #[error("cannot connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The debuggee did not answer in time. The connection is still assumed
    /// alive.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("session {0} is not connected")]
    NotConnected(String),
    #[error("{0}")]
    StateConflict(String),
    #[error("session {0} already has an operation in flight")]
    OperationInFlight(String),
    #[error("{0}")]
    Resolution(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("unknown debugger type '{0}'")]
    UnknownDebuggerType(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("debugger failure: {0}")]
    Internal(String),
}

impl DebuggerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DebuggerError::ConnectFailed { .. } | DebuggerError::ConnectionLost(_) => {
                ErrorKind::Connection
            }
            DebuggerError::Timeout { .. } => ErrorKind::Timeout,
            DebuggerError::NotConnected(_) => ErrorKind::NotConnected,
            DebuggerError::StateConflict(_) | DebuggerError::OperationInFlight(_) => {
                ErrorKind::StateConflict
            }
            DebuggerError::Resolution(_) => ErrorKind::Resolution,
            DebuggerError::Evaluation(_) => ErrorKind::Evaluation,
            DebuggerError::Unsupported(_) => ErrorKind::Unsupported,
            DebuggerError::UnknownDebuggerType(_) => ErrorKind::UnknownDebuggerType,
            DebuggerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            DebuggerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the transport to the debuggee is known to be gone.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, DebuggerError::ConnectionLost(_))
    }

    /// Rebuild an engine-side failure from its wire kind and message.
    #[must_use]
    pub fn from_remote(kind: Option<&str>, message: String) -> Self {
        match kind {
            Some("state_conflict") => DebuggerError::StateConflict(message),
            Some("resolution") => DebuggerError::Resolution(message),
            Some("evaluation") => DebuggerError::Evaluation(message),
            Some("unsupported") => DebuggerError::Unsupported(message),
            Some("terminated") => DebuggerError::ConnectionLost(message),
            Some("invalid_request") => DebuggerError::InvalidRequest(message),
            _ => DebuggerError::Internal(message),
        }
    }
}
