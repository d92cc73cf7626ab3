//! Engine and control server errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the engine, its debug control and the control server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Class is not part of the program.
    #[error("undefined class '{0}'")]
    UndefinedClass(SmolStr),

    /// Method is not declared by the class.
    #[error("undefined method '{class}.{method}'")]
    UndefinedMethod { class: SmolStr, method: SmolStr },

    /// Invocation argument count does not match the declaration.
    #[error("invalid argument count for '{method}' (expected {expected}, got {got})")]
    InvalidArgumentCount {
        method: SmolStr,
        expected: usize,
        got: usize,
    },

    /// No executable statement at the requested line.
    #[error("no code at {class}:{line}")]
    NoCodeAtLine { class: SmolStr, line: i32 },

    /// Statement reported outside of any method frame.
    #[error("statement outside of a method frame")]
    NoActiveFrame,

    /// Requested frame index does not exist on the current thread.
    #[error("no frame {0} on the current thread")]
    NoSuchFrame(usize),

    /// Variable path does not resolve.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(SmolStr),

    /// Text cannot be converted to the target type.
    #[error("invalid value '{value}' for type {type_name}")]
    InvalidValue { type_name: SmolStr, value: SmolStr },

    /// Expression parse or evaluation failure.
    #[error("evaluation failed: {0}")]
    Evaluation(SmolStr),

    /// Operation requires a suspended debuggee.
    #[error("debuggee is not suspended")]
    NotSuspended,

    /// Suspend requested while already suspended.
    #[error("debuggee is already suspended")]
    AlreadySuspended,

    /// Start requested after the debuggee was started.
    #[error("debuggee already started")]
    AlreadyStarted,

    /// Operation not offered by this engine.
    #[error("unsupported operation '{0}'")]
    Unsupported(SmolStr),

    /// The engine was terminated.
    #[error("debuggee terminated")]
    Terminated,

    /// Guest thread could not be spawned.
    #[error("failed to spawn thread '{name}': {reason}")]
    ThreadSpawn { name: SmolStr, reason: SmolStr },

    /// Malformed control request.
    #[error("invalid request: {0}")]
    InvalidRequest(SmolStr),

    /// Control server failure (bind/IO).
    #[error("control server error: {0}")]
    ControlError(SmolStr),
}

impl RuntimeError {
    /// Error kind reported on the control wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::NotSuspended
            | RuntimeError::AlreadySuspended
            | RuntimeError::AlreadyStarted => "state_conflict",
            RuntimeError::UndefinedClass(_)
            | RuntimeError::UndefinedMethod { .. }
            | RuntimeError::NoCodeAtLine { .. }
            | RuntimeError::NoSuchFrame(_)
            | RuntimeError::UndefinedVariable(_) => "resolution",
            RuntimeError::InvalidValue { .. } | RuntimeError::Evaluation(_) => "evaluation",
            RuntimeError::Unsupported(_) => "unsupported",
            RuntimeError::Terminated => "terminated",
            RuntimeError::InvalidRequest(_) => "invalid_request",
            RuntimeError::InvalidArgumentCount { .. }
            | RuntimeError::NoActiveFrame
            | RuntimeError::ThreadSpawn { .. }
            | RuntimeError::ControlError(_) => "internal",
        }
    }
}
