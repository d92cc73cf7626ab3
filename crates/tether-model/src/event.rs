//! Asynchronous debugger events.

use serde::{Deserialize, Serialize};

use crate::model::{Breakpoint, Location};

/// Event discriminator, as carried in the `type` field of the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebuggerEventType {
    Disconnect,
    Suspend,
    BreakpointActivated,
}

impl DebuggerEventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DebuggerEventType::Disconnect => "DISCONNECT",
            DebuggerEventType::Suspend => "SUSPEND",
            DebuggerEventType::BreakpointActivated => "BREAKPOINT_ACTIVATED",
        }
    }
}

/// Occurrence raised by a debug engine outside of a direct request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerEvent {
    /// The debuggee went away (explicit disconnect, exit or lost transport).
    Disconnect,
    /// Execution stopped at `location` (breakpoint hit, step end or suspend).
    Suspend { location: Location },
    /// A breakpoint became active in the engine.
    BreakpointActivated { breakpoint: Breakpoint },
}

impl DebuggerEvent {
    #[must_use]
    pub fn event_type(&self) -> DebuggerEventType {
        match self {
            DebuggerEvent::Disconnect => DebuggerEventType::Disconnect,
            DebuggerEvent::Suspend { .. } => DebuggerEventType::Suspend,
            DebuggerEvent::BreakpointActivated { .. } => DebuggerEventType::BreakpointActivated,
        }
    }
}
