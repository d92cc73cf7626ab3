//! Debugger value model and its wire forms.
//!
//! The model types are immutable snapshots produced by debug engines; the
//! `dto` module maps each of them (and every event) to the JSON shape sent
//! to remote clients, and back.

mod action;
pub mod dto;
mod event;
mod model;

pub use action::{DebugAction, StartAction};
pub use event::{DebuggerEvent, DebuggerEventType};
pub use model::{
    Breakpoint, DebugSession, DebuggerInfo, Field, Location, Method, PositionKey, SessionId,
    SimpleValue, StackFrameDump, ThreadDump, ThreadStatus, Variable, VariablePath,
    NO_EXTERNAL_RESOURCE, UNKNOWN_LINE,
};
