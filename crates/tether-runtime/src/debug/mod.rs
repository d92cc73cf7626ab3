//! Debugging support: run control, breakpoints and stop records.

mod breakpoints;
mod control;
mod types;

pub(crate) use breakpoints::BreakpointTable;
pub use control::{ControlAction, DebugControl, DebugMode, StepKind};
pub use types::{DebugStop, StopReason};
