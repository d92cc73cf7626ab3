//! Run-control requests addressed to a session.

use crate::model::Breakpoint;

/// Start a debuggee that was launched suspended, installing breakpoints first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartAction {
    pub breakpoints: Vec<Breakpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugAction {
    Start(StartAction),
    Resume,
    StepInto,
    StepOver,
    StepOut,
    Suspend,
}

impl DebugAction {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DebugAction::Start(_) => "start",
            DebugAction::Resume => "resume",
            DebugAction::StepInto => "step_into",
            DebugAction::StepOver => "step_over",
            DebugAction::StepOut => "step_out",
            DebugAction::Suspend => "suspend",
        }
    }
}
