//! Debug stop records.

/// Why a thread stopped at a statement boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An enabled breakpoint matched (and its condition held).
    Breakpoint,
    /// A step request completed.
    Step,
    /// An explicit suspend request took effect.
    Suspend,
}

/// The most recent stop: the thread that reported it becomes the current
/// thread for frame and value queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugStop {
    pub reason: StopReason,
    pub thread_id: u64,
}
