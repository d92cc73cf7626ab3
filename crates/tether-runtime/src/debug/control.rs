//! Debug control and state.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::RuntimeError;

use super::{DebugStop, StopReason};

/// Debugger execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// Execute statements without pausing.
    Running,
    /// Block every thread at its next statement boundary.
    Paused,
}

/// Step behavior while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Pause at the next statement, regardless of call depth.
    Into,
    /// Pause at the next statement at the same or a lower call depth.
    Over,
    /// Pause at the next statement after returning to the caller.
    Out,
}

/// Control actions requested by a debugger client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Suspend,
    Resume,
    Step(StepKind),
}

#[derive(Debug, Clone, Copy)]
struct StepState {
    kind: StepKind,
    thread: Option<u64>,
    origin_depth: usize,
}

impl StepState {
    fn completes(&self, thread: u64, depth: usize) -> bool {
        if self.thread.is_some_and(|target| target != thread) {
            return false;
        }
        match self.kind {
            StepKind::Into => true,
            StepKind::Over => depth <= self.origin_depth,
            StepKind::Out => depth < self.origin_depth,
        }
    }
}

#[derive(Debug)]
struct DebugState {
    started: bool,
    terminated: bool,
    mode: DebugMode,
    pending_stop: bool,
    step: Option<StepState>,
    depths: FxHashMap<u64, usize>,
    suspended: FxHashSet<u64>,
    last_stop: Option<DebugStop>,
}

/// Shared run control. Guest threads call into it at every statement
/// boundary and block there while the debuggee is paused.
#[derive(Debug, Clone)]
pub struct DebugControl {
    state: Arc<(Mutex<DebugState>, Condvar)>,
}

impl DebugControl {
    /// Create a control handle. A control created with `suspended_on_start`
    /// holds every thread until [`DebugControl::start`] or a resume.
    #[must_use]
    pub fn new(suspended_on_start: bool) -> Self {
        Self {
            state: Arc::new((
                Mutex::new(DebugState {
                    started: !suspended_on_start,
                    terminated: false,
                    mode: DebugMode::Running,
                    pending_stop: false,
                    step: None,
                    depths: FxHashMap::default(),
                    suspended: FxHashSet::default(),
                    last_stop: None,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Release threads held since creation.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if state.terminated {
            return Err(RuntimeError::Terminated);
        }
        if state.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        state.started = true;
        cvar.notify_all();
        Ok(())
    }

    /// Apply a requested control action.
    pub fn apply_action(&self, action: ControlAction) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if state.terminated {
            return Err(RuntimeError::Terminated);
        }
        let previous_mode = state.mode;
        match action {
            ControlAction::Suspend => {
                if !state.started || state.mode == DebugMode::Paused {
                    return Err(RuntimeError::AlreadySuspended);
                }
                state.mode = DebugMode::Paused;
                state.pending_stop = true;
                state.step = None;
            }
            ControlAction::Resume => {
                if state.started && state.mode == DebugMode::Running {
                    return Err(RuntimeError::NotSuspended);
                }
                state.started = true;
                state.mode = DebugMode::Running;
                state.pending_stop = false;
                state.step = None;
                state.last_stop = None;
                cvar.notify_all();
            }
            ControlAction::Step(kind) => {
                let step = if state.started {
                    if state.mode == DebugMode::Running {
                        return Err(RuntimeError::NotSuspended);
                    }
                    let thread = state.last_stop.map(|stop| stop.thread_id);
                    let origin_depth = thread
                        .and_then(|id| state.depths.get(&id).copied())
                        .unwrap_or(0);
                    StepState {
                        kind,
                        thread,
                        origin_depth,
                    }
                } else {
                    // Nothing has run yet: any step stops at the first statement.
                    StepState {
                        kind: StepKind::Into,
                        thread: None,
                        origin_depth: 0,
                    }
                };
                state.started = true;
                state.mode = DebugMode::Running;
                state.pending_stop = false;
                state.step = Some(step);
                state.last_stop = None;
                cvar.notify_all();
            }
        }
        debug!(
            "action={action:?} mode={previous_mode:?}->{:?}",
            state.mode
        );
        Ok(())
    }

    /// Drop any step or pause and let every thread run.
    pub fn detach(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        state.started = true;
        state.mode = DebugMode::Running;
        state.pending_stop = false;
        state.step = None;
        state.last_stop = None;
        cvar.notify_all();
    }

    /// Release all blocked threads; subsequent statements fail with
    /// [`RuntimeError::Terminated`].
    pub fn terminate(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        state.terminated = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.0.lock().terminated
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.0.lock().started
    }

    /// Whether the debuggee as a whole is suspended (not started yet, or paused).
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        let state = self.state.0.lock();
        !state.started || state.mode == DebugMode::Paused
    }

    #[must_use]
    pub fn mode(&self) -> DebugMode {
        self.state.0.lock().mode
    }

    /// Threads currently blocked at a statement boundary.
    #[must_use]
    pub fn suspended_threads(&self) -> FxHashSet<u64> {
        self.state.0.lock().suspended.clone()
    }

    #[must_use]
    pub fn last_stop(&self) -> Option<DebugStop> {
        self.state.0.lock().last_stop
    }

    /// Thread of the last stop, if it is still blocked.
    #[must_use]
    pub fn current_thread(&self) -> Option<u64> {
        let state = self.state.0.lock();
        state
            .last_stop
            .map(|stop| stop.thread_id)
            .filter(|id| state.suspended.contains(id))
    }

    /// Block a freshly spawned thread until the debuggee is started.
    pub fn await_start(&self) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        while !state.started && !state.terminated {
            cvar.wait(&mut state);
        }
        if state.terminated {
            return Err(RuntimeError::Terminated);
        }
        Ok(())
    }

    pub fn thread_exited(&self, thread: u64) {
        let mut state = self.state.0.lock();
        state.depths.remove(&thread);
        state.suspended.remove(&thread);
    }

    /// Statement boundary hook.
    ///
    /// Decides whether `thread` stops here, records the stop and blocks while
    /// the debuggee is paused. `on_stop` runs without the control lock held,
    /// after the thread is registered as suspended.
    pub fn on_statement(
        &self,
        thread: u64,
        depth: usize,
        breakpoint_hit: bool,
        on_stop: impl FnOnce(StopReason),
    ) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if state.terminated {
            return Err(RuntimeError::Terminated);
        }
        state.depths.insert(thread, depth);

        let mut reason = None;
        match state.mode {
            DebugMode::Paused => {
                if state.pending_stop {
                    state.pending_stop = false;
                    reason = Some(StopReason::Suspend);
                }
            }
            DebugMode::Running => {
                if state
                    .step
                    .is_some_and(|step| step.completes(thread, depth))
                {
                    reason = Some(StopReason::Step);
                } else if breakpoint_hit {
                    reason = Some(StopReason::Breakpoint);
                }
                if reason.is_some() {
                    state.step = None;
                    state.mode = DebugMode::Paused;
                }
            }
        }

        if state.mode == DebugMode::Running {
            return Ok(());
        }
        state.suspended.insert(thread);
        if let Some(reason) = reason {
            state.last_stop = Some(DebugStop {
                reason,
                thread_id: thread,
            });
            debug!("stop reason={reason:?} thread={thread} depth={depth}");
            drop(state);
            on_stop(reason);
            state = lock.lock();
        }
        while state.mode == DebugMode::Paused && !state.terminated {
            cvar.wait(&mut state);
        }
        state.suspended.remove(&thread);
        if state.terminated {
            return Err(RuntimeError::Terminated);
        }
        Ok(())
    }
}
