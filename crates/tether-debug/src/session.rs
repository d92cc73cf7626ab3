//! Live debug sessions.
//!
//! The manager maps session ids to adapters. Connect inserts a session if
//! absent; disconnect (explicit, adapter-raised or a lost transport found by
//! any call) removes it if present and publishes exactly one DISCONNECT.
//! Each session runs one adapter call at a time; a second concurrent call
//! fails with [`DebuggerError::OperationInFlight`] instead of queueing.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tether_model::{
    Breakpoint, DebugAction, DebugSession, DebuggerEvent, Location, SessionId, SimpleValue,
    StackFrameDump, StartAction, ThreadDump, VariablePath,
};
use tracing::{debug, info, warn};

use crate::debugger::{
    ConnectOptions, Debugger, DebuggerCallback, DebuggerRegistry, Endpoint, RunState,
};
use crate::dispatcher::EventDispatcher;
use crate::error::{DebuggerError, DebuggerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Connected,
    Running,
    Suspended,
    Disconnected,
}

impl From<RunState> for SessionState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Running => SessionState::Running,
            RunState::Suspended => SessionState::Suspended,
        }
    }
}

type SessionMap = RwLock<HashMap<SessionId, Arc<SessionEntry>>>;

/// State machine and event sink of one session. Adapter callbacks land here.
struct SessionChannel {
    id: SessionId,
    state: Mutex<SessionState>,
    dispatcher: EventDispatcher,
    sessions: Weak<SessionMap>,
}

impl SessionChannel {
    /// Apply an adapter event and publish it. Events after the session
    /// disconnected are dropped.
    fn raise(&self, event: DebuggerEvent) {
        let mut removed = None;
        {
            let mut state = self.state.lock();
            if *state == SessionState::Disconnected {
                debug!(
                    "dropping {:?} for disconnected session {}",
                    event.event_type(),
                    self.id
                );
                return;
            }
            match &event {
                DebuggerEvent::Suspend { .. } => *state = SessionState::Suspended,
                DebuggerEvent::Disconnect => {
                    *state = SessionState::Disconnected;
                    if let Some(sessions) = self.sessions.upgrade() {
                        removed = sessions.write().remove(&self.id);
                    }
                    info!("session {} disconnected", self.id);
                }
                DebuggerEvent::BreakpointActivated { .. } => {}
            }
            self.dispatcher.publish(&self.id, &event);
        }
        // The adapter may be released here; no lock is held.
        drop(removed);
    }

    /// Mark a session that never went live as gone, without an event.
    fn abandon(&self) {
        *self.state.lock() = SessionState::Disconnected;
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }
}

struct SessionEntry {
    session: DebugSession,
    channel: Arc<SessionChannel>,
    debugger: Mutex<Box<dyn Debugger>>,
    busy: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionEntry {
    fn claim(&self) -> DebuggerResult<InFlight<'_>> {
        if self.channel.state() == SessionState::Disconnected {
            return Err(DebuggerError::NotConnected(self.session.id.to_string()));
        }
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DebuggerError::OperationInFlight(self.session.id.to_string()))?;
        Ok(InFlight(&self.busy))
    }
}

/// Process-wide registry of live sessions.
pub struct SessionManager {
    registry: DebuggerRegistry,
    dispatcher: EventDispatcher,
    options: ConnectOptions,
    sessions: Arc<SessionMap>,
    next_id: AtomicU64,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        registry: DebuggerRegistry,
        dispatcher: EventDispatcher,
        options: ConnectOptions,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            options,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Connect a debugger of `kind` and register the new session.
    pub fn connect(&self, kind: &str, endpoint: &Endpoint) -> DebuggerResult<DebugSession> {
        let factory = self.registry.get(kind)?;
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed).to_string());
        let channel = Arc::new(SessionChannel {
            id: id.clone(),
            state: Mutex::new(SessionState::Connected),
            dispatcher: self.dispatcher.clone(),
            sessions: Arc::downgrade(&self.sessions),
        });
        let sink = Arc::clone(&channel);
        let callback: DebuggerCallback = Arc::new(move |event| sink.raise(event));

        let mut debugger = factory.connect(endpoint, &self.options, callback)?;
        let initial = match debugger.run_state() {
            Ok(state) => state,
            Err(err) => {
                channel.abandon();
                if let Err(cleanup) = debugger.disconnect() {
                    warn!("disconnect after failed connect to {endpoint}: {cleanup}");
                }
                return Err(err);
            }
        };
        let session = DebugSession {
            id: id.clone(),
            kind: factory.kind().to_string(),
            info: debugger.info(),
        };
        let entry = Arc::new(SessionEntry {
            session: session.clone(),
            channel: Arc::clone(&channel),
            debugger: Mutex::new(debugger),
            busy: AtomicBool::new(false),
        });

        let inserted = {
            let mut state = channel.state.lock();
            if *state == SessionState::Disconnected {
                false
            } else {
                if *state == SessionState::Connected {
                    *state = initial.into();
                }
                self.sessions
                    .write()
                    .entry(id.clone())
                    .or_insert_with(|| Arc::clone(&entry));
                true
            }
        };
        if !inserted {
            return Err(DebuggerError::ConnectionLost(format!(
                "{endpoint} went away while connecting"
            )));
        }
        info!(
            "session {id} connected to {kind} debugger {} {} at {endpoint}",
            session.info.name, session.info.version
        );
        Ok(session)
    }

    /// Detach from the debuggee. The session is gone afterwards even if the
    /// adapter reported a failure.
    pub fn disconnect(&self, id: &SessionId) -> DebuggerResult<()> {
        let entry = self.entry(id)?;
        let result = entry.debugger.lock().disconnect();
        entry.channel.raise(DebuggerEvent::Disconnect);
        if let Err(err) = &result {
            warn!("disconnect of session {id} reported: {err}");
        }
        result
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<DebugSession> {
        let mut sessions: Vec<DebugSession> = self
            .sessions
            .read()
            .values()
            .map(|entry| entry.session.clone())
            .collect();
        sessions.sort_by(|a, b| {
            (a.id.as_str().len(), a.id.as_str()).cmp(&(b.id.as_str().len(), b.id.as_str()))
        });
        sessions
    }

    pub fn session(&self, id: &SessionId) -> DebuggerResult<DebugSession> {
        Ok(self.entry(id)?.session.clone())
    }

    pub fn state(&self, id: &SessionId) -> DebuggerResult<SessionState> {
        Ok(self.entry(id)?.channel.state())
    }

    pub fn add_breakpoint(&self, id: &SessionId, breakpoint: &Breakpoint) -> DebuggerResult<()> {
        self.call(id, |debugger| debugger.add_breakpoint(breakpoint))
    }

    pub fn delete_breakpoint(&self, id: &SessionId, location: &Location) -> DebuggerResult<()> {
        self.call(id, |debugger| debugger.delete_breakpoint(location))
    }

    pub fn delete_all_breakpoints(&self, id: &SessionId) -> DebuggerResult<()> {
        self.call(id, |debugger| debugger.delete_all_breakpoints())
    }

    pub fn breakpoints(&self, id: &SessionId) -> DebuggerResult<Vec<Breakpoint>> {
        self.call(id, |debugger| debugger.breakpoints())
    }

    pub fn start(&self, id: &SessionId, action: StartAction) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::Start(action))
    }

    pub fn resume(&self, id: &SessionId) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::Resume)
    }

    pub fn step_into(&self, id: &SessionId) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::StepInto)
    }

    pub fn step_over(&self, id: &SessionId) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::StepOver)
    }

    pub fn step_out(&self, id: &SessionId) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::StepOut)
    }

    pub fn suspend(&self, id: &SessionId) -> DebuggerResult<()> {
        self.perform(id, &DebugAction::Suspend)
    }

    /// Run a control action. `suspend` needs a running session, every other
    /// action a suspended one; otherwise the call fails with a state
    /// conflict and the session is left as it was.
    pub fn perform(&self, id: &SessionId, action: &DebugAction) -> DebuggerResult<()> {
        let entry = self.entry(id)?;
        let _in_flight = entry.claim()?;
        let (previous, target) = {
            let mut state = entry.channel.state.lock();
            let previous = *state;
            let target = match (action, previous) {
                (_, SessionState::Disconnected) => {
                    return Err(DebuggerError::NotConnected(id.to_string()))
                }
                (DebugAction::Suspend, SessionState::Running) => SessionState::Suspended,
                (DebugAction::Suspend, _) => {
                    return Err(DebuggerError::StateConflict(format!(
                        "cannot suspend session {id}: it is not running"
                    )))
                }
                (_, SessionState::Suspended) => SessionState::Running,
                (_, _) => {
                    return Err(DebuggerError::StateConflict(format!(
                        "cannot {} session {id}: it is not suspended",
                        action.name()
                    )))
                }
            };
            *state = target;
            (previous, target)
        };
        debug!("session {id}: {}", action.name());

        let (result, actual) = {
            let mut debugger = entry.debugger.lock();
            let result = match action {
                DebugAction::Start(start) => debugger.start(start),
                DebugAction::Resume => debugger.resume(),
                DebugAction::StepInto => debugger.step_into(),
                DebugAction::StepOver => debugger.step_over(),
                DebugAction::StepOut => debugger.step_out(),
                DebugAction::Suspend => debugger.suspend(),
            };
            // A conflict reported by the engine means the session state is
            // stale, e.g. a SUSPEND delivered after the thread was resumed.
            let actual = match &result {
                Err(DebuggerError::StateConflict(_)) => match debugger.run_state() {
                    Ok(state) => Some(state),
                    Err(err) => {
                        debug!("session {id}: run state unavailable: {err}");
                        None
                    }
                },
                _ => None,
            };
            (result, actual)
        };
        if let Err(err) = &result {
            if err.is_connection_lost() {
                self.lost(&entry, err);
            } else {
                let mut state = entry.channel.state.lock();
                if let Some(actual) = actual {
                    if *state != SessionState::Disconnected {
                        *state = actual.into();
                        info!("session {id}: engine reports {:?}; state resynced", *state);
                    }
                } else if *state == target {
                    *state = previous;
                }
            }
        }
        result
    }

    pub fn thread_dumps(&self, id: &SessionId) -> DebuggerResult<Vec<ThreadDump>> {
        self.call(id, |debugger| debugger.thread_dumps())
    }

    pub fn stack_frame_dump(
        &self,
        id: &SessionId,
        frame: usize,
    ) -> DebuggerResult<StackFrameDump> {
        self.call(id, |debugger| debugger.stack_frame_dump(frame))
    }

    pub fn value(
        &self,
        id: &SessionId,
        path: &VariablePath,
        frame: usize,
    ) -> DebuggerResult<SimpleValue> {
        self.call(id, |debugger| debugger.value(path, frame))
    }

    pub fn set_value(
        &self,
        id: &SessionId,
        path: &VariablePath,
        value: &str,
        frame: usize,
    ) -> DebuggerResult<()> {
        self.call(id, |debugger| debugger.set_value(path, value, frame))
    }

    pub fn evaluate(
        &self,
        id: &SessionId,
        expression: &str,
        frame: usize,
    ) -> DebuggerResult<String> {
        self.call(id, |debugger| debugger.evaluate(expression, frame))
    }

    fn entry(&self, id: &SessionId) -> DebuggerResult<Arc<SessionEntry>> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DebuggerError::NotConnected(id.to_string()))
    }

    fn call<T>(
        &self,
        id: &SessionId,
        op: impl FnOnce(&mut dyn Debugger) -> DebuggerResult<T>,
    ) -> DebuggerResult<T> {
        let entry = self.entry(id)?;
        let _in_flight = entry.claim()?;
        let result = {
            let mut debugger = entry.debugger.lock();
            op(debugger.as_mut())
        };
        if let Err(err) = &result {
            if err.is_connection_lost() {
                self.lost(&entry, err);
            }
        }
        result
    }

    fn lost(&self, entry: &SessionEntry, err: &DebuggerError) {
        warn!("session {}: {err}", entry.session.id);
        entry.channel.raise(DebuggerEvent::Disconnect);
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("registry", &self.registry)
            .field("sessions", &self.sessions.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::DebuggerFactory;
    use crossbeam_channel::{bounded, Receiver, Sender};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tether_model::dto::DebuggerEventDto;
    use tether_model::DebuggerInfo;

    #[derive(Default)]
    struct Script {
        callback: Option<DebuggerCallback>,
        fail_next: Option<DebuggerError>,
        breakpoints: Vec<Breakpoint>,
        calls: Vec<&'static str>,
        run_state: Option<RunState>,
    }

    struct FakeFactory {
        initial: RunState,
        script: Arc<Mutex<Script>>,
        gate: Option<Receiver<()>>,
    }

    struct FakeDebugger {
        initial: RunState,
        script: Arc<Mutex<Script>>,
        gate: Option<Receiver<()>>,
    }

    impl FakeDebugger {
        fn run(&mut self, name: &'static str) -> DebuggerResult<()> {
            if let Some(gate) = &self.gate {
                let _ = gate.recv_timeout(Duration::from_secs(2));
            }
            let mut script = self.script.lock();
            script.calls.push(name);
            script.fail_next.take().map_or(Ok(()), Err)
        }
    }

    impl Debugger for FakeDebugger {
        fn info(&self) -> DebuggerInfo {
            DebuggerInfo {
                host: "localhost".into(),
                port: 8000,
                pid: Some(42),
                name: "fake".into(),
                version: "1.0".into(),
                file: None,
            }
        }

        fn run_state(&mut self) -> DebuggerResult<RunState> {
            Ok(self.script.lock().run_state.unwrap_or(self.initial))
        }

        fn disconnect(&mut self) -> DebuggerResult<()> {
            let callback = self.script.lock().callback.clone();
            if let Some(callback) = callback {
                callback(DebuggerEvent::Disconnect);
            }
            Ok(())
        }

        fn start(&mut self, _action: &StartAction) -> DebuggerResult<()> {
            self.run("start")
        }

        fn add_breakpoint(&mut self, breakpoint: &Breakpoint) -> DebuggerResult<()> {
            let mut script = self.script.lock();
            if !script.breakpoints.iter().any(|b| b.key() == breakpoint.key()) {
                script.breakpoints.push(breakpoint.clone());
            }
            Ok(())
        }

        fn delete_breakpoint(&mut self, location: &Location) -> DebuggerResult<()> {
            let key = location.key();
            self.script.lock().breakpoints.retain(|b| b.key() != key);
            Ok(())
        }

        fn delete_all_breakpoints(&mut self) -> DebuggerResult<()> {
            self.script.lock().breakpoints.clear();
            Ok(())
        }

        fn breakpoints(&mut self) -> DebuggerResult<Vec<Breakpoint>> {
            Ok(self.script.lock().breakpoints.clone())
        }

        fn suspend(&mut self) -> DebuggerResult<()> {
            self.run("suspend")
        }

        fn resume(&mut self) -> DebuggerResult<()> {
            self.run("resume")
        }

        fn step_into(&mut self) -> DebuggerResult<()> {
            self.run("step_into")
        }

        fn step_over(&mut self) -> DebuggerResult<()> {
            self.run("step_over")
        }

        fn step_out(&mut self) -> DebuggerResult<()> {
            self.run("step_out")
        }

        fn thread_dumps(&mut self) -> DebuggerResult<Vec<ThreadDump>> {
            let mut script = self.script.lock();
            script.calls.push("thread_dumps");
            script.fail_next.take().map_or(Ok(Vec::new()), Err)
        }

        fn value(&mut self, _path: &VariablePath, _frame: usize) -> DebuggerResult<SimpleValue> {
            let mut script = self.script.lock();
            script.fail_next.take().map_or(Ok(SimpleValue::leaf("42")), Err)
        }
    }

    impl DebuggerFactory for FakeFactory {
        fn kind(&self) -> &str {
            "fake"
        }

        fn connect(
            &self,
            _endpoint: &Endpoint,
            _options: &ConnectOptions,
            callback: DebuggerCallback,
        ) -> DebuggerResult<Box<dyn Debugger>> {
            self.script.lock().callback = Some(callback);
            Ok(Box::new(FakeDebugger {
                initial: self.initial,
                script: Arc::clone(&self.script),
                gate: self.gate.clone(),
            }))
        }
    }

    struct Harness {
        manager: Arc<SessionManager>,
        script: Arc<Mutex<Script>>,
        events: mpsc::Receiver<(SessionId, DebuggerEventDto)>,
    }

    impl Harness {
        fn new(initial: RunState, gate: Option<Receiver<()>>) -> Self {
            let script = Arc::new(Mutex::new(Script::default()));
            let mut registry = DebuggerRegistry::new();
            registry.register(Arc::new(FakeFactory {
                initial,
                script: Arc::clone(&script),
                gate,
            }));
            let dispatcher = EventDispatcher::new().unwrap();
            let (tx, events) = mpsc::channel();
            dispatcher.add_listener(Arc::new(
                move |session: &SessionId, event: &DebuggerEventDto| -> anyhow::Result<()> {
                    tx.send((session.clone(), event.clone()))?;
                    Ok(())
                },
            ));
            Self {
                manager: Arc::new(SessionManager::new(
                    registry,
                    dispatcher,
                    ConnectOptions::default(),
                )),
                script,
                events,
            }
        }

        fn connect(&self) -> SessionId {
            self.manager
                .connect("fake", &Endpoint::new("localhost", 8000))
                .unwrap()
                .id
        }

        fn raise(&self, event: DebuggerEvent) {
            let callback = self.script.lock().callback.clone().unwrap();
            callback(event);
        }

        fn fail_next(&self, err: DebuggerError) {
            self.script.lock().fail_next = Some(err);
        }

        fn next_event(&self) -> (SessionId, DebuggerEventDto) {
            self.events.recv_timeout(Duration::from_millis(250)).unwrap()
        }

        fn no_more_events(&self) -> bool {
            self.events.recv_timeout(Duration::from_millis(100)).is_err()
        }
    }

    fn suspend_at(line: i32) -> DebuggerEvent {
        DebuggerEvent::Suspend {
            location: Location::new("com.HelloWorld", line),
        }
    }

    #[test]
    fn connect_registers_exactly_one_session() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        let sessions = harness.manager.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].kind, "fake");
        assert_eq!(sessions[0].info.pid, Some(42));
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);

        let other = harness.connect();
        assert_ne!(id, other);
        assert_eq!(harness.manager.sessions().len(), 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let harness = Harness::new(RunState::Running, None);
        let err = harness
            .manager
            .connect("jdwp", &Endpoint::new("localhost", 8000))
            .unwrap_err();
        assert_eq!(err, DebuggerError::UnknownDebuggerType("jdwp".into()));
        assert!(harness.manager.sessions().is_empty());
    }

    #[test]
    fn resume_while_running_is_a_conflict_and_keeps_state() {
        let harness = Harness::new(RunState::Running, None);
        let id = harness.connect();
        let err = harness.manager.resume(&id).unwrap_err();
        assert!(matches!(err, DebuggerError::StateConflict(_)), "{err:?}");
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Running);
        assert!(harness.script.lock().calls.is_empty());
    }

    #[test]
    fn resume_and_suspend_events_drive_the_state_machine() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();

        harness.manager.resume(&id).unwrap();
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Running);

        harness.raise(suspend_at(24));
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
        let (session, event) = harness.next_event();
        assert_eq!(session, id);
        assert!(matches!(
            event,
            DebuggerEventDto::Suspend { ref location } if location.line_number == 24
        ));

        harness.manager.step_over(&id).unwrap();
        harness.manager.suspend(&id).unwrap();
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
        assert_eq!(
            harness.script.lock().calls,
            ["resume", "step_over", "suspend"]
        );
    }

    #[test]
    fn failed_action_restores_the_previous_state() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        harness.fail_next(DebuggerError::Internal("engine error".into()));
        assert!(harness.manager.step_into(&id).is_err());
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
    }

    #[test]
    fn engine_conflict_resyncs_a_stale_state() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        harness.manager.resume(&id).unwrap();
        // A stop reported before the resume is delivered after it.
        harness.raise(suspend_at(24));
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);

        harness.script.lock().run_state = Some(RunState::Running);
        harness.fail_next(DebuggerError::StateConflict("debuggee is not suspended".into()));
        let err = harness.manager.resume(&id).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Running);

        harness.manager.suspend(&id).unwrap();
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
        assert_eq!(harness.script.lock().calls, ["resume", "resume", "suspend"]);
    }

    #[test]
    fn concurrent_operation_fails_instead_of_queueing() {
        let (open, gate): (Sender<()>, Receiver<()>) = bounded(1);
        let harness = Harness::new(RunState::Suspended, Some(gate));
        let id = harness.connect();

        let background = {
            let manager = Arc::clone(&harness.manager);
            let id = id.clone();
            thread::spawn(move || manager.resume(&id))
        };
        thread::sleep(Duration::from_millis(50));

        let err = harness.manager.thread_dumps(&id).unwrap_err();
        assert_eq!(err, DebuggerError::OperationInFlight(id.to_string()));
        let err = harness.manager.suspend(&id).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);

        open.send(()).unwrap();
        background.join().unwrap().unwrap();
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Running);
    }

    #[test]
    fn lost_connection_disconnects_once() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        harness.fail_next(DebuggerError::ConnectionLost("reset by peer".into()));

        let err = harness.manager.thread_dumps(&id).unwrap_err();
        assert!(err.is_connection_lost());
        assert_eq!(harness.next_event(), (id.clone(), DebuggerEventDto::Disconnect));

        // The adapter noticing the same loss later must not publish again.
        harness.raise(DebuggerEvent::Disconnect);
        harness.raise(suspend_at(25));
        assert!(harness.no_more_events());

        assert!(harness.manager.sessions().is_empty());
        assert_eq!(
            harness.manager.resume(&id).unwrap_err(),
            DebuggerError::NotConnected(id.to_string())
        );
    }

    #[test]
    fn timeout_keeps_the_session() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        harness.fail_next(DebuggerError::Timeout {
            operation: "debug.value".into(),
            timeout_ms: 10,
        });
        let err = harness
            .manager
            .value(&id, &VariablePath::root("args"), 0)
            .unwrap_err();
        assert!(matches!(err, DebuggerError::Timeout { .. }));
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
        assert_eq!(
            harness
                .manager
                .value(&id, &VariablePath::root("args"), 0)
                .unwrap(),
            SimpleValue::leaf("42")
        );
        assert!(harness.no_more_events());
    }

    #[test]
    fn explicit_disconnect_publishes_one_event() {
        let harness = Harness::new(RunState::Running, None);
        let id = harness.connect();
        harness.manager.disconnect(&id).unwrap();

        assert_eq!(harness.next_event(), (id.clone(), DebuggerEventDto::Disconnect));
        assert!(harness.no_more_events());
        assert!(matches!(
            harness.manager.state(&id),
            Err(DebuggerError::NotConnected(_))
        ));
        assert!(matches!(
            harness.manager.disconnect(&id),
            Err(DebuggerError::NotConnected(_))
        ));
    }

    #[test]
    fn breakpoints_are_idempotent() {
        let harness = Harness::new(RunState::Running, None);
        let id = harness.connect();
        let breakpoint = Breakpoint::new(Location::new("com.HelloWorld", 24));
        for _ in 0..3 {
            harness.manager.add_breakpoint(&id, &breakpoint).unwrap();
        }
        assert_eq!(harness.manager.breakpoints(&id).unwrap(), [breakpoint]);

        harness
            .manager
            .delete_breakpoint(&id, &Location::new("com.HelloWorld", 99))
            .unwrap();
        harness.manager.delete_all_breakpoints(&id).unwrap();
        assert!(harness.manager.breakpoints(&id).unwrap().is_empty());
    }

    #[test]
    fn unsupported_capabilities_surface_immediately() {
        let harness = Harness::new(RunState::Suspended, None);
        let id = harness.connect();
        let err = harness.manager.evaluate(&id, "1 == 1", 0).unwrap_err();
        assert_eq!(err, DebuggerError::Unsupported("evaluate".into()));
        assert_eq!(harness.manager.state(&id).unwrap(), SessionState::Suspended);
    }
}
