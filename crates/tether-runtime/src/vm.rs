//! The reference engine: guest threads executing against a program model.
//!
//! Guest code is ordinary Rust driving a [`ThreadContext`]: it enters
//! methods, reports the line of each statement and stores locals. Every
//! reported line is a statement boundary where breakpoints, steps and
//! suspend requests take effect.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tether_model::{
    Breakpoint, DebuggerEvent, Field, Location, Method, SimpleValue, StackFrameDump, ThreadDump,
    ThreadStatus, Variable, VariablePath,
};
use tracing::{debug, info, warn};

use crate::debug::{BreakpointTable, ControlAction, DebugControl, StepKind, StopReason};
use crate::error::RuntimeError;
use crate::eval;
use crate::program::ClassDef;
use crate::value::{is_primitive_type, FieldSlot, ObjectValue, Value};

/// Engine identity reported to debugger clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInfo {
    pub name: SmolStr,
    pub version: SmolStr,
    pub pid: Option<u32>,
    /// Program entry (main class or source file), when known.
    pub file: Option<SmolStr>,
}

impl VmInfo {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, version: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            pid: Some(std::process::id()),
            file: None,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<SmolStr>) -> Self {
        self.file = Some(file.into());
        self
    }
}

#[derive(Debug, Clone)]
struct Local {
    type_name: SmolStr,
    value: Value,
}

#[derive(Debug, Clone)]
struct Frame {
    class: SmolStr,
    method: SmolStr,
    line: i32,
    params: Vec<SmolStr>,
    locals: IndexMap<SmolStr, Local>,
    this: Option<Value>,
}

#[derive(Debug)]
struct ThreadRecord {
    name: SmolStr,
    group: SmolStr,
    status: ThreadStatus,
    frames: Vec<Frame>,
}

#[derive(Debug, Default)]
struct VmState {
    classes: IndexMap<SmolStr, ClassDef>,
    loaded: FxHashSet<SmolStr>,
    threads: IndexMap<u64, ThreadRecord>,
    breakpoints: BreakpointTable,
    events: EventQueues,
}

/// One queue per subscriber; every raised event is appended to all of them.
#[derive(Debug, Default)]
struct EventQueues {
    next_id: u64,
    queues: FxHashMap<u64, VecDeque<DebuggerEvent>>,
}

impl EventQueues {
    fn subscribe(&mut self) -> u64 {
        self.next_id += 1;
        self.queues.insert(self.next_id, VecDeque::new());
        self.next_id
    }

    fn push(&mut self, event: DebuggerEvent) {
        for queue in self.queues.values_mut() {
            queue.push_back(event.clone());
        }
    }
}

/// Events raised after [`Vm::subscribe`], oldest first. Other subscribers
/// see the same events independently; dropping the handle unsubscribes.
#[derive(Debug)]
pub struct EventSubscription {
    vm: Vm,
    id: u64,
}

impl EventSubscription {
    /// Take the events raised since the previous call.
    #[must_use]
    pub fn drain(&self) -> Vec<DebuggerEvent> {
        self.vm
            .shared
            .state
            .lock()
            .events
            .queues
            .get_mut(&self.id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.vm.shared.state.lock().events.queues.remove(&self.id);
    }
}

#[derive(Debug)]
struct Shared {
    info: VmInfo,
    control: DebugControl,
    state: Mutex<VmState>,
    next_thread: AtomicU64,
}

/// Handle to a running engine. Clones share the same engine.
///
/// The engine state lock and the debug control lock are never held at the
/// same time.
#[derive(Debug, Clone)]
pub struct Vm {
    shared: Arc<Shared>,
}

impl Vm {
    /// Engine whose threads run as soon as they are spawned.
    #[must_use]
    pub fn new(info: VmInfo) -> Self {
        Self::with_control(info, DebugControl::new(false))
    }

    /// Engine that holds every thread until started or resumed.
    #[must_use]
    pub fn suspended_on_start(info: VmInfo) -> Self {
        Self::with_control(info, DebugControl::new(true))
    }

    fn with_control(info: VmInfo, control: DebugControl) -> Self {
        Self {
            shared: Arc::new(Shared {
                info,
                control,
                state: Mutex::new(VmState::default()),
                next_thread: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn info(&self) -> &VmInfo {
        &self.shared.info
    }

    #[must_use]
    pub fn control(&self) -> &DebugControl {
        &self.shared.control
    }

    pub fn define_class(&self, class: ClassDef) {
        let mut state = self.shared.state.lock();
        state.classes.insert(class.name.clone(), class);
    }

    /// Spawn a guest thread running `body`.
    pub fn spawn_thread<F>(
        &self,
        name: impl Into<SmolStr>,
        group: impl Into<SmolStr>,
        body: F,
    ) -> Result<JoinHandle<Result<(), RuntimeError>>, RuntimeError>
    where
        F: FnOnce(&mut ThreadContext) -> Result<(), RuntimeError> + Send + 'static,
    {
        let name = name.into();
        let id = self.shared.next_thread.fetch_add(1, Ordering::Relaxed);
        self.shared.state.lock().threads.insert(
            id,
            ThreadRecord {
                name: name.clone(),
                group: group.into(),
                status: ThreadStatus::NotStarted,
                frames: Vec::new(),
            },
        );
        let vm = self.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut ctx = ThreadContext {
                    vm: vm.clone(),
                    thread: id,
                };
                let result = vm.shared.control.await_start().and_then(|()| {
                    vm.set_status(id, ThreadStatus::Runnable);
                    body(&mut ctx)
                });
                vm.finish_thread(id);
                if let Err(err) = &result {
                    debug!("thread {id} ended with error: {err}");
                }
                result
            });
        spawned.map_err(|err| {
            self.finish_thread(id);
            RuntimeError::ThreadSpawn {
                name,
                reason: SmolStr::new(err.to_string()),
            }
        })
    }

    fn set_status(&self, thread: u64, status: ThreadStatus) {
        if let Some(record) = self.shared.state.lock().threads.get_mut(&thread) {
            record.status = status;
        }
    }

    fn finish_thread(&self, thread: u64) {
        self.shared.state.lock().threads.shift_remove(&thread);
        self.shared.control.thread_exited(thread);
        debug!("thread {thread} exited");
    }

    /// Request a breakpoint. Breakpoints on classes that are not loaded yet
    /// are deferred and activate when the class loads.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> Result<(), RuntimeError> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        let class = breakpoint.location.target.as_str();
        let line = breakpoint.location.line_number;
        if let Some(def) = state.classes.get(class) {
            if !def.has_code_at(line) {
                return Err(RuntimeError::NoCodeAtLine {
                    class: class.into(),
                    line,
                });
            }
        }
        let loaded = state.loaded.contains(class);
        let message = format!("{class}:{line}");
        if !state.breakpoints.insert(breakpoint.clone(), loaded) {
            return Ok(());
        }
        if loaded {
            info!("breakpoint activated at {message}");
            state
                .events
                .push(DebuggerEvent::BreakpointActivated { breakpoint });
        } else {
            debug!("breakpoint at {message} deferred until class load");
        }
        Ok(())
    }

    /// Remove the breakpoint at `location`; absent breakpoints are ignored.
    pub fn delete_breakpoint(&self, location: &Location) {
        if self
            .shared
            .state
            .lock()
            .breakpoints
            .remove(&location.key())
            .is_some()
        {
            debug!(
                "breakpoint removed at {}:{}",
                location.target, location.line_number
            );
        }
    }

    pub fn delete_all_breakpoints(&self) {
        self.shared.state.lock().breakpoints.clear();
    }

    #[must_use]
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.shared.state.lock().breakpoints.list()
    }

    pub fn start(&self) -> Result<(), RuntimeError> {
        self.shared.control.start()
    }

    pub fn suspend(&self) -> Result<(), RuntimeError> {
        self.shared.control.apply_action(ControlAction::Suspend)
    }

    pub fn resume(&self) -> Result<(), RuntimeError> {
        self.shared.control.apply_action(ControlAction::Resume)
    }

    pub fn step(&self, kind: StepKind) -> Result<(), RuntimeError> {
        self.shared.control.apply_action(ControlAction::Step(kind))
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.shared.control.is_suspended()
    }

    /// Forget all breakpoints and let the program run on.
    pub fn detach(&self) {
        self.delete_all_breakpoints();
        self.shared.control.detach();
        info!("debugger detached");
    }

    /// Stop the debuggee: every blocked or subsequent statement fails.
    pub fn terminate(&self) {
        self.shared.control.terminate();
        self.shared
            .state
            .lock()
            .events
            .push(DebuggerEvent::Disconnect);
        info!("debuggee terminated");
    }

    /// Start collecting events. Events raised before this call are not
    /// delivered to the new subscription.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        let id = self.shared.state.lock().events.subscribe();
        EventSubscription {
            vm: self.clone(),
            id,
        }
    }

    /// Dumps of all live threads in creation order.
    #[must_use]
    pub fn thread_dumps(&self) -> Vec<ThreadDump> {
        let suspended = self.shared.control.suspended_threads();
        let state = self.shared.state.lock();
        state
            .threads
            .iter()
            .map(|(id, record)| {
                if suspended.contains(id) {
                    let frames = record
                        .frames
                        .iter()
                        .rev()
                        .map(|frame| frame_dump(frame, statics_of(&state.classes, &frame.class)))
                        .collect();
                    ThreadDump::suspended(
                        record.name.as_str(),
                        record.group.as_str(),
                        ThreadStatus::Runnable,
                        frames,
                    )
                } else {
                    ThreadDump::running(record.name.as_str(), record.group.as_str(), record.status)
                }
            })
            .collect()
    }

    /// Dump of frame `frame` (0 = innermost) of the current thread.
    pub fn stack_frame_dump(&self, frame: usize) -> Result<StackFrameDump, RuntimeError> {
        let thread = self.current_thread()?;
        self.with_frame(thread, frame, |frame, statics| Ok(frame_dump(frame, statics)))
    }

    /// Value at `path` with one level of nested children.
    pub fn value(&self, path: &VariablePath, frame: usize) -> Result<SimpleValue, RuntimeError> {
        let thread = self.current_thread()?;
        self.with_frame(thread, frame, |frame, statics| {
            let (_, value) = resolve(frame, statics, path)?;
            let children = value
                .children()
                .into_iter()
                .map(|(name, type_name, child)| {
                    Variable::new(
                        name.as_str(),
                        type_name.as_str(),
                        is_primitive_type(&type_name),
                        path.child(name.as_str()),
                        SimpleValue::leaf(child.to_string()),
                    )
                })
                .collect();
            Ok(SimpleValue::compound(value.to_string(), children))
        })
    }

    /// Assign the value parsed from `text` to the variable at `path`.
    pub fn set_value(
        &self,
        path: &VariablePath,
        text: &str,
        frame: usize,
    ) -> Result<(), RuntimeError> {
        let thread = self.current_thread()?;
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        let record = state
            .threads
            .get_mut(&thread)
            .ok_or(RuntimeError::NotSuspended)?;
        let idx = frame_index(record.frames.len(), frame)?;
        let frame = &mut record.frames[idx];
        let mut no_statics = Vec::new();
        let statics = match state.classes.get_mut(frame.class.as_str()) {
            Some(class) => &mut class.statics,
            None => &mut no_statics,
        };
        let (type_name, slot) = resolve_mut(frame, statics, path)?;
        *slot = Value::parse_as(&type_name, text)?;
        debug!("set {path} = {slot}");
        Ok(())
    }

    /// Evaluate `expression` in frame `frame` of the current thread.
    pub fn evaluate(&self, expression: &str, frame: usize) -> Result<String, RuntimeError> {
        let expr = eval::parse(expression)?;
        let thread = self.current_thread()?;
        self.with_frame(thread, frame, |frame, statics| {
            let value = eval::evaluate(&expr, |path| {
                resolve(frame, statics, path).map(|(_, value)| value.clone())
            })?;
            Ok(value.to_string())
        })
    }

    fn current_thread(&self) -> Result<u64, RuntimeError> {
        self.shared
            .control
            .current_thread()
            .ok_or(RuntimeError::NotSuspended)
    }

    fn with_frame<T>(
        &self,
        thread: u64,
        frame: usize,
        f: impl FnOnce(&Frame, &[FieldSlot]) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let state = self.shared.state.lock();
        let record = state
            .threads
            .get(&thread)
            .ok_or(RuntimeError::NotSuspended)?;
        let frame = &record.frames[frame_index(record.frames.len(), frame)?];
        f(frame, statics_of(&state.classes, &frame.class))
    }

    fn condition_holds(&self, thread: u64, condition: &str) -> bool {
        let result = eval::parse(condition).and_then(|expr| {
            self.with_frame(thread, 0, |frame, statics| {
                eval::evaluate(&expr, |path| {
                    resolve(frame, statics, path).map(|(_, value)| value.clone())
                })
            })
        });
        match result {
            Ok(value) => value == Value::Boolean(true),
            Err(err) => {
                warn!("breakpoint condition '{condition}' failed: {err}");
                false
            }
        }
    }

    fn record_stop(&self, thread: u64, reason: StopReason) {
        let mut state = self.shared.state.lock();
        let location = state
            .threads
            .get(&thread)
            .and_then(|record| record.frames.last())
            .map(frame_location);
        let Some(location) = location else {
            return;
        };
        info!(
            "thread {thread} stopped ({reason:?}) at {}:{}",
            location.target, location.line_number
        );
        state.events.push(DebuggerEvent::Suspend { location });
    }

    fn enter(
        &self,
        thread: u64,
        class: &str,
        method: &str,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> Result<(), RuntimeError> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        let def = state
            .classes
            .get(class)
            .ok_or_else(|| RuntimeError::UndefinedClass(class.into()))?;
        let method_def =
            def.find_method(method)
                .ok_or_else(|| RuntimeError::UndefinedMethod {
                    class: class.into(),
                    method: method.into(),
                })?;
        if method_def.params.len() != args.len() {
            return Err(RuntimeError::InvalidArgumentCount {
                method: method.into(),
                expected: method_def.params.len(),
                got: args.len(),
            });
        }
        let locals = method_def
            .params
            .iter()
            .zip(args)
            .map(|(param, value)| {
                (
                    param.name.clone(),
                    Local {
                        type_name: param.type_name.clone(),
                        value,
                    },
                )
            })
            .collect();
        let frame = Frame {
            class: def.name.clone(),
            method: method_def.name.clone(),
            line: *method_def.lines.start(),
            params: method_def.params.iter().map(|p| p.name.clone()).collect(),
            locals,
            this,
        };
        if state.loaded.insert(frame.class.clone()) {
            debug!("class {class} loaded");
            for breakpoint in state.breakpoints.activate_class(class) {
                info!(
                    "breakpoint activated at {}:{}",
                    breakpoint.location.target, breakpoint.location.line_number
                );
                state
                    .events
                    .push(DebuggerEvent::BreakpointActivated { breakpoint });
            }
        }
        let record = state
            .threads
            .get_mut(&thread)
            .ok_or(RuntimeError::Terminated)?;
        record.frames.push(frame);
        Ok(())
    }

    fn leave(&self, thread: u64) {
        if let Some(record) = self.shared.state.lock().threads.get_mut(&thread) {
            record.frames.pop();
        }
    }
}

/// Execution context of one guest thread.
#[derive(Debug)]
pub struct ThreadContext {
    vm: Vm,
    thread: u64,
}

impl ThreadContext {
    #[must_use]
    pub fn thread_id(&self) -> u64 {
        self.thread
    }

    /// Call a static method. The class loads on its first invocation.
    pub fn invoke<T>(
        &mut self,
        class: &str,
        method: &str,
        args: Vec<Value>,
        body: impl FnOnce(&mut ThreadContext) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        self.vm.enter(self.thread, class, method, args, None)?;
        let result = body(self);
        self.vm.leave(self.thread);
        result
    }

    /// Call an instance method on `this`.
    pub fn invoke_on<T>(
        &mut self,
        this: ObjectValue,
        method: &str,
        args: Vec<Value>,
        body: impl FnOnce(&mut ThreadContext) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let class = this.class.clone();
        self.vm
            .enter(self.thread, &class, method, args, Some(Value::Object(this)))?;
        let result = body(self);
        self.vm.leave(self.thread);
        result
    }

    /// Statement boundary at `line` of the current method.
    pub fn line(&mut self, line: i32) -> Result<(), RuntimeError> {
        let (hit, depth) = {
            let mut guard = self.vm.shared.state.lock();
            let state = &mut *guard;
            let record = state
                .threads
                .get_mut(&self.thread)
                .ok_or(RuntimeError::Terminated)?;
            let depth = record.frames.len();
            let frame = record.frames.last_mut().ok_or(RuntimeError::NoActiveFrame)?;
            frame.line = line;
            (state.breakpoints.matching(&frame.class, line).cloned(), depth)
        };
        let breakpoint_hit = match hit {
            Some(breakpoint) => match &breakpoint.condition {
                Some(condition) => self.vm.condition_holds(self.thread, condition),
                None => true,
            },
            None => false,
        };
        let vm = &self.vm;
        let thread = self.thread;
        vm.shared
            .control
            .on_statement(thread, depth, breakpoint_hit, |reason| {
                vm.record_stop(thread, reason);
            })
    }

    /// Store a local of the current frame.
    pub fn set_local(
        &mut self,
        name: impl Into<SmolStr>,
        type_name: impl Into<SmolStr>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let mut state = self.vm.shared.state.lock();
        let frame = state
            .threads
            .get_mut(&self.thread)
            .and_then(|record| record.frames.last_mut())
            .ok_or(RuntimeError::NoActiveFrame)?;
        frame.locals.insert(
            name.into(),
            Local {
                type_name: type_name.into(),
                value,
            },
        );
        Ok(())
    }

    /// Current value of a local (or argument) of the current frame.
    #[must_use]
    pub fn local(&self, name: &str) -> Option<Value> {
        let state = self.vm.shared.state.lock();
        state
            .threads
            .get(&self.thread)
            .and_then(|record| record.frames.last())
            .and_then(|frame| frame.locals.get(name))
            .map(|local| local.value.clone())
    }

    /// Sleep outside of any statement boundary.
    pub fn sleep(&mut self, duration: Duration) -> Result<(), RuntimeError> {
        self.vm.set_status(self.thread, ThreadStatus::Sleeping);
        thread::sleep(duration);
        self.vm.set_status(self.thread, ThreadStatus::Runnable);
        if self.vm.shared.control.is_terminated() {
            return Err(RuntimeError::Terminated);
        }
        Ok(())
    }
}

fn frame_index(len: usize, frame: usize) -> Result<usize, RuntimeError> {
    len.checked_sub(1)
        .and_then(|top| top.checked_sub(frame))
        .ok_or(RuntimeError::NoSuchFrame(frame))
}

fn statics_of<'a>(classes: &'a IndexMap<SmolStr, ClassDef>, class: &str) -> &'a [FieldSlot] {
    classes
        .get(class)
        .map_or(&[][..], |class| class.statics.as_slice())
}

fn variable(name: &str, type_name: &str, value: &Value) -> Variable {
    Variable::new(
        name,
        type_name,
        is_primitive_type(type_name),
        VariablePath::root(name),
        SimpleValue::leaf(value.to_string()),
    )
}

fn frame_location(frame: &Frame) -> Location {
    let arguments = frame
        .params
        .iter()
        .filter_map(|name| {
            frame
                .locals
                .get(name)
                .map(|local| variable(name, &local.type_name, &local.value))
        })
        .collect();
    Location::new(frame.class.as_str(), frame.line)
        .with_method(Method::new(frame.method.as_str(), arguments))
}

fn frame_dump(frame: &Frame, statics: &[FieldSlot]) -> StackFrameDump {
    let variables = frame
        .locals
        .iter()
        .map(|(name, local)| variable(name, &local.type_name, &local.value))
        .collect();
    let instance_fields: &[FieldSlot] = match &frame.this {
        Some(Value::Object(object)) => object.fields.as_slice(),
        _ => &[],
    };
    let fields = instance_fields
        .iter()
        .chain(statics)
        .map(|slot| {
            let modifiers = slot.decl.modifiers;
            Field {
                variable: variable(&slot.decl.name, &slot.decl.type_name, &slot.value),
                is_final: modifiers.is_final,
                is_static: modifiers.is_static,
                is_transient: modifiers.is_transient,
                is_volatile: modifiers.is_volatile,
            }
        })
        .collect();
    StackFrameDump {
        location: frame_location(frame),
        variables,
        fields,
    }
}

fn resolve<'a>(
    frame: &'a Frame,
    statics: &'a [FieldSlot],
    path: &VariablePath,
) -> Result<(SmolStr, &'a Value), RuntimeError> {
    let undefined = || RuntimeError::UndefinedVariable(SmolStr::new(path.to_string()));
    let (root, rest) = path.segments().split_first().ok_or_else(undefined)?;
    let (mut type_name, mut value) = lookup(frame, statics, root).ok_or_else(undefined)?;
    for segment in rest {
        (type_name, value) = value.child(segment).ok_or_else(undefined)?;
    }
    Ok((type_name, value))
}

fn lookup<'a>(
    frame: &'a Frame,
    statics: &'a [FieldSlot],
    root: &str,
) -> Option<(SmolStr, &'a Value)> {
    if let Some(local) = frame.locals.get(root) {
        return Some((local.type_name.clone(), &local.value));
    }
    if root == "this" {
        return frame.this.as_ref().map(|this| (frame.class.clone(), this));
    }
    if let Some(Value::Object(object)) = &frame.this {
        if let Some(slot) = object.field(root) {
            return Some((slot.decl.type_name.clone(), &slot.value));
        }
    }
    statics
        .iter()
        .find(|slot| slot.decl.name == root)
        .map(|slot| (slot.decl.type_name.clone(), &slot.value))
}

fn resolve_mut<'a>(
    frame: &'a mut Frame,
    statics: &'a mut [FieldSlot],
    path: &VariablePath,
) -> Result<(SmolStr, &'a mut Value), RuntimeError> {
    let undefined = || RuntimeError::UndefinedVariable(SmolStr::new(path.to_string()));
    let (root, rest) = path.segments().split_first().ok_or_else(undefined)?;
    let (mut type_name, mut value) = lookup_mut(frame, statics, root).ok_or_else(undefined)?;
    for segment in rest {
        value = match value.child_mut(segment) {
            Some((child_type, child)) => {
                type_name = child_type;
                child
            }
            None => return Err(undefined()),
        };
    }
    Ok((type_name, value))
}

fn lookup_mut<'a>(
    frame: &'a mut Frame,
    statics: &'a mut [FieldSlot],
    root: &str,
) -> Option<(SmolStr, &'a mut Value)> {
    if frame.locals.contains_key(root) {
        return frame
            .locals
            .get_mut(root)
            .map(|local| (local.type_name.clone(), &mut local.value));
    }
    if root == "this" {
        let class = frame.class.clone();
        return frame.this.as_mut().map(|this| (class, this));
    }
    let is_instance_field = matches!(&frame.this, Some(Value::Object(object)) if object.field(root).is_some());
    if is_instance_field {
        if let Some(Value::Object(object)) = frame.this.as_mut() {
            return object
                .field_mut(root)
                .map(|slot| (slot.decl.type_name.clone(), &mut slot.value));
        }
    }
    statics
        .iter_mut()
        .find(|slot| slot.decl.name == root)
        .map(|slot| (slot.decl.type_name.clone(), &mut slot.value))
}
