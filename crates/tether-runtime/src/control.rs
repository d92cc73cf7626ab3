//! Debug control server.
//!
//! Requests and responses are single JSON lines:
//! `{"id":1,"type":"debug.resume","params":{}}` is answered with
//! `{"id":1,"ok":true,"result":{...}}` or
//! `{"id":1,"ok":false,"error":"...","kind":"state_conflict"}`.

mod transport;

use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use smol_str::SmolStr;
use tether_model::dto::{
    BreakpointDto, DebuggerEventDto, LocationDto, SimpleValueDto, StackFrameDumpDto,
    ThreadDumpDto,
};
use tether_model::{Breakpoint, Location, VariablePath};
use tracing::{debug, info};

use crate::debug::StepKind;
use crate::error::RuntimeError;
use crate::vm::{EventSubscription, Vm};

#[derive(Debug)]
pub(crate) struct ControlState {
    vm: Vm,
    clients: Mutex<FxHashMap<u64, TcpStream>>,
    next_client: AtomicU64,
    shutdown: AtomicBool,
}

impl ControlState {
    fn new(vm: Vm) -> Self {
        Self {
            vm,
            clients: Mutex::new(FxHashMap::default()),
            next_client: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Track a live connection so `shutdown` can close it.
    pub(crate) fn register_client(&self, stream: TcpStream) -> u64 {
        let id = self.next_client.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().insert(id, stream);
        id
    }

    pub(crate) fn unregister_client(&self, id: u64) {
        self.clients.lock().remove(&id);
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Per-connection state. A connection that asks for events gets its own
/// subscription, so every attached debugger sees every event.
#[derive(Debug, Default)]
pub(crate) struct ClientSession {
    events: Option<EventSubscription>,
}

impl ClientSession {
    fn events(&mut self, vm: &Vm) -> &EventSubscription {
        self.events.get_or_insert_with(|| vm.subscribe())
    }
}

/// TCP control endpoint for one engine. Each client connection is served by
/// its own thread.
#[derive(Debug)]
pub struct ControlServer {
    local_addr: SocketAddr,
    state: Arc<ControlState>,
}

impl ControlServer {
    /// Bind and start accepting clients.
    pub fn bind(vm: Vm, addr: impl ToSocketAddrs) -> Result<Self, RuntimeError> {
        let listener = TcpListener::bind(addr)
            .map_err(|err| RuntimeError::ControlError(format!("bind: {err}").into()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| RuntimeError::ControlError(format!("local addr: {err}").into()))?;
        let state = Arc::new(ControlState::new(vm));
        transport::spawn_control_server(listener, state.clone())?;
        info!("debug control listening on {local_addr}");
        Ok(Self { local_addr, state })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and drop every client connection.
    pub fn shutdown(&self) {
        if self.state.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        for (_, client) in self.state.clients.lock().drain() {
            let _ = client.shutdown(Shutdown::Both);
        }
        // Wake the accept loop so it observes the flag.
        let _ = TcpStream::connect(self.local_addr);
        info!("debug control on {} shut down", self.local_addr);
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    id: u64,
    #[serde(rename = "type")]
    r#type: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ControlResponse {
    id: u64,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl ControlResponse {
    fn ok(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
            kind: None,
        }
    }

    fn error(id: u64, error: &RuntimeError) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocationParams {
    location: LocationDto,
}

#[derive(Debug, Default, Deserialize)]
struct FrameParams {
    #[serde(default)]
    frame: usize,
}

#[derive(Debug, Deserialize)]
struct ValueParams {
    path: Vec<String>,
    #[serde(default)]
    frame: usize,
}

#[derive(Debug, Deserialize)]
struct SetValueParams {
    path: Vec<String>,
    value: String,
    #[serde(default)]
    frame: usize,
}

#[derive(Debug, Deserialize)]
struct EvaluateParams {
    expression: String,
    #[serde(default)]
    frame: usize,
}

pub(crate) fn handle_request_line(
    line: &str,
    state: &ControlState,
    session: &mut ClientSession,
) -> Option<String> {
    let response = match serde_json::from_str::<ControlRequest>(line) {
        Ok(request) => {
            debug!("control request id={} type={}", request.id, request.r#type);
            match dispatch(&request, &state.vm, session) {
                Ok(result) => ControlResponse::ok(request.id, result),
                Err(err) => {
                    debug!("control request {} failed: {err}", request.id);
                    ControlResponse::error(request.id, &err)
                }
            }
        }
        Err(err) => ControlResponse::error(
            0,
            &RuntimeError::InvalidRequest(SmolStr::new(err.to_string())),
        ),
    };
    serde_json::to_string(&response).ok()
}

fn params<T: DeserializeOwned>(request: &ControlRequest) -> Result<T, RuntimeError> {
    let value = request.params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value)
        .map_err(|err| RuntimeError::InvalidRequest(SmolStr::new(err.to_string())))
}

fn dispatch(
    request: &ControlRequest,
    vm: &Vm,
    session: &mut ClientSession,
) -> Result<serde_json::Value, RuntimeError> {
    match request.r#type.as_str() {
        "debug.info" => {
            let info = vm.info();
            Ok(json!({
                "name": info.name.as_str(),
                "version": info.version.as_str(),
                "pid": info.pid,
                "file": info.file.as_deref(),
            }))
        }
        "debug.state" => Ok(json!({
            "started": vm.control().is_started(),
            "suspended": vm.is_suspended(),
        })),
        "debug.subscribe" => {
            session.events(vm);
            Ok(json!({"status": "subscribed"}))
        }
        "debug.events" => {
            let events: Vec<DebuggerEventDto> = session
                .events(vm)
                .drain()
                .iter()
                .map(DebuggerEventDto::from)
                .collect();
            Ok(json!({ "events": events }))
        }
        "debug.start" => {
            vm.start()?;
            Ok(json!({"status": "running"}))
        }
        "breakpoints.add" => {
            let breakpoint: BreakpointDto = params(request)?;
            vm.add_breakpoint(Breakpoint::from(breakpoint))?;
            Ok(json!({"status": "added"}))
        }
        "breakpoints.delete" => {
            let LocationParams { location } = params(request)?;
            vm.delete_breakpoint(&Location::from(location));
            Ok(json!({"status": "deleted"}))
        }
        "breakpoints.clear" => {
            vm.delete_all_breakpoints();
            Ok(json!({"status": "cleared"}))
        }
        "breakpoints.list" => {
            let breakpoints: Vec<BreakpointDto> =
                vm.breakpoints().iter().map(BreakpointDto::from).collect();
            Ok(json!({ "breakpoints": breakpoints }))
        }
        "debug.suspend" => {
            vm.suspend()?;
            Ok(json!({"status": "suspended"}))
        }
        "debug.resume" => {
            vm.resume()?;
            Ok(json!({"status": "running"}))
        }
        "debug.step_into" => step(vm, StepKind::Into),
        "debug.step_over" => step(vm, StepKind::Over),
        "debug.step_out" => step(vm, StepKind::Out),
        "debug.threads" => {
            let threads: Vec<ThreadDumpDto> =
                vm.thread_dumps().iter().map(ThreadDumpDto::from).collect();
            Ok(json!({ "threads": threads }))
        }
        "debug.frame" => {
            let FrameParams { frame } = params(request)?;
            let dump = vm.stack_frame_dump(frame)?;
            to_json(&StackFrameDumpDto::from(&dump))
        }
        "debug.value" => {
            let ValueParams { path, frame } = params(request)?;
            let value = vm.value(&VariablePath::new(path), frame)?;
            to_json(&SimpleValueDto::from(&value))
        }
        "debug.set_value" => {
            let SetValueParams { path, value, frame } = params(request)?;
            vm.set_value(&VariablePath::new(path), &value, frame)?;
            Ok(json!({"status": "updated"}))
        }
        "debug.evaluate" => {
            let EvaluateParams { expression, frame } = params(request)?;
            let result = vm.evaluate(&expression, frame)?;
            Ok(json!({ "result": result }))
        }
        "debug.detach" => {
            vm.detach();
            Ok(json!({"status": "detached"}))
        }
        other => Err(RuntimeError::Unsupported(other.into())),
    }
}

fn step(vm: &Vm, kind: StepKind) -> Result<serde_json::Value, RuntimeError> {
    vm.step(kind)?;
    Ok(json!({"status": "stepping"}))
}

fn to_json(value: &impl Serialize) -> Result<serde_json::Value, RuntimeError> {
    serde_json::to_value(value)
        .map_err(|err| RuntimeError::ControlError(SmolStr::new(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{ClassDef, MethodDef};
    use crate::vm::VmInfo;
    use serde_json::Value;

    fn state() -> ControlState {
        let vm = Vm::new(VmInfo::new("tether-vm", "0.1.0").with_file("com.HelloWorld"));
        vm.define_class(ClassDef::new("com.HelloWorld").method(MethodDef::new("main", 20..=26)));
        ControlState::new(vm)
    }

    fn call(state: &ControlState, line: &str) -> Value {
        call_as(state, &mut ClientSession::default(), line)
    }

    fn call_as(state: &ControlState, session: &mut ClientSession, line: &str) -> Value {
        let response = handle_request_line(line, state, session).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn info_reports_engine_identity() {
        let state = state();
        let response = call(&state, r#"{"id":1,"type":"debug.info"}"#);
        assert_eq!(response["ok"], json!(true));
        assert_eq!(response["result"]["name"], json!("tether-vm"));
        assert_eq!(response["result"]["file"], json!("com.HelloWorld"));
    }

    #[test]
    fn errors_carry_a_kind() {
        let state = state();
        let response = call(&state, r#"{"id":2,"type":"debug.resume"}"#);
        assert_eq!(
            response,
            json!({
                "id": 2,
                "ok": false,
                "error": "debuggee is not suspended",
                "kind": "state_conflict",
            })
        );

        let response = call(&state, r#"{"id":3,"type":"debug.reboot"}"#);
        assert_eq!(response["kind"], json!("unsupported"));

        let response = call(&state, "not json");
        assert_eq!(response["id"], json!(0));
        assert_eq!(response["kind"], json!("invalid_request"));
    }

    #[test]
    fn breakpoints_roundtrip_through_requests() {
        let state = state();
        let add = r#"{"id":4,"type":"breakpoints.add","params":{"location":{"target":"com.HelloWorld","lineNumber":24}}}"#;
        assert_eq!(call(&state, add)["ok"], json!(true));
        assert_eq!(call(&state, add)["ok"], json!(true));

        let list = call(&state, r#"{"id":5,"type":"breakpoints.list"}"#);
        let breakpoints = list["result"]["breakpoints"].as_array().unwrap();
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(breakpoints[0]["location"]["lineNumber"], json!(24));

        let bad_line = r#"{"id":6,"type":"breakpoints.add","params":{"location":{"target":"com.HelloWorld","lineNumber":99}}}"#;
        assert_eq!(call(&state, bad_line)["kind"], json!("resolution"));

        let delete = r#"{"id":7,"type":"breakpoints.delete","params":{"location":{"target":"com.HelloWorld","lineNumber":24}}}"#;
        assert_eq!(call(&state, delete)["ok"], json!(true));
        assert_eq!(call(&state, delete)["ok"], json!(true));
        let list = call(&state, r#"{"id":8,"type":"breakpoints.list"}"#);
        assert_eq!(list["result"]["breakpoints"], json!([]));
    }

    #[test]
    fn value_queries_require_a_suspended_thread() {
        let state = state();
        let response = call(
            &state,
            r#"{"id":9,"type":"debug.value","params":{"path":["args"]}}"#,
        );
        assert_eq!(response["kind"], json!("state_conflict"));
    }

    #[test]
    fn each_subscribed_connection_gets_every_event() {
        let state = state();
        let mut first = ClientSession::default();
        let mut second = ClientSession::default();
        let subscribe = r#"{"id":10,"type":"debug.subscribe"}"#;
        assert_eq!(call_as(&state, &mut first, subscribe)["ok"], json!(true));
        assert_eq!(call_as(&state, &mut second, subscribe)["ok"], json!(true));

        state.vm.terminate();
        let poll = r#"{"id":11,"type":"debug.events"}"#;
        let disconnect = json!([{ "type": "DISCONNECT" }]);
        assert_eq!(call_as(&state, &mut first, poll)["result"]["events"], disconnect);
        assert_eq!(call_as(&state, &mut second, poll)["result"]["events"], disconnect);
        assert_eq!(call_as(&state, &mut first, poll)["result"]["events"], json!([]));

        let mut late = ClientSession::default();
        assert_eq!(call_as(&state, &mut late, poll)["result"]["events"], json!([]));
    }

    #[test]
    fn closed_clients_are_forgotten() {
        let state = state();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let id = state.register_client(stream);
        assert_eq!(state.clients.lock().len(), 1);
        state.unregister_client(id);
        assert!(state.clients.lock().is_empty());
    }
}
