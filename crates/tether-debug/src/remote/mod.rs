//! Adapter for tether debug agents.
//!
//! The agent speaks JSON lines over TCP (`{"id","type","params"}` answered by
//! `{"id","ok","result"|"error","kind"}`). Requests go over one connection;
//! a second connection subscribes to the agent's events, polls them and
//! feeds the session callback.

mod client;
mod poller;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tether_model::dto::{
    BreakpointDto, LocationDto, SimpleValueDto, StackFrameDumpDto, ThreadDumpDto,
};
use tether_model::{
    Breakpoint, DebuggerEvent, DebuggerInfo, Location, SimpleValue, StackFrameDump, StartAction,
    ThreadDump, VariablePath,
};
use tracing::{debug, info};

use crate::debugger::{
    ConnectOptions, Debugger, DebuggerCallback, DebuggerFactory, Endpoint, RunState,
};
use crate::error::{DebuggerError, DebuggerResult};
use crate::locator::{NoopLocator, ResourceLocator};

use client::ControlClient;
use poller::EventPoller;

/// Debugger-kind tag of [`RemoteDebugger`].
pub const REMOTE_KIND: &str = "tether";

pub struct RemoteDebuggerFactory {
    locator: Arc<dyn ResourceLocator>,
}

impl RemoteDebuggerFactory {
    #[must_use]
    pub fn new(locator: Arc<dyn ResourceLocator>) -> Self {
        Self { locator }
    }
}

impl Default for RemoteDebuggerFactory {
    fn default() -> Self {
        Self::new(Arc::new(NoopLocator))
    }
}

impl fmt::Debug for RemoteDebuggerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDebuggerFactory").finish_non_exhaustive()
    }
}

impl DebuggerFactory for RemoteDebuggerFactory {
    fn kind(&self) -> &str {
        REMOTE_KIND
    }

    fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ConnectOptions,
        callback: DebuggerCallback,
    ) -> DebuggerResult<Box<dyn Debugger>> {
        let debugger =
            RemoteDebugger::connect(endpoint, options, Arc::clone(&self.locator), callback)?;
        Ok(Box::new(debugger))
    }
}

#[derive(Debug, Deserialize)]
struct AgentInfo {
    name: String,
    version: String,
    pid: Option<u32>,
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentState {
    #[serde(default)]
    suspended: bool,
}

#[derive(Debug, Deserialize)]
struct BreakpointsResult {
    breakpoints: Vec<BreakpointDto>,
}

#[derive(Debug, Deserialize)]
struct ThreadsResult {
    threads: Vec<ThreadDumpDto>,
}

#[derive(Debug, Deserialize)]
struct EvaluateResult {
    result: String,
}

pub struct RemoteDebugger {
    info: DebuggerInfo,
    client: ControlClient,
    poller: Option<EventPoller>,
    locator: Arc<dyn ResourceLocator>,
    callback: DebuggerCallback,
}

impl RemoteDebugger {
    pub fn connect(
        endpoint: &Endpoint,
        options: &ConnectOptions,
        locator: Arc<dyn ResourceLocator>,
        callback: DebuggerCallback,
    ) -> DebuggerResult<Self> {
        let mut client = ControlClient::connect(endpoint, options)?;
        let agent: AgentInfo = client.call("debug.info", None)?;
        let info = DebuggerInfo {
            host: endpoint.host.clone(),
            port: endpoint.port,
            pid: agent.pid,
            name: agent.name,
            version: agent.version,
            file: agent.file,
        };
        let events = ControlClient::connect(endpoint, options)?;
        let poller = EventPoller::spawn(
            events,
            options.event_poll_interval,
            Arc::clone(&locator),
            Arc::clone(&callback),
        )?;
        info!("connected to {} {} at {endpoint}", info.name, info.version);
        Ok(Self {
            info,
            client,
            poller: Some(poller),
            locator,
            callback,
        })
    }

    fn status(&mut self, kind: &str, params: Option<Value>) -> DebuggerResult<()> {
        self.client.request(kind, params).map(|_| ())
    }

    fn enrich(&self, location: Location) -> Location {
        self.locator.enrich(location)
    }

    fn enrich_frame(&self, mut frame: StackFrameDump) -> StackFrameDump {
        frame.location = self.enrich(frame.location);
        frame
    }
}

impl fmt::Debug for RemoteDebugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDebugger")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Debugger for RemoteDebugger {
    fn info(&self) -> DebuggerInfo {
        self.info.clone()
    }

    fn run_state(&mut self) -> DebuggerResult<RunState> {
        let state: AgentState = self.client.call("debug.state", None)?;
        Ok(if state.suspended {
            RunState::Suspended
        } else {
            RunState::Running
        })
    }

    fn disconnect(&mut self) -> DebuggerResult<()> {
        let detached = self.status("debug.detach", None);
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        (self.callback)(DebuggerEvent::Disconnect);
        match detached {
            Err(err) if err.is_connection_lost() => {
                debug!("agent already gone on disconnect: {err}");
                Ok(())
            }
            other => other,
        }
    }

    fn start(&mut self, action: &StartAction) -> DebuggerResult<()> {
        for breakpoint in &action.breakpoints {
            self.add_breakpoint(breakpoint)?;
        }
        self.status("debug.start", None)
    }

    fn add_breakpoint(&mut self, breakpoint: &Breakpoint) -> DebuggerResult<()> {
        let params = serde_json::to_value(BreakpointDto::from(breakpoint))
            .map_err(|err| DebuggerError::Internal(err.to_string()))?;
        self.status("breakpoints.add", Some(params))
    }

    fn delete_breakpoint(&mut self, location: &Location) -> DebuggerResult<()> {
        let params = json!({ "location": LocationDto::from(location) });
        self.status("breakpoints.delete", Some(params))
    }

    fn delete_all_breakpoints(&mut self) -> DebuggerResult<()> {
        self.status("breakpoints.clear", None)
    }

    fn breakpoints(&mut self) -> DebuggerResult<Vec<Breakpoint>> {
        let result: BreakpointsResult = self.client.call("breakpoints.list", None)?;
        Ok(result
            .breakpoints
            .into_iter()
            .map(|dto| {
                let mut breakpoint = Breakpoint::from(dto);
                breakpoint.location = self.enrich(breakpoint.location);
                breakpoint
            })
            .collect())
    }

    fn suspend(&mut self) -> DebuggerResult<()> {
        self.status("debug.suspend", None)
    }

    fn resume(&mut self) -> DebuggerResult<()> {
        self.status("debug.resume", None)
    }

    fn step_into(&mut self) -> DebuggerResult<()> {
        self.status("debug.step_into", None)
    }

    fn step_over(&mut self) -> DebuggerResult<()> {
        self.status("debug.step_over", None)
    }

    fn step_out(&mut self) -> DebuggerResult<()> {
        self.status("debug.step_out", None)
    }

    fn thread_dumps(&mut self) -> DebuggerResult<Vec<ThreadDump>> {
        let result: ThreadsResult = self.client.call("debug.threads", None)?;
        Ok(result
            .threads
            .into_iter()
            .map(|dto| {
                let mut dump = ThreadDump::from(dto);
                dump.frames = dump
                    .frames
                    .into_iter()
                    .map(|frame| self.enrich_frame(frame))
                    .collect();
                dump
            })
            .collect())
    }

    fn value(&mut self, path: &VariablePath, frame: usize) -> DebuggerResult<SimpleValue> {
        let params = json!({ "path": path.segments(), "frame": frame });
        let value: SimpleValueDto = self.client.call("debug.value", Some(params))?;
        Ok(value.into())
    }

    fn stack_frame_dump(&mut self, frame: usize) -> DebuggerResult<StackFrameDump> {
        let dump: StackFrameDumpDto = self
            .client
            .call("debug.frame", Some(json!({ "frame": frame })))?;
        Ok(self.enrich_frame(dump.into()))
    }

    fn set_value(&mut self, path: &VariablePath, value: &str, frame: usize) -> DebuggerResult<()> {
        let params = json!({ "path": path.segments(), "value": value, "frame": frame });
        self.status("debug.set_value", Some(params))
    }

    fn evaluate(&mut self, expression: &str, frame: usize) -> DebuggerResult<String> {
        let params = json!({ "expression": expression, "frame": frame });
        let result: EvaluateResult = self.client.call("debug.evaluate", Some(params))?;
        Ok(result.result)
    }
}

/// Map the engine-native targets of an event to project resources.
pub(crate) fn enrich_event(locator: &dyn ResourceLocator, event: DebuggerEvent) -> DebuggerEvent {
    match event {
        DebuggerEvent::Suspend { location } => DebuggerEvent::Suspend {
            location: locator.enrich(location),
        },
        DebuggerEvent::BreakpointActivated { mut breakpoint } => {
            breakpoint.location = locator.enrich(breakpoint.location);
            DebuggerEvent::BreakpointActivated { breakpoint }
        }
        DebuggerEvent::Disconnect => DebuggerEvent::Disconnect,
    }
}
