//! Debug engine adapter contract and backend registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tether_model::{
    Breakpoint, DebuggerEvent, DebuggerInfo, Location, SimpleValue, StackFrameDump, StartAction,
    ThreadDump, VariablePath,
};

use crate::error::{DebuggerError, DebuggerResult};

/// Execution state of the debuggee as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Suspended,
}

/// Receives events the engine raises outside of a direct request. Must not
/// block.
pub type DebuggerCallback = Arc<dyn Fn(DebuggerEvent) + Send + Sync>;

/// One connection to one debuggee.
///
/// Every read is a point-in-time snapshot: nothing guarantees the debuggee
/// stays in that state once the call returns unless it is suspended and no
/// run-control action was issued since.
pub trait Debugger: Send {
    fn info(&self) -> DebuggerInfo;

    fn run_state(&mut self) -> DebuggerResult<RunState>;

    /// Detach from the debuggee and release the connection.
    fn disconnect(&mut self) -> DebuggerResult<()>;

    /// Install `action.breakpoints` and let a debuggee launched suspended run.
    fn start(&mut self, action: &StartAction) -> DebuggerResult<()>;

    /// Adding a breakpoint at an already registered location has no effect.
    fn add_breakpoint(&mut self, breakpoint: &Breakpoint) -> DebuggerResult<()>;

    /// Deleting an unknown location is a no-op.
    fn delete_breakpoint(&mut self, location: &Location) -> DebuggerResult<()>;

    fn delete_all_breakpoints(&mut self) -> DebuggerResult<()>;

    fn breakpoints(&mut self) -> DebuggerResult<Vec<Breakpoint>>;

    fn suspend(&mut self) -> DebuggerResult<()>;

    fn resume(&mut self) -> DebuggerResult<()>;

    fn step_into(&mut self) -> DebuggerResult<()>;

    fn step_over(&mut self) -> DebuggerResult<()>;

    fn step_out(&mut self) -> DebuggerResult<()>;

    /// Every known thread; only suspended ones carry frames.
    fn thread_dumps(&mut self) -> DebuggerResult<Vec<ThreadDump>>;

    fn value(&mut self, path: &VariablePath, frame: usize) -> DebuggerResult<SimpleValue>;

    fn stack_frame_dump(&mut self, frame: usize) -> DebuggerResult<StackFrameDump> {
        let _ = frame;
        Err(DebuggerError::Unsupported("stack frame dump".into()))
    }

    fn set_value(&mut self, path: &VariablePath, value: &str, frame: usize) -> DebuggerResult<()> {
        let _ = (path, value, frame);
        Err(DebuggerError::Unsupported("set value".into()))
    }

    fn evaluate(&mut self, expression: &str, frame: usize) -> DebuggerResult<String> {
        let _ = (expression, frame);
        Err(DebuggerError::Unsupported("evaluate".into()))
    }
}

/// Network address of a debug agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, optionally prefixed with `tcp://`.
    pub fn parse(text: &str) -> DebuggerResult<Self> {
        let rest = text.strip_prefix("tcp://").unwrap_or(text);
        let (host, port) = rest.rsplit_once(':').ok_or_else(|| {
            DebuggerError::InvalidRequest(format!("endpoint '{text}' has no port"))
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(DebuggerError::InvalidRequest(format!(
                "endpoint '{text}' has no host"
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|err| DebuggerError::InvalidRequest(format!("endpoint '{text}': {err}")))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Timeouts handed to adapters when they connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub event_poll_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            event_poll_interval: Duration::from_millis(50),
        }
    }
}

/// Creates adapters of one backend kind.
pub trait DebuggerFactory: Send + Sync {
    /// Debugger-kind tag, e.g. `"tether"`.
    fn kind(&self) -> &str;

    fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ConnectOptions,
        callback: DebuggerCallback,
    ) -> DebuggerResult<Box<dyn Debugger>>;
}

/// Backends available to the session manager, registered by the
/// composition root.
#[derive(Default, Clone)]
pub struct DebuggerRegistry {
    factories: HashMap<String, Arc<dyn DebuggerFactory>>,
}

impl DebuggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its kind, replacing any previous one.
    pub fn register(&mut self, factory: Arc<dyn DebuggerFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn get(&self, kind: &str) -> DebuggerResult<Arc<dyn DebuggerFactory>> {
        self.factories
            .get(kind)
            .cloned()
            .ok_or_else(|| DebuggerError::UnknownDebuggerType(kind.to_string()))
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for DebuggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
