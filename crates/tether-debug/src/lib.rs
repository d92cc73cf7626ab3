//! Debug sessions over pluggable debug engines.
//!
//! A [`SessionManager`] owns one adapter per live session and enforces the
//! session state machine. Adapters raise events through a callback; the
//! [`EventDispatcher`] serializes them and fans them out to listeners in
//! order. [`command`] maps inbound client requests onto the manager.

pub mod command;
pub mod config;
pub mod debugger;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod locator;
pub mod remote;
pub mod session;

pub use config::{ConfigError, DebugConfig};
pub use debugger::{
    ConnectOptions, Debugger, DebuggerCallback, DebuggerFactory, DebuggerRegistry, Endpoint,
    RunState,
};
pub use dispatcher::{DebuggerEventListener, EventDispatcher};
pub use error::{DebuggerError, DebuggerResult, ErrorKind};
pub use remote::{RemoteDebugger, RemoteDebuggerFactory, REMOTE_KIND};
pub use session::{SessionManager, SessionState};
