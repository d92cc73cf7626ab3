//! tether-runtime: a small in-process debuggee.
//!
//! Guest threads run ordinary Rust closures against a class/method model and
//! report statement boundaries to the debug control. A [`ControlServer`]
//! exposes breakpoints, run control, thread dumps and value inspection to
//! remote debugger clients over JSON lines.

pub mod control;
pub mod debug;
pub mod error;
mod eval;
pub mod program;
pub mod value;
mod vm;

pub use control::ControlServer;
pub use error::RuntimeError;
pub use vm::{EventSubscription, ThreadContext, Vm, VmInfo};
