//! Inbound client commands.
//!
//! One JSON object per line, `{"id": 7, "command": "getThreadDumps",
//! "session": "1"}`, answered with `{"id": 7, "ok": true, "result": ...}` or
//! `{"id": 7, "ok": false, "error": {"kind": "...", "message": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_model::dto::{
    ActionDto, BreakpointDto, DebugSessionDto, LocationDto, SimpleValueDto, StackFrameDumpDto,
    ThreadDumpDto, VariablePathDto,
};
use tether_model::{DebugAction, SessionId, VariablePath};
use tracing::debug;

use crate::debugger::Endpoint;
use crate::error::{DebuggerError, DebuggerResult, ErrorKind};
use crate::session::{SessionManager, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    Connect {
        #[serde(rename = "type")]
        kind: String,
        endpoint: String,
    },
    Disconnect {
        session: SessionId,
    },
    Sessions,
    AddBreakpoint {
        session: SessionId,
        breakpoint: BreakpointDto,
    },
    DeleteBreakpoint {
        session: SessionId,
        location: LocationDto,
    },
    DeleteAllBreakpoints {
        session: SessionId,
    },
    GetBreakpoints {
        session: SessionId,
    },
    Action {
        session: SessionId,
        action: ActionDto,
    },
    GetThreadDumps {
        session: SessionId,
    },
    GetStackFrameDump {
        session: SessionId,
        #[serde(default)]
        frame: usize,
    },
    GetValue {
        session: SessionId,
        variable_path: VariablePathDto,
        #[serde(default)]
        frame: usize,
    },
    SetValue {
        session: SessionId,
        variable_path: VariablePathDto,
        value: String,
        #[serde(default)]
        frame: usize,
    },
    Evaluate {
        session: SessionId,
        expression: String,
        #[serde(default)]
        frame: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRequest {
    pub id: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFailure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandFailure>,
}

impl CommandResponse {
    fn ok(id: u64, result: Option<Value>) -> Self {
        Self {
            id,
            ok: true,
            result,
            error: None,
        }
    }

    fn error(id: u64, error: &DebuggerError) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(CommandFailure {
                kind: error.kind(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    #[serde(flatten)]
    session: DebugSessionDto,
    state: SessionState,
}

/// Run one command. Commands without a result yield `None`.
pub fn execute(manager: &SessionManager, command: Command) -> DebuggerResult<Option<Value>> {
    match command {
        Command::Connect { kind, endpoint } => {
            let endpoint = Endpoint::parse(&endpoint)?;
            let session = manager.connect(&kind, &endpoint)?;
            to_json(&DebugSessionDto::from(&session))
        }
        Command::Disconnect { session } => manager.disconnect(&session).map(|()| None),
        Command::Sessions => {
            let summaries: Vec<SessionSummary> = manager
                .sessions()
                .iter()
                .filter_map(|session| {
                    let state = manager.state(&session.id).ok()?;
                    Some(SessionSummary {
                        session: DebugSessionDto::from(session),
                        state,
                    })
                })
                .collect();
            to_json(&summaries)
        }
        Command::AddBreakpoint {
            session,
            breakpoint,
        } => manager
            .add_breakpoint(&session, &breakpoint.into())
            .map(|()| None),
        Command::DeleteBreakpoint { session, location } => manager
            .delete_breakpoint(&session, &location.into())
            .map(|()| None),
        Command::DeleteAllBreakpoints { session } => {
            manager.delete_all_breakpoints(&session).map(|()| None)
        }
        Command::GetBreakpoints { session } => {
            let breakpoints: Vec<BreakpointDto> = manager
                .breakpoints(&session)?
                .iter()
                .map(BreakpointDto::from)
                .collect();
            to_json(&breakpoints)
        }
        Command::Action { session, action } => manager
            .perform(&session, &DebugAction::from(action))
            .map(|()| None),
        Command::GetThreadDumps { session } => {
            let dumps: Vec<ThreadDumpDto> = manager
                .thread_dumps(&session)?
                .iter()
                .map(ThreadDumpDto::from)
                .collect();
            to_json(&dumps)
        }
        Command::GetStackFrameDump { session, frame } => {
            let dump = manager.stack_frame_dump(&session, frame)?;
            to_json(&StackFrameDumpDto::from(&dump))
        }
        Command::GetValue {
            session,
            variable_path,
            frame,
        } => {
            let value = manager.value(&session, &VariablePath::from(variable_path), frame)?;
            to_json(&SimpleValueDto::from(&value))
        }
        Command::SetValue {
            session,
            variable_path,
            value,
            frame,
        } => manager
            .set_value(&session, &VariablePath::from(variable_path), &value, frame)
            .map(|()| None),
        Command::Evaluate {
            session,
            expression,
            frame,
        } => {
            let result = manager.evaluate(&session, &expression, frame)?;
            Ok(Some(Value::String(result)))
        }
    }
}

/// Handle one request line and render the response line.
pub fn handle_line(manager: &SessionManager, line: &str) -> Option<String> {
    let response = match parse_request(line) {
        Ok(request) => {
            debug!("command {} {:?}", request.id, request.command);
            match execute(manager, request.command) {
                Ok(result) => CommandResponse::ok(request.id, result),
                Err(err) => {
                    debug!("command {} failed: {err}", request.id);
                    CommandResponse::error(request.id, &err)
                }
            }
        }
        Err((id, err)) => CommandResponse::error(id, &err),
    };
    serde_json::to_string(&response).ok()
}

/// Decode a request; on failure report the id if one could be read.
fn parse_request(line: &str) -> Result<CommandRequest, (u64, DebuggerError)> {
    let raw: Value = serde_json::from_str(line)
        .map_err(|err| (0, DebuggerError::InvalidRequest(err.to_string())))?;
    let id = raw.get("id").and_then(Value::as_u64).unwrap_or(0);
    serde_json::from_value(raw).map_err(|err| (id, DebuggerError::InvalidRequest(err.to_string())))
}

fn to_json(value: &impl Serialize) -> DebuggerResult<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|err| DebuggerError::Internal(err.to_string()))
}
