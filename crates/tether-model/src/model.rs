//! Immutable snapshots of debuggee state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line number reported when the engine cannot map a position to a line.
pub const UNKNOWN_LINE: i32 = -1;

/// External resource id of a location that lives inside a project.
pub const NO_EXTERNAL_RESOURCE: i32 = -1;

/// Addressing key into nested variable/field structures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VariablePath {
    segments: Vec<String>,
}

impl VariablePath {
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path with a single root segment (a local, argument or field name).
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parse `a.b[0].c` into `["a", "b", "[0]", "c"]`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        for part in text.split('.') {
            let part = part.trim();
            let mut rest = part;
            while let Some(open) = rest.find('[') {
                // An unclosed index stays part of the remaining segment.
                let Some(close) = rest[open..].find(']') else {
                    break;
                };
                let head = &rest[..open];
                if !head.is_empty() {
                    segments.push(head.to_string());
                }
                segments.push(rest[open..=open + close].to_string());
                rest = &rest[open + close + 1..];
            }
            if !rest.is_empty() {
                segments.push(rest.to_string());
            }
        }
        Self { segments }
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 && !segment.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// A runtime value, possibly compound.
///
/// Leaf values carry no nested variables; compound values list their direct
/// children, each child holding only its string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleValue {
    pub string: String,
    pub variables: Vec<Variable>,
}

impl SimpleValue {
    #[must_use]
    pub fn leaf(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            variables: Vec::new(),
        }
    }

    #[must_use]
    pub fn compound(string: impl Into<String>, variables: Vec<Variable>) -> Self {
        Self {
            string: string.into(),
            variables,
        }
    }

    #[must_use]
    pub fn is_compound(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Copy of this value without nested variables.
    #[must_use]
    pub fn simplified(&self) -> Self {
        Self::leaf(self.string.clone())
    }
}

/// A named value reachable from a frame or object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
    pub primitive: bool,
    pub path: VariablePath,
    pub value: SimpleValue,
}

impl Variable {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        primitive: bool,
        path: VariablePath,
        value: SimpleValue,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            primitive,
            path,
            value,
        }
    }
}

/// A class or instance member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub variable: Variable,
    pub is_final: bool,
    pub is_static: bool,
    pub is_transient: bool,
    pub is_volatile: bool,
}

impl Field {
    /// Field without modifiers.
    #[must_use]
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            is_final: false,
            is_static: false,
            is_transient: false,
            is_volatile: false,
        }
    }
}

/// A callable unit; arguments are kept in call-signature order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub arguments: Vec<Variable>,
}

impl Method {
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Vec<Variable>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Position key used for breakpoint identity: target plus line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub target: String,
    pub line_number: i32,
}

/// A source position reachable at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Engine-native identifier (class or file name).
    pub target: String,
    pub line_number: i32,
    pub external_resource: bool,
    pub external_resource_id: i32,
    pub resource_path: Option<String>,
    pub resource_project_path: Option<String>,
    pub method: Option<Method>,
}

impl Location {
    #[must_use]
    pub fn new(target: impl Into<String>, line_number: i32) -> Self {
        Self {
            target: target.into(),
            line_number,
            external_resource: false,
            external_resource_id: NO_EXTERNAL_RESOURCE,
            resource_path: None,
            resource_project_path: None,
            method: None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn with_resource(
        mut self,
        resource_path: impl Into<String>,
        resource_project_path: impl Into<String>,
    ) -> Self {
        self.resource_path = Some(resource_path.into());
        self.resource_project_path = Some(resource_project_path.into());
        self
    }

    #[must_use]
    pub fn with_external_resource(mut self, id: i32) -> Self {
        self.external_resource = true;
        self.external_resource_id = id;
        self
    }

    #[must_use]
    pub fn key(&self) -> PositionKey {
        PositionKey {
            target: self.target.clone(),
            line_number: self.line_number,
        }
    }

    #[must_use]
    pub fn has_known_line(&self) -> bool {
        self.line_number >= 0
    }
}

/// One frame of a suspended thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrameDump {
    pub location: Location,
    pub variables: Vec<Variable>,
    pub fields: Vec<Field>,
}

/// Thread state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadStatus {
    Unknown,
    Zombie,
    Runnable,
    Sleeping,
    Monitor,
    Wait,
    NotStarted,
}

/// Full state snapshot of one thread; frames are innermost-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDump {
    pub name: String,
    pub group_name: String,
    pub suspended: bool,
    pub status: ThreadStatus,
    pub frames: Vec<StackFrameDump>,
}

impl ThreadDump {
    /// A thread that is not stopped at a statement boundary; it has no frames.
    #[must_use]
    pub fn running(
        name: impl Into<String>,
        group_name: impl Into<String>,
        status: ThreadStatus,
    ) -> Self {
        Self {
            name: name.into(),
            group_name: group_name.into(),
            suspended: false,
            status,
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn suspended(
        name: impl Into<String>,
        group_name: impl Into<String>,
        status: ThreadStatus,
        frames: Vec<StackFrameDump>,
    ) -> Self {
        Self {
            name: name.into(),
            group_name: group_name.into(),
            suspended: true,
            status,
            frames,
        }
    }
}

/// A requested suspend point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub location: Location,
    pub enabled: bool,
    pub condition: Option<String>,
}

impl Breakpoint {
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self {
            location,
            enabled: true,
            condition: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn key(&self) -> PositionKey {
        self.location.key()
    }
}

/// Debugger engine description reported on connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerInfo {
    pub host: String,
    pub port: u16,
    pub pid: Option<u32>,
    pub name: String,
    pub version: String,
    pub file: Option<String>,
}

/// Session identifier, assigned by the session manager at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One live connection to a debuggee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSession {
    pub id: SessionId,
    /// Debugger-kind tag of the adapter that owns the session.
    pub kind: String,
    pub info: DebuggerInfo,
}
