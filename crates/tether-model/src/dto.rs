//! Wire forms of the value model.
//!
//! Every DTO mirrors one model type field by field. Conversions are plain
//! struct literals, so a field left out of a conversion does not compile.
//! Optional values are written as `null`, never omitted.

use serde::{Deserialize, Serialize};

use crate::action::{DebugAction, StartAction};
use crate::event::{DebuggerEvent, DebuggerEventType};
use crate::model::{
    Breakpoint, DebugSession, DebuggerInfo, Field, Location, Method, SessionId, SimpleValue,
    StackFrameDump, ThreadDump, ThreadStatus, Variable, VariablePath, NO_EXTERNAL_RESOURCE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePathDto {
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleValueDto {
    pub string: String,
    #[serde(default)]
    pub variables: Vec<VariableDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDto {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub primitive: bool,
    pub value: SimpleValueDto,
    pub variable_path: VariablePathDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDto {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub primitive: bool,
    pub value: SimpleValueDto,
    pub variable_path: VariablePathDto,
    pub is_final: bool,
    pub is_static: bool,
    pub is_transient: bool,
    pub is_volatile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDto {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<VariableDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    pub target: String,
    pub line_number: i32,
    #[serde(default)]
    pub external_resource: bool,
    #[serde(default = "no_external_resource")]
    pub external_resource_id: i32,
    pub resource_path: Option<String>,
    pub resource_project_path: Option<String>,
    pub method: Option<MethodDto>,
}

fn no_external_resource() -> i32 {
    NO_EXTERNAL_RESOURCE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointDto {
    pub location: LocationDto,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub condition: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrameDumpDto {
    pub location: LocationDto,
    pub variables: Vec<VariableDto>,
    pub fields: Vec<FieldDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDumpDto {
    pub name: String,
    pub group_name: String,
    pub suspended: bool,
    pub status: ThreadStatus,
    pub frames: Vec<StackFrameDumpDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerInfoDto {
    pub host: String,
    pub port: u16,
    pub pid: Option<u32>,
    pub name: String,
    pub version: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSessionDto {
    pub id: SessionId,
    #[serde(rename = "type")]
    pub kind: String,
    pub debugger_info: DebuggerInfoDto,
}

/// Discriminated union: `type` equals the event tag and only the payload of
/// that tag is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebuggerEventDto {
    Disconnect,
    Suspend { location: LocationDto },
    BreakpointActivated { breakpoint: BreakpointDto },
}

impl DebuggerEventDto {
    #[must_use]
    pub fn event_type(&self) -> DebuggerEventType {
        match self {
            DebuggerEventDto::Disconnect => DebuggerEventType::Disconnect,
            DebuggerEventDto::Suspend { .. } => DebuggerEventType::Suspend,
            DebuggerEventDto::BreakpointActivated { .. } => DebuggerEventType::BreakpointActivated,
        }
    }
}

/// Inbound run-control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDto {
    Start {
        #[serde(default)]
        breakpoints: Vec<BreakpointDto>,
    },
    Resume,
    StepInto,
    StepOver,
    StepOut,
    Suspend,
}

impl From<&VariablePath> for VariablePathDto {
    fn from(path: &VariablePath) -> Self {
        Self {
            path: path.segments().to_vec(),
        }
    }
}

impl From<VariablePathDto> for VariablePath {
    fn from(dto: VariablePathDto) -> Self {
        VariablePath::new(dto.path)
    }
}

impl From<&SimpleValue> for SimpleValueDto {
    fn from(value: &SimpleValue) -> Self {
        Self {
            string: value.string.clone(),
            variables: value.variables.iter().map(VariableDto::from).collect(),
        }
    }
}

impl SimpleValueDto {
    /// String-only form, used where nested expansion is not wanted.
    #[must_use]
    pub fn simplified(value: &SimpleValue) -> Self {
        Self {
            string: value.string.clone(),
            variables: Vec::new(),
        }
    }
}

impl From<SimpleValueDto> for SimpleValue {
    fn from(dto: SimpleValueDto) -> Self {
        SimpleValue {
            string: dto.string,
            variables: dto.variables.into_iter().map(Variable::from).collect(),
        }
    }
}

impl From<&Variable> for VariableDto {
    fn from(variable: &Variable) -> Self {
        Self {
            name: variable.name.clone(),
            type_name: variable.type_name.clone(),
            primitive: variable.primitive,
            value: SimpleValueDto::simplified(&variable.value),
            variable_path: VariablePathDto::from(&variable.path),
        }
    }
}

impl From<VariableDto> for Variable {
    fn from(dto: VariableDto) -> Self {
        Variable {
            name: dto.name,
            type_name: dto.type_name,
            primitive: dto.primitive,
            path: dto.variable_path.into(),
            value: dto.value.into(),
        }
    }
}

impl From<&Field> for FieldDto {
    fn from(field: &Field) -> Self {
        let variable = &field.variable;
        Self {
            name: variable.name.clone(),
            type_name: variable.type_name.clone(),
            primitive: variable.primitive,
            value: SimpleValueDto::simplified(&variable.value),
            variable_path: VariablePathDto::from(&variable.path),
            is_final: field.is_final,
            is_static: field.is_static,
            is_transient: field.is_transient,
            is_volatile: field.is_volatile,
        }
    }
}

impl From<FieldDto> for Field {
    fn from(dto: FieldDto) -> Self {
        Field {
            variable: Variable {
                name: dto.name,
                type_name: dto.type_name,
                primitive: dto.primitive,
                path: dto.variable_path.into(),
                value: dto.value.into(),
            },
            is_final: dto.is_final,
            is_static: dto.is_static,
            is_transient: dto.is_transient,
            is_volatile: dto.is_volatile,
        }
    }
}

impl From<&Method> for MethodDto {
    fn from(method: &Method) -> Self {
        Self {
            name: method.name.clone(),
            arguments: method.arguments.iter().map(VariableDto::from).collect(),
        }
    }
}

impl From<MethodDto> for Method {
    fn from(dto: MethodDto) -> Self {
        Method {
            name: dto.name,
            arguments: dto.arguments.into_iter().map(Variable::from).collect(),
        }
    }
}

impl From<&Location> for LocationDto {
    fn from(location: &Location) -> Self {
        Self {
            target: location.target.clone(),
            line_number: location.line_number,
            external_resource: location.external_resource,
            external_resource_id: location.external_resource_id,
            resource_path: location.resource_path.clone(),
            resource_project_path: location.resource_project_path.clone(),
            method: location.method.as_ref().map(MethodDto::from),
        }
    }
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Location {
            target: dto.target,
            line_number: dto.line_number,
            external_resource: dto.external_resource,
            external_resource_id: dto.external_resource_id,
            resource_path: dto.resource_path,
            resource_project_path: dto.resource_project_path,
            method: dto.method.map(Method::from),
        }
    }
}

impl From<&Breakpoint> for BreakpointDto {
    fn from(breakpoint: &Breakpoint) -> Self {
        Self {
            location: LocationDto::from(&breakpoint.location),
            enabled: breakpoint.enabled,
            condition: breakpoint.condition.clone(),
        }
    }
}

impl From<BreakpointDto> for Breakpoint {
    fn from(dto: BreakpointDto) -> Self {
        Breakpoint {
            location: dto.location.into(),
            enabled: dto.enabled,
            condition: dto.condition,
        }
    }
}

impl From<&StackFrameDump> for StackFrameDumpDto {
    fn from(frame: &StackFrameDump) -> Self {
        Self {
            location: LocationDto::from(&frame.location),
            variables: frame.variables.iter().map(VariableDto::from).collect(),
            fields: frame.fields.iter().map(FieldDto::from).collect(),
        }
    }
}

impl From<StackFrameDumpDto> for StackFrameDump {
    fn from(dto: StackFrameDumpDto) -> Self {
        StackFrameDump {
            location: dto.location.into(),
            variables: dto.variables.into_iter().map(Variable::from).collect(),
            fields: dto.fields.into_iter().map(Field::from).collect(),
        }
    }
}

impl From<&ThreadDump> for ThreadDumpDto {
    fn from(thread: &ThreadDump) -> Self {
        Self {
            name: thread.name.clone(),
            group_name: thread.group_name.clone(),
            suspended: thread.suspended,
            status: thread.status,
            frames: thread.frames.iter().map(StackFrameDumpDto::from).collect(),
        }
    }
}

impl From<ThreadDumpDto> for ThreadDump {
    fn from(dto: ThreadDumpDto) -> Self {
        ThreadDump {
            name: dto.name,
            group_name: dto.group_name,
            suspended: dto.suspended,
            status: dto.status,
            frames: dto.frames.into_iter().map(StackFrameDump::from).collect(),
        }
    }
}

impl From<&DebuggerInfo> for DebuggerInfoDto {
    fn from(info: &DebuggerInfo) -> Self {
        Self {
            host: info.host.clone(),
            port: info.port,
            pid: info.pid,
            name: info.name.clone(),
            version: info.version.clone(),
            file: info.file.clone(),
        }
    }
}

impl From<DebuggerInfoDto> for DebuggerInfo {
    fn from(dto: DebuggerInfoDto) -> Self {
        DebuggerInfo {
            host: dto.host,
            port: dto.port,
            pid: dto.pid,
            name: dto.name,
            version: dto.version,
            file: dto.file,
        }
    }
}

impl From<&DebugSession> for DebugSessionDto {
    fn from(session: &DebugSession) -> Self {
        Self {
            id: session.id.clone(),
            kind: session.kind.clone(),
            debugger_info: DebuggerInfoDto::from(&session.info),
        }
    }
}

impl From<DebugSessionDto> for DebugSession {
    fn from(dto: DebugSessionDto) -> Self {
        DebugSession {
            id: dto.id,
            kind: dto.kind,
            info: dto.debugger_info.into(),
        }
    }
}

impl From<&DebuggerEvent> for DebuggerEventDto {
    fn from(event: &DebuggerEvent) -> Self {
        match event {
            DebuggerEvent::Disconnect => DebuggerEventDto::Disconnect,
            DebuggerEvent::Suspend { location } => DebuggerEventDto::Suspend {
                location: LocationDto::from(location),
            },
            DebuggerEvent::BreakpointActivated { breakpoint } => {
                DebuggerEventDto::BreakpointActivated {
                    breakpoint: BreakpointDto::from(breakpoint),
                }
            }
        }
    }
}

impl From<DebuggerEventDto> for DebuggerEvent {
    fn from(dto: DebuggerEventDto) -> Self {
        match dto {
            DebuggerEventDto::Disconnect => DebuggerEvent::Disconnect,
            DebuggerEventDto::Suspend { location } => DebuggerEvent::Suspend {
                location: location.into(),
            },
            DebuggerEventDto::BreakpointActivated { breakpoint } => {
                DebuggerEvent::BreakpointActivated {
                    breakpoint: breakpoint.into(),
                }
            }
        }
    }
}

impl From<&DebugAction> for ActionDto {
    fn from(action: &DebugAction) -> Self {
        match action {
            DebugAction::Start(start) => ActionDto::Start {
                breakpoints: start.breakpoints.iter().map(BreakpointDto::from).collect(),
            },
            DebugAction::Resume => ActionDto::Resume,
            DebugAction::StepInto => ActionDto::StepInto,
            DebugAction::StepOver => ActionDto::StepOver,
            DebugAction::StepOut => ActionDto::StepOut,
            DebugAction::Suspend => ActionDto::Suspend,
        }
    }
}

impl From<ActionDto> for DebugAction {
    fn from(dto: ActionDto) -> Self {
        match dto {
            ActionDto::Start { breakpoints } => DebugAction::Start(StartAction {
                breakpoints: breakpoints.into_iter().map(Breakpoint::from).collect(),
            }),
            ActionDto::Resume => DebugAction::Resume,
            ActionDto::StepInto => DebugAction::StepInto,
            ActionDto::StepOver => DebugAction::StepOver,
            ActionDto::StepOut => DebugAction::StepOut,
            ActionDto::Suspend => DebugAction::Suspend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use serde_json::{json, Value};

    fn leaf_variable(name: &str, type_name: &str, value: &str) -> Variable {
        Variable::new(
            name,
            type_name,
            false,
            VariablePath::root(name),
            SimpleValue::leaf(value),
        )
    }

    fn hello_world_location() -> Location {
        Location::new("com.HelloWorld", 24)
            .with_resource("/test/src/com/HelloWorld.java", "/test")
            .with_method(Method::new(
                "main",
                vec![leaf_variable("args", "java.lang.String[]", "java.lang.String[0]")],
            ))
    }

    fn object_keys(value: &Value) -> Vec<&str> {
        let mut keys = value
            .as_object()
            .map(|object| object.keys().map(String::as_str).collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn full_value_keeps_nested_variables_simplified_drops_them() {
        let value = SimpleValue::compound(
            "instance of com.Point",
            vec![
                leaf_variable("x", "int", "1"),
                leaf_variable("y", "int", "2"),
            ],
        );

        let full = SimpleValueDto::from(&value);
        assert_eq!(full.variables.len(), 2);
        assert_eq!(full.variables[1].name, "y");

        let simplified = SimpleValueDto::simplified(&value);
        assert_eq!(simplified.string, "instance of com.Point");
        assert!(simplified.variables.is_empty());
    }

    #[test]
    fn variables_embed_the_simplified_value() {
        let nested = SimpleValue::compound("int[1]", vec![leaf_variable("[0]", "int", "7")]);
        let variable = Variable::new(
            "numbers",
            "int[]",
            false,
            VariablePath::root("numbers"),
            nested,
        );
        let dto = VariableDto::from(&variable);
        assert_eq!(dto.value.string, "int[1]");
        assert!(dto.value.variables.is_empty());
    }

    #[test]
    fn field_wire_form_carries_every_attribute() {
        let field = Field {
            variable: leaf_variable("count", "int", "3"),
            is_final: true,
            is_static: false,
            is_transient: true,
            is_volatile: false,
        };
        let wire = serde_json::to_value(FieldDto::from(&field)).unwrap();
        assert_eq!(
            object_keys(&wire),
            [
                "isFinal",
                "isStatic",
                "isTransient",
                "isVolatile",
                "name",
                "primitive",
                "type",
                "value",
                "variablePath",
            ]
        );
        assert_eq!(wire["isTransient"], json!(true));
        assert_eq!(wire["variablePath"], json!({ "path": ["count"] }));
    }

    #[test]
    fn absent_location_attributes_are_written_as_null() {
        let wire = serde_json::to_value(LocationDto::from(&Location::new("com.A", 3))).unwrap();
        assert_eq!(
            wire,
            json!({
                "target": "com.A",
                "lineNumber": 3,
                "externalResource": false,
                "externalResourceId": -1,
                "resourcePath": null,
                "resourceProjectPath": null,
                "method": null,
            })
        );
    }

    #[test]
    fn event_discriminator_matches_payload() {
        let disconnect = serde_json::to_value(DebuggerEventDto::from(&DebuggerEvent::Disconnect))
            .unwrap();
        assert_eq!(disconnect, json!({ "type": "DISCONNECT" }));

        let activated = DebuggerEvent::BreakpointActivated {
            breakpoint: Breakpoint::new(Location::new("com.A", 3)),
        };
        let wire = serde_json::to_value(DebuggerEventDto::from(&activated)).unwrap();
        assert_eq!(wire["type"], json!("BREAKPOINT_ACTIVATED"));
        assert_eq!(object_keys(&wire), ["breakpoint", "type"]);
    }

    #[test]
    fn suspend_event_wire_text() {
        let event = DebuggerEvent::Suspend {
            location: Location::new("com.HelloWorld", 24),
        };
        let json = serde_json::to_string_pretty(&DebuggerEventDto::from(&event)).unwrap();
        let expected = expect![[r#"
            {
              "type": "SUSPEND",
              "location": {
                "target": "com.HelloWorld",
                "lineNumber": 24,
                "externalResource": false,
                "externalResourceId": -1,
                "resourcePath": null,
                "resourceProjectPath": null,
                "method": null
              }
            }
        "#]];
        expected.assert_eq(&format!("{json}\n"));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let result = serde_json::from_value::<DebuggerEventDto>(json!({ "type": "EXPLODE" }));
        assert!(result.is_err());
    }

    #[test]
    fn suspend_event_without_location_is_rejected() {
        let result = serde_json::from_value::<DebuggerEventDto>(json!({ "type": "SUSPEND" }));
        assert!(result.is_err());
    }

    #[test]
    fn inbound_breakpoint_uses_defaults() {
        let dto: BreakpointDto = serde_json::from_value(json!({
            "location": { "target": "com.A", "lineNumber": 12 }
        }))
        .unwrap();
        let breakpoint = Breakpoint::from(dto);
        assert!(breakpoint.enabled);
        assert_eq!(breakpoint.condition, None);
        assert_eq!(breakpoint.location, Location::new("com.A", 12));
    }

    #[test]
    fn inbound_actions_decode_by_tag() {
        let step: ActionDto = serde_json::from_value(json!({ "type": "STEP_OVER" })).unwrap();
        assert_eq!(DebugAction::from(step), DebugAction::StepOver);

        let start: ActionDto = serde_json::from_value(json!({
            "type": "START",
            "breakpoints": [{ "location": { "target": "com.A", "lineNumber": 5 } }]
        }))
        .unwrap();
        let DebugAction::Start(start) = DebugAction::from(start) else {
            panic!("expected start action");
        };
        assert_eq!(start.breakpoints.len(), 1);
    }

    #[test]
    fn location_survives_wire_roundtrip() {
        let location = hello_world_location();
        let text = serde_json::to_string(&LocationDto::from(&location)).unwrap();
        let decoded: LocationDto = serde_json::from_str(&text).unwrap();
        assert_eq!(Location::from(decoded), location);
    }

    #[test]
    fn thread_dump_survives_wire_roundtrip() {
        let frame = StackFrameDump {
            location: hello_world_location(),
            variables: vec![leaf_variable("greeting", "java.lang.String", "\"hello\"")],
            fields: vec![Field {
                is_static: true,
                ..Field::new(leaf_variable("COUNT", "int", "1"))
            }],
        };
        let dump = ThreadDump::suspended("main", "main", ThreadStatus::Runnable, vec![frame]);
        let text = serde_json::to_string(&ThreadDumpDto::from(&dump)).unwrap();
        let decoded: ThreadDumpDto = serde_json::from_str(&text).unwrap();
        assert_eq!(ThreadDump::from(decoded), dump);
    }

    #[test]
    fn session_and_breakpoint_survive_wire_roundtrip() {
        let session = DebugSession {
            id: SessionId::new("tether-1"),
            kind: "tether".to_string(),
            info: DebuggerInfo {
                host: "localhost".to_string(),
                port: 8000,
                pid: Some(42),
                name: "tether-vm".to_string(),
                version: "0.1.0".to_string(),
                file: None,
            },
        };
        let text = serde_json::to_string(&DebugSessionDto::from(&session)).unwrap();
        let decoded: DebugSessionDto = serde_json::from_str(&text).unwrap();
        assert_eq!(DebugSession::from(decoded), session);

        let breakpoint =
            Breakpoint::new(Location::new("com.A", 9)).with_condition("i == 3").with_enabled(false);
        let text = serde_json::to_string(&BreakpointDto::from(&breakpoint)).unwrap();
        let decoded: BreakpointDto = serde_json::from_str(&text).unwrap();
        assert_eq!(Breakpoint::from(decoded), breakpoint);
    }
}
