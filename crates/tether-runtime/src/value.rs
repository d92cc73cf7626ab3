//! Guest values.

use std::cmp::Ordering;
use std::fmt;

use smol_str::SmolStr;

use crate::error::RuntimeError;

/// Member modifiers of a declared field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_final: bool,
    pub is_static: bool,
    pub is_transient: bool,
    pub is_volatile: bool,
}

/// Declaration of an object or class field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub modifiers: Modifiers,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Modifiers::default(),
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A declared field together with its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot {
    pub decl: FieldDecl,
    pub value: Value,
}

/// Object instance: class name and field slots in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub class: SmolStr,
    pub fields: Vec<FieldSlot>,
}

impl ObjectValue {
    #[must_use]
    pub fn new(class: impl Into<SmolStr>) -> Self {
        Self {
            class: class.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, decl: FieldDecl, value: Value) -> Self {
        self.fields.push(FieldSlot { decl, value });
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.iter().find(|slot| slot.decl.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldSlot> {
        self.fields.iter_mut().find(|slot| slot.decl.name == name)
    }
}

/// Runtime value of the reference engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    Str(SmolStr),
    Array {
        element_type: SmolStr,
        elements: Vec<Value>,
    },
    Object(ObjectValue),
}

/// Type names the engine treats as primitive.
pub const PRIMITIVE_TYPES: &[&str] = &["boolean", "int", "long", "double", "char"];

#[must_use]
pub fn is_primitive_type(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

impl Value {
    #[must_use]
    pub fn string(text: impl Into<SmolStr>) -> Self {
        Value::Str(text.into())
    }

    #[must_use]
    pub fn array(element_type: impl Into<SmolStr>, elements: Vec<Value>) -> Self {
        Value::Array {
            element_type: element_type.into(),
            elements,
        }
    }

    /// Named children of a compound value with their declared types.
    #[must_use]
    pub fn children(&self) -> Vec<(SmolStr, SmolStr, &Value)> {
        match self {
            Value::Array {
                element_type,
                elements,
            } => elements
                .iter()
                .enumerate()
                .map(|(idx, value)| (SmolStr::new(format!("[{idx}]")), element_type.clone(), value))
                .collect(),
            Value::Object(object) => object
                .fields
                .iter()
                .map(|slot| (slot.decl.name.clone(), slot.decl.type_name.clone(), &slot.value))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Child addressed by one path segment (`name` or `[index]`).
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<(SmolStr, &Value)> {
        match self {
            Value::Array {
                element_type,
                elements,
            } => {
                let idx = parse_index(segment)?;
                elements.get(idx).map(|value| (element_type.clone(), value))
            }
            Value::Object(object) => object
                .field(segment)
                .map(|slot| (slot.decl.type_name.clone(), &slot.value)),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &str) -> Option<(SmolStr, &mut Value)> {
        match self {
            Value::Array {
                element_type,
                elements,
            } => {
                let idx = parse_index(segment)?;
                let element_type = element_type.clone();
                elements.get_mut(idx).map(|value| (element_type, value))
            }
            Value::Object(object) => object
                .field_mut(segment)
                .map(|slot| (slot.decl.type_name.clone(), &mut slot.value)),
            _ => None,
        }
    }

    /// Parse `text` as a value of `type_name`.
    pub fn parse_as(type_name: &str, text: &str) -> Result<Value, RuntimeError> {
        let text = text.trim();
        let invalid = || RuntimeError::InvalidValue {
            type_name: type_name.into(),
            value: text.into(),
        };
        match type_name {
            "boolean" => text.parse().map(Value::Boolean).map_err(|_| invalid()),
            "int" => text.parse().map(Value::Int).map_err(|_| invalid()),
            "long" => text
                .trim_end_matches(['l', 'L'])
                .parse()
                .map(Value::Long)
                .map_err(|_| invalid()),
            "double" => text.parse().map(Value::Double).map_err(|_| invalid()),
            "char" => {
                let inner = strip_quotes(text, '\'');
                let mut chars = inner.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Value::Char(ch)),
                    _ => Err(invalid()),
                }
            }
            "java.lang.String" | "String" => {
                if text == "null" {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Str(strip_quotes(text, '"').into()))
                }
            }
            _ if text == "null" => Ok(Value::Null),
            _ => Err(invalid()),
        }
    }

    /// Parse a literal appearing in an expression.
    #[must_use]
    pub fn parse_literal(text: &str) -> Option<Value> {
        let text = text.trim();
        match text {
            "null" => return Some(Value::Null),
            "true" => return Some(Value::Boolean(true)),
            "false" => return Some(Value::Boolean(false)),
            _ => {}
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Some(Value::Str(text[1..text.len() - 1].into()));
        }
        if text.len() >= 3 && text.starts_with('\'') && text.ends_with('\'') {
            let mut chars = text[1..text.len() - 1].chars();
            return match (chars.next(), chars.next()) {
                (Some(ch), None) => Some(Value::Char(ch)),
                _ => None,
            };
        }
        if let Ok(value) = text.parse::<i64>() {
            return Some(Value::Long(value));
        }
        if text.contains('.') {
            if let Ok(value) = text.parse::<f64>() {
                return Some(Value::Double(value));
            }
        }
        None
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(f64::from(*value)),
            #[allow(clippy::cast_precision_loss)]
            Value::Long(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            Value::Char(value) => Some(f64::from(u32::from(*value))),
            _ => None,
        }
    }

    /// Equality with numeric widening.
    #[must_use]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => self == other,
        }
    }

    /// Ordering of numbers and strings; other pairs are not comparable.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(lhs), Value::Str(rhs)) => Some(lhs.cmp(rhs)),
            _ => self.as_number()?.partial_cmp(&other.as_number()?),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Long(value) => write!(f, "{value}"),
            Value::Double(value) => write!(f, "{value:?}"),
            Value::Char(value) => write!(f, "'{value}'"),
            Value::Str(value) => write!(f, "\"{value}\""),
            Value::Array {
                element_type,
                elements,
            } => write!(f, "instance of {element_type}[{}]", elements.len()),
            Value::Object(object) => write!(f, "instance of {}", object.class),
        }
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    segment
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|idx| idx.trim().parse().ok())
}

fn strip_quotes(text: &str, quote: char) -> &str {
    text.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Value {
        Value::Object(
            ObjectValue::new("com.Point")
                .with_field(FieldDecl::new("x", "int"), Value::Int(1))
                .with_field(FieldDecl::new("y", "int"), Value::Int(2)),
        )
    }

    #[test]
    fn display_strings() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Char('a').to_string(), "'a'");
        assert_eq!(Value::string("hi").to_string(), "\"hi\"");
        assert_eq!(
            Value::array("java.lang.String", Vec::new()).to_string(),
            "instance of java.lang.String[0]"
        );
        assert_eq!(point().to_string(), "instance of com.Point");
    }

    #[test]
    fn children_of_arrays_and_objects() {
        let array = Value::array("int", vec![Value::Int(4), Value::Int(5)]);
        let names: Vec<_> = array.children().into_iter().map(|(name, ..)| name).collect();
        assert_eq!(names, ["[0]", "[1]"]);
        assert_eq!(array.child("[1]").map(|(_, value)| value), Some(&Value::Int(5)));
        assert!(array.child("[2]").is_none());

        let point = point();
        let (type_name, value) = point.child("y").unwrap();
        assert_eq!(type_name, "int");
        assert_eq!(value, &Value::Int(2));
    }

    #[test]
    fn parse_as_checks_the_declared_type() {
        assert_eq!(Value::parse_as("int", " 42 ").unwrap(), Value::Int(42));
        assert_eq!(Value::parse_as("char", "'z'").unwrap(), Value::Char('z'));
        assert_eq!(
            Value::parse_as("java.lang.String", "\"hey\"").unwrap(),
            Value::string("hey")
        );
        assert_eq!(Value::parse_as("com.Point", "null").unwrap(), Value::Null);
        assert!(matches!(
            Value::parse_as("int", "forty"),
            Err(RuntimeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn comparisons_widen_numbers() {
        assert!(Value::Int(3).loose_eq(&Value::Long(3)));
        assert_eq!(
            Value::Int(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Boolean(true).compare(&Value::Int(1)), None);
    }
}
