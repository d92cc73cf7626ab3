//! Program model: classes, methods and their line tables.

use std::ops::RangeInclusive;

use smol_str::SmolStr;

use crate::value::{FieldDecl, FieldSlot, Modifiers, Value};

/// Declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub type_name: SmolStr,
}

/// Method declaration with the source lines its statements occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub lines: RangeInclusive<i32>,
}

impl MethodDef {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, lines: RangeInclusive<i32>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            lines,
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        self.params.push(Param {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }
}

/// Class definition. Static field values live here and are shared by all
/// threads once the class is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: SmolStr,
    pub methods: Vec<MethodDef>,
    pub statics: Vec<FieldSlot>,
}

impl ClassDef {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            statics: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn static_field(mut self, decl: FieldDecl, value: Value) -> Self {
        let modifiers = Modifiers {
            is_static: true,
            ..decl.modifiers
        };
        let decl = decl.with_modifiers(modifiers);
        self.statics.push(FieldSlot { decl, value });
        self
    }

    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Method whose statements cover `line`.
    #[must_use]
    pub fn method_at(&self, line: i32) -> Option<&MethodDef> {
        self.methods.iter().find(|method| method.lines.contains(&line))
    }

    #[must_use]
    pub fn has_code_at(&self, line: i32) -> bool {
        self.method_at(line).is_some()
    }
}
