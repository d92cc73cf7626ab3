//! Debugger expressions: `operand [op operand]`.
//!
//! Operands are variable paths (`count`, `point.x`, `args[0]`) or literals;
//! operators are the six comparisons. Breakpoint conditions use the same
//! grammar.

use std::cmp::Ordering;

use smol_str::SmolStr;
use tether_model::VariablePath;

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    const TOKENS: [(&'static str, CompareOp); 6] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Path(VariablePath),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Expr {
    lhs: Operand,
    rhs: Option<(CompareOp, Operand)>,
}

pub(crate) fn parse(text: &str) -> Result<Expr, RuntimeError> {
    match find_operator(text) {
        Some((at, token, op)) => Ok(Expr {
            lhs: parse_operand(&text[..at])?,
            rhs: Some((op, parse_operand(&text[at + token.len()..])?)),
        }),
        None => Ok(Expr {
            lhs: parse_operand(text)?,
            rhs: None,
        }),
    }
}

/// Evaluate with `resolve` supplying the values of variable paths.
pub(crate) fn evaluate(
    expr: &Expr,
    resolve: impl Fn(&VariablePath) -> Result<Value, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let lhs = operand_value(&expr.lhs, &resolve)?;
    let Some((op, rhs)) = &expr.rhs else {
        return Ok(lhs);
    };
    let rhs = operand_value(rhs, &resolve)?;
    let result = match op {
        CompareOp::Eq => lhs.loose_eq(&rhs),
        CompareOp::Ne => !lhs.loose_eq(&rhs),
        _ => {
            let ordering = lhs.compare(&rhs).ok_or_else(|| {
                RuntimeError::Evaluation(SmolStr::new(format!("cannot compare {lhs} with {rhs}")))
            })?;
            match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    };
    Ok(Value::Boolean(result))
}

fn operand_value(
    operand: &Operand,
    resolve: &impl Fn(&VariablePath) -> Result<Value, RuntimeError>,
) -> Result<Value, RuntimeError> {
    match operand {
        Operand::Path(path) => resolve(path),
        Operand::Literal(value) => Ok(value.clone()),
    }
}

fn find_operator(text: &str) -> Option<(usize, &'static str, CompareOp)> {
    let mut quote = None;
    for (idx, ch) in text.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => {
                let rest = &text[idx..];
                if let Some((token, op)) = CompareOp::TOKENS
                    .iter()
                    .find(|(token, _)| rest.starts_with(token))
                {
                    return Some((idx, *token, *op));
                }
            }
        }
    }
    None
}

fn parse_operand(text: &str) -> Result<Operand, RuntimeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RuntimeError::Evaluation("missing operand".into()));
    }
    if let Some(value) = Value::parse_literal(text) {
        return Ok(Operand::Literal(value));
    }
    let starts_like_name = text
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphabetic() || ch == '_');
    let path_chars = text
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '[' | ']' | '$'));
    if !starts_like_name || !path_chars {
        return Err(RuntimeError::Evaluation(SmolStr::new(format!(
            "unsupported expression '{text}'"
        ))));
    }
    Ok(Operand::Path(VariablePath::parse(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &VariablePath) -> Result<Value, RuntimeError> {
        match path.to_string().as_str() {
            "i" => Ok(Value::Int(3)),
            "name" => Ok(Value::string("a<b")),
            other => Err(RuntimeError::UndefinedVariable(other.into())),
        }
    }

    fn eval(text: &str) -> Result<Value, RuntimeError> {
        evaluate(&parse(text)?, resolve)
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("i == 3").unwrap(), Value::Boolean(true));
        assert_eq!(eval("i != 3").unwrap(), Value::Boolean(false));
        assert_eq!(eval("i <= 2").unwrap(), Value::Boolean(false));
        assert_eq!(eval("i > 2.5").unwrap(), Value::Boolean(true));
        assert_eq!(eval("name == \"a<b\"").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn bare_operands() {
        assert_eq!(eval("i").unwrap(), Value::Int(3));
        assert_eq!(eval("42").unwrap(), Value::Long(42));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            eval("missing == 1"),
            Err(RuntimeError::UndefinedVariable(_))
        ));
        assert!(matches!(eval("i + 1"), Err(RuntimeError::Evaluation(_))));
        assert!(matches!(eval("== 1"), Err(RuntimeError::Evaluation(_))));
        assert!(matches!(eval("true < 1"), Err(RuntimeError::Evaluation(_))));
    }
}
