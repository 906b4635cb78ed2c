//! Typed runtime values
//!
//! Every value knows the name of the stack it lives on, so the interpreter
//! can keep one stack per literal type without a fixed type list.

use crate::program::Program;
use std::fmt::{self, Display, Formatter};

/// A typed value pushed onto an interpreter stack
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `int`
    Int(i64),
    /// `float`
    Float(f64),
    /// `bool`
    Bool(bool),
    /// `code`
    Code(Program),
    /// `name` (unbound references)
    Name(String),
}

impl Value {
    /// Name of the stack (and literal type) this value belongs to
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Code(_) => "code",
            Value::Name(_) => "name",
        }
    }

    /// Numeric view of the value, if it has one
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer payload
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Code(p) => write!(f, "{}", p.root().compact()),
            Value::Name(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Value::Int(3).type_name(), "int");
        assert_eq!(Value::from(2.5).type_name(), "float");
        assert_eq!(Value::from(true).type_name(), "bool");
        assert_eq!(Value::Name("x".into()).type_name(), "name");
    }

    #[test]
    fn numeric_view() {
        assert_eq!(Value::Int(-4).as_f64(), Some(-4.0));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
