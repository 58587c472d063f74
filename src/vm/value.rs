//! Runtime value representation
//!
//! The machine works on tagged [`Value`]s:
//!
//! - [`Value::Int`]: integers, booleans (0/1) and character codes
//! - [`Value::Float`]: reals
//! - [`Value::Str`]: reference into the string heap
//! - [`Value::Addr`]: a cell inside a heap block
//!
//! Strings are immutable; `setcharat` builds a new one.

use std::fmt;

/// Index of a string in the string heap
pub type StrRef = usize;

/// Runtime values on the operand stack and in globals
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(StrRef),
    Addr { block: usize, offset: i64 },
}

impl Value {
    /// Short type name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Addr { .. } => "address",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str_ref(&self) -> Option<StrRef> {
        match self {
            Value::Str(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(r) => write!(f, "#str{}", r),
            Value::Addr { block, offset } => write!(f, "@{}+{}", block, offset),
        }
    }
}
