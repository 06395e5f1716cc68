//! Constant values as resolved by the type checker.

use std::fmt;
use std::sync::Arc;

/// A compile-time constant.
///
/// Integers are carried as `i128` so both the full `int64` and `uint64`
/// ranges fit; the type attached to the expression decides how the value is
/// materialized at run time.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
    Str(Arc<str>),
    /// The untyped `nil` (or the zero value of a nillable type).
    Nil,
}

impl ConstValue {
    /// Create a string constant.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        ConstValue::Str(s.into())
    }

    /// The integer value, if this is an integer constant.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v:?}"),
            ConstValue::Complex(re, im) => write!(f, "({re:?}+{im:?}i)"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
            ConstValue::Nil => write!(f, "nil"),
        }
    }
}
