//! Document values
//!
//! A document maps string keys to either a scalar (bookkeeping fields) or a
//! revision-keyed map of strings (history-carrying fields). Property values
//! inside revision maps are JSON-encoded property states; the empty string
//! means the property was removed at that revision.

use crate::revision::RevisionMap;

/// A scalar document value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    String(String),
}

impl Scalar {
    /// The boolean value, if this is a bool scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, if this is an int scalar.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string value, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

/// A document value: a scalar or a revision-keyed map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocValue {
    Scalar(Scalar),
    Map(RevisionMap<String>),
}

impl DocValue {
    /// The scalar, if this is a scalar value.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            DocValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The revision map, if this is a map value.
    pub fn as_map(&self) -> Option<&RevisionMap<String>> {
        match self {
            DocValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable access to the revision map, if this is a map value.
    pub(crate) fn as_map_mut(&mut self) -> Option<&mut RevisionMap<String>> {
        match self {
            DocValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Scalar> for DocValue {
    fn from(s: Scalar) -> Self {
        DocValue::Scalar(s)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        DocValue::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for DocValue {
    fn from(i: i64) -> Self {
        DocValue::Scalar(Scalar::Int(i))
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        DocValue::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        DocValue::Scalar(Scalar::String(s))
    }
}

impl From<RevisionMap<String>> for DocValue {
    fn from(m: RevisionMap<String>) -> Self {
        DocValue::Map(m)
    }
}
