//! Normalized field values.
//!
//! Every field value that crosses from one side to the other travels as a
//! [`NormalizedValue`]. The variant is the kind tag, so a value can never
//! disagree with its own kind. Whether the kind matches what a side declares
//! for a field is checked by the field-type tables in `fieldsync-model`.

use crate::{NormalizationError, NormalizationResult, UnsupportedTypeError, normalize};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The declared type of a field on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    String,
    DateTime,
    Bool,
    Float,
}

impl ValueKind {
    /// Canonical lowercase name, as used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Bool => "bool",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = UnsupportedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "string" | "text" => Ok(Self::String),
            "datetime" => Ok(Self::DateTime),
            "bool" | "boolean" => Ok(Self::Bool),
            "float" | "double" => Ok(Self::Float),
            _ => Err(UnsupportedTypeError(s.to_string())),
        }
    }
}

/// A typed, side-agnostic field value.
///
/// Equality on `DateTime` compares instants, so the same moment expressed in
/// two offsets is equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "raw", rename_all = "lowercase")]
pub enum NormalizedValue {
    Int(i64),
    String(String),
    DateTime(DateTime<FixedOffset>),
    Bool(bool),
    Float(f64),
}

impl NormalizedValue {
    /// Returns the kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::String(_) => ValueKind::String,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Bool(_) => ValueKind::Bool,
            Self::Float(_) => ValueKind::Float,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Whether two values denote the same thing, even when typed differently
    /// on the two sides (`Int(5)` agrees with `String("5")`). Symmetric: either
    /// value may be converted into the other's kind.
    pub fn agrees_with(&self, other: &Self) -> bool {
        self == other
            || other
                .coerce(self.kind())
                .is_ok_and(|converted| converted == *self)
            || self
                .coerce(other.kind())
                .is_ok_and(|converted| converted == *other)
    }

    /// Converts this value into `kind`.
    ///
    /// Used when a field is typed differently on the two sides. Conversions
    /// that would lose information (a fractional float into an int, an int
    /// other than 0/1 into a bool) fail instead of truncating.
    pub fn coerce(&self, kind: ValueKind) -> NormalizationResult<Self> {
        if self.kind() == kind {
            return Ok(self.clone());
        }

        let fail = |reason: &str| NormalizationError::new(kind, self.to_json(), reason);

        match (self, kind) {
            (Self::String(s), _) => {
                normalize::to_normalized(kind, &serde_json::Value::String(s.clone()))
            }
            (_, ValueKind::String) => Ok(Self::String(self.to_string())),
            (Self::Int(i), ValueKind::Float) => Ok(Self::Float(*i as f64)),
            (Self::Float(f), ValueKind::Int) => normalize::integral_f64(*f)
                .map(Self::Int)
                .ok_or_else(|| fail("float is not integral")),
            (Self::Bool(b), ValueKind::Int) => Ok(Self::Int(i64::from(*b))),
            (Self::Int(i), ValueKind::Bool) => match i {
                0 => Ok(Self::Bool(false)),
                1 => Ok(Self::Bool(true)),
                _ => Err(fail("only 0 and 1 convert to bool")),
            },
            (Self::DateTime(dt), ValueKind::Int) => Ok(Self::Int(dt.timestamp())),
            (Self::Int(secs), ValueKind::DateTime) => normalize::datetime_from_unix(*secs)
                .map(Self::DateTime)
                .ok_or_else(|| fail("unix timestamp out of range")),
            _ => Err(fail("no conversion between these kinds")),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        normalize::to_native(self)
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<i64> for NormalizedValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for NormalizedValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for NormalizedValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for NormalizedValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for NormalizedValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<FixedOffset>> for NormalizedValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTime(v)
    }
}
