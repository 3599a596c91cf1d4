//! Declared value types and their parsed representations.
//!
//! Context values are stored as raw strings and interpreted through the
//! [`ValueType`] the context was declared with. Parsing yields a [`Value`],
//! which is what criteria compare and what callers get back from a typed read.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DdsError, Result};

/// The closed set of types a context value can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    String,
    Mp3,
    Ogg,
    Wav,
}

impl ValueType {
    /// Whether values of this type have a numeric ordering.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Byte
                | ValueType::Short
                | ValueType::Integer
                | ValueType::Long
                | ValueType::Float
                | ValueType::Double
        )
    }

    /// Whether this is one of the media markers (raw value is a location).
    pub fn is_media(&self) -> bool {
        matches!(self, ValueType::Mp3 | ValueType::Ogg | ValueType::Wav)
    }

    /// Parse a raw string into a [`Value`] of this type.
    pub fn parse(&self, raw: &str) -> Result<Value> {
        let fail = |reason: String| DdsError::Parse {
            value: raw.to_string(),
            value_type: *self,
            reason,
        };
        let trimmed = raw.trim();

        let value = match self {
            ValueType::Byte => Value::Byte(trimmed.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Short => Value::Short(trimmed.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Integer => {
                Value::Integer(trimmed.parse().map_err(|e| fail(format!("{e}")))?)
            }
            ValueType::Long => Value::Long(trimmed.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Float => Value::Float(trimmed.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Double => {
                Value::Double(trimmed.parse().map_err(|e| fail(format!("{e}")))?)
            }
            ValueType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Value::Boolean(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Value::Boolean(false)
                } else {
                    return Err(fail("expected 'true' or 'false'".to_string()));
                }
            }
            ValueType::String => Value::Text(raw.to_string()),
            ValueType::Mp3 | ValueType::Ogg | ValueType::Wav => Value::Media {
                kind: *self,
                location: raw.to_string(),
            },
        };

        Ok(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Byte => "Byte",
            ValueType::Short => "Short",
            ValueType::Integer => "Integer",
            ValueType::Long => "Long",
            ValueType::Float => "Float",
            ValueType::Double => "Double",
            ValueType::Boolean => "Boolean",
            ValueType::String => "String",
            ValueType::Mp3 => "Mp3",
            ValueType::Ogg => "Ogg",
            ValueType::Wav => "Wav",
        };
        f.write_str(name)
    }
}

/// A context value parsed according to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Text(String),
    Media { kind: ValueType, location: String },
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Byte(_) => ValueType::Byte,
            Value::Short(_) => ValueType::Short,
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Text(_) => ValueType::String,
            Value::Media { kind, .. } => *kind,
        }
    }

    /// Numeric ordering between two values of the same numeric type.
    ///
    /// Returns `None` for mismatched or non-numeric variants, and for NaN floats.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => Some(a.cmp(b)),
            (Value::Short(a), Value::Short(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Media { location, .. } => f.write_str(location),
        }
    }
}
