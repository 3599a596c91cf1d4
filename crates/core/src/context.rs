use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{Value, ValueType};

/// A named, typed piece of per-user state.
///
/// The name and declared type are fixed; only the raw value changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    name: String,
    value_type: ValueType,
    value: String,
}

impl Context {
    pub fn new(name: impl Into<String>, value_type: ValueType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The raw, string-encoded value.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// The raw value parsed per the declared type.
    pub fn typed_value(&self) -> Result<Value> {
        self.value_type.parse(&self.value)
    }
}
