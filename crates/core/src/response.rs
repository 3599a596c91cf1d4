use serde::{Deserialize, Serialize};

use crate::context::Context;

/// A typed payload handed to subscribers when its rule wins selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Response {
    pub response_type: String,
    pub value: String,
}

impl Response {
    pub fn new(response_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            response_type: response_type.into(),
            value: value.into(),
        }
    }

    /// Build a response whose payload is the context's name, so a handler
    /// can read the live value when it fires.
    pub fn from_context(response_type: impl Into<String>, context: &Context) -> Self {
        Self::new(response_type, context.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn from_context_uses_name_as_payload() {
        let ctx = Context::new("greeting_line", ValueType::String, "hello there");
        let response = Response::from_context("text", &ctx);
        assert_eq!(response.response_type, "text");
        assert_eq!(response.value, "greeting_line");
    }
}
