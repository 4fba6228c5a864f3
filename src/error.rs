//! Error types for command handling and statement building.
//!
//! None of these ever reach a database caller: [`crate::StatementBuilder::build`]
//! swallows them and the span simply goes without a `db.statement` attribute.

/// Errors raised while turning a raw value into a [`crate::Command`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The value was not a JSON object.
    #[error("command must be a document, got {0}")]
    NotADocument(&'static str),
}

/// Errors raised while building a statement from a command.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    /// A field that is masked key by key did not hold a document.
    #[error("expected a document in `{field}`")]
    NotADocument { field: String },

    /// `updates`, `deletes` or `pipeline` did not hold an array.
    #[error("expected an array in `{field}`")]
    NotASequence { field: String },

    /// `updates` or `deletes` held an empty array.
    #[error("`{field}` is empty")]
    EmptySequence { field: String },

    #[error("failed to serialize statement: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = StatementError::NotADocument {
            field: "filter".into(),
        };
        assert_eq!(err.to_string(), "expected a document in `filter`");

        let err = StatementError::EmptySequence {
            field: "updates".into(),
        };
        assert_eq!(err.to_string(), "`updates` is empty");

        let err = CommandError::NotADocument("array");
        assert_eq!(err.to_string(), "command must be a document, got array");
    }
}
