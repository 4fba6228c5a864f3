//! Redacted `db.statement` text built from an outgoing command.
//!
//! Only a fixed set of top-level fields is copied into the statement, in a
//! fixed order. Fields that can carry application data are masked: every
//! scalar leaf becomes `"?"` when obfuscation is on, and internal protocol
//! keys are dropped at every depth regardless.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::command::{Command, InternalKeys};
use crate::error::StatementError;

/// Replacement for obfuscated scalar values.
pub const PLACEHOLDER: &str = "?";

/// Appended to `updates`/`deletes` when more than one element was sent.
pub const TRIM_MARKER: &str = "...";

/// How a top-level command field is carried into the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Treatment {
    /// Copied as is.
    Verbatim,
    /// Masked key by key.
    Mask,
    /// Masked, but only for commands listed in [`MASKED_BY_COMMAND`].
    MaskForCommands,
    /// First element masked, the rest replaced by [`TRIM_MARKER`].
    MaskAndTrim,
    /// Every element masked, nothing trimmed.
    MaskEach,
}

// Order here is the order fields appear in the statement.
const STATEMENT_FIELDS: [(&str, Treatment); 10] = [
    ("key", Treatment::Verbatim),
    ("query", Treatment::Mask),
    ("filter", Treatment::Mask),
    ("sort", Treatment::Verbatim),
    ("new", Treatment::Verbatim),
    ("update", Treatment::MaskForCommands),
    ("remove", Treatment::Verbatim),
    ("updates", Treatment::MaskAndTrim),
    ("deletes", Treatment::MaskAndTrim),
    ("pipeline", Treatment::MaskEach),
];

/// Command name -> top-level fields that are masked into the statement for
/// that command only.
static MASKED_BY_COMMAND: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| HashMap::from([("findAndModify", &["update"][..])]));

static DEFAULT_INTERNAL_KEYS: Lazy<InternalKeys> = Lazy::new(InternalKeys::default);

/// Builds the `db.statement` attribute for one command.
///
/// # Example
///
/// ```rust
/// use mongodb_tracing::{Command, StatementBuilder};
/// use serde_json::json;
///
/// let command = Command::try_from(json!({"find": "orders", "filter": {"a": 1}})).unwrap();
/// let statement = StatementBuilder::new(&command, true).build();
/// assert_eq!(statement.as_deref(), Some(r#"{"filter":{"a":"?"}}"#));
/// ```
#[derive(Debug, Clone)]
pub struct StatementBuilder<'a> {
    command: &'a Command,
    command_name: Option<&'a str>,
    collection: Option<&'a Value>,
    obfuscate: bool,
    internal_keys: &'a InternalKeys,
    max_length: Option<usize>,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(command: &'a Command, obfuscate: bool) -> Self {
        Self {
            command,
            command_name: command.command_name(),
            collection: command.collection(),
            obfuscate,
            internal_keys: &DEFAULT_INTERNAL_KEYS,
            max_length: None,
        }
    }

    /// Use a different set of keys to drop.
    pub fn with_internal_keys(mut self, keys: &'a InternalKeys) -> Self {
        self.internal_keys = keys;
        self
    }

    /// Cut the statement text to at most this many bytes.
    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    /// Build the statement, or `None` when there is nothing to report or the
    /// command could not be masked.
    pub fn build(&self) -> Option<String> {
        match self.try_build() {
            Ok(statement) => statement,
            Err(e) => {
                tracing::debug!(
                    command = self.command_name.unwrap_or_default(),
                    error = %e,
                    "Skipping db.statement"
                );
                None
            }
        }
    }

    /// Like [`build`](Self::build), but reports why masking failed.
    pub fn try_build(&self) -> Result<Option<String>, StatementError> {
        let statement = self.statement()?;
        if statement.is_empty() {
            return Ok(None);
        }

        let text = serde_json::to_string(&statement)?;
        let text = match self.max_length {
            Some(max) => truncate(text, max),
            None => text,
        };
        Ok((!text.is_empty()).then_some(text))
    }

    fn statement(&self) -> Result<Map<String, Value>, StatementError> {
        let mut statement = Map::new();

        for (field, treatment) in STATEMENT_FIELDS {
            let Some(value) = self.command.get(field) else {
                continue;
            };

            let projected = match treatment {
                Treatment::Verbatim => value.clone(),
                Treatment::Mask => self.mask(field, value)?,
                Treatment::MaskForCommands => {
                    if !self.masked_for_command(field) {
                        continue;
                    }
                    self.mask(field, value)?
                }
                Treatment::MaskAndTrim => self.mask_and_trim(field, value)?,
                Treatment::MaskEach => self.mask_each(field, value)?,
            };
            statement.insert(field.to_string(), projected);
        }

        Ok(statement)
    }

    fn masked_for_command(&self, field: &str) -> bool {
        self.command_name
            .and_then(|name| MASKED_BY_COMMAND.get(name))
            .is_some_and(|fields| fields.iter().any(|eligible| *eligible == field))
    }

    fn mask(&self, field: &str, value: &Value) -> Result<Value, StatementError> {
        match value {
            Value::Object(document) => Ok(Value::Object(self.mask_document(document))),
            _ => Err(StatementError::NotADocument {
                field: field.to_string(),
            }),
        }
    }

    fn mask_document(&self, document: &Map<String, Value>) -> Map<String, Value> {
        document
            .iter()
            .filter(|(key, _)| !self.internal_keys.contains(key))
            .map(|(key, value)| {
                let masked = match value {
                    Value::Object(inner) => Value::Object(self.mask_document(inner)),
                    Value::Array(items) => Value::Array(self.mask_sequence(key, items)),
                    scalar => self.mask_value(key, scalar),
                };
                (key.clone(), masked)
            })
            .collect()
    }

    // Scalars inside an array are masked under the key that holds the array.
    fn mask_sequence(&self, key: &str, items: &[Value]) -> Vec<Value> {
        items
            .iter()
            .map(|item| match item {
                Value::Object(inner) => Value::Object(self.mask_document(inner)),
                Value::Array(inner) => Value::Array(self.mask_sequence(key, inner)),
                scalar => self.mask_value(key, scalar),
            })
            .collect()
    }

    fn mask_value(&self, key: &str, value: &Value) -> Value {
        // The namespace stays readable wherever it recurs under the verb.
        if self.command_name == Some(key) && self.collection == Some(value) {
            value.clone()
        } else if self.obfuscate {
            Value::String(PLACEHOLDER.to_string())
        } else {
            value.clone()
        }
    }

    fn mask_and_trim(&self, field: &str, value: &Value) -> Result<Value, StatementError> {
        let items = as_sequence(field, value)?;
        let first = items.first().ok_or_else(|| StatementError::EmptySequence {
            field: field.to_string(),
        })?;

        let mut trimmed = vec![self.mask(field, first)?];
        if items.len() > 1 {
            trimmed.push(Value::String(TRIM_MARKER.to_string()));
        }
        Ok(Value::Array(trimmed))
    }

    fn mask_each(&self, field: &str, value: &Value) -> Result<Value, StatementError> {
        as_sequence(field, value)?
            .iter()
            .map(|stage| self.mask(field, stage))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

fn as_sequence<'v>(field: &str, value: &'v Value) -> Result<&'v [Value], StatementError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| StatementError::NotASequence {
            field: field.to_string(),
        })
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
