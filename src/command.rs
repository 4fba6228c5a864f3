//! Outgoing command documents and the protocol's internal key set.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{kind_of, CommandError};

/// Field names the wire protocol adds for its own bookkeeping.
pub const DEFAULT_INTERNAL_KEYS: [&str; 5] = ["$clusterTime", "$db", "lsid", "signature", "txnNumber"];

/// One outgoing database command, prior to wire encoding.
///
/// Key order is preserved. By convention the first pair is the command verb
/// and the namespace it targets, e.g. `{"find": "orders", ...}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    fields: Map<String, Value>,
}

impl Command {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The first key/value pair: command verb and namespace.
    pub fn first(&self) -> Option<(&str, &Value)> {
        self.fields.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    pub fn command_name(&self) -> Option<&str> {
        self.first().map(|(name, _)| name)
    }

    /// The value paired with the command verb. Usually the collection name,
    /// but it may be `1` (`{"ping": 1}`) or a cursor id (`getMore`).
    pub fn collection(&self) -> Option<&Value> {
        self.first().map(|(_, value)| value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }

    /// Generate a span name from the command.
    ///
    /// Format: "{verb} {database}.{collection}", "{verb} {collection}" or
    /// "{verb}" when the namespace is not a string.
    pub fn span_name(&self, database: Option<&str>) -> String {
        let Some((verb, target)) = self.first() else {
            return "command".to_string();
        };

        match (target.as_str(), database) {
            (Some(collection), Some(db)) => format!("{} {}.{}", verb, db, collection),
            (Some(collection), None) => format!("{} {}", verb, collection),
            (None, _) => verb.to_string(),
        }
    }
}

impl From<Map<String, Value>> for Command {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl TryFrom<Value> for Command {
    type Error = CommandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(CommandError::NotADocument(kind_of(&other))),
        }
    }
}

/// Field names that must never appear in a statement, at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKeys {
    keys: HashSet<String>,
}

impl InternalKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Default for InternalKeys {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_KEYS)
    }
}

impl<S: Into<String>> FromIterator<S> for InternalKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command(value: Value) -> Command {
        Command::try_from(value).unwrap()
    }

    #[test]
    fn test_first_pair_is_verb_and_namespace() {
        let cmd = command(json!({"find": "orders", "filter": {"a": 1}}));
        assert_eq!(cmd.command_name(), Some("find"));
        assert_eq!(cmd.collection(), Some(&json!("orders")));
        assert_eq!(cmd.len(), 2);
    }

    #[test]
    fn test_order_is_preserved() {
        let cmd = command(json!({"update": "orders", "updates": [], "ordered": true}));
        let keys: Vec<_> = cmd.into_inner().keys().cloned().collect();
        assert_eq!(keys, vec!["update", "updates", "ordered"]);
    }

    #[test]
    fn test_empty_command() {
        let cmd = Command::default();
        assert!(cmd.is_empty());
        assert_eq!(cmd.first(), None);
        assert_eq!(cmd.span_name(None), "command");
    }

    #[test]
    fn test_rejects_non_document() {
        let err = Command::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, CommandError::NotADocument("array")));
    }

    #[test]
    fn test_span_name() {
        let cmd = command(json!({"find": "orders"}));
        assert_eq!(cmd.span_name(Some("shop")), "find shop.orders");
        assert_eq!(cmd.span_name(None), "find orders");

        let cmd = command(json!({"ping": 1}));
        assert_eq!(cmd.span_name(Some("admin")), "ping");
    }

    #[test]
    fn test_internal_keys() {
        let keys = InternalKeys::default();
        assert!(keys.contains("lsid"));
        assert!(keys.contains("$clusterTime"));
        assert!(!keys.contains("filter"));

        let custom: InternalKeys = ["secret"].into_iter().collect();
        assert!(custom.contains("secret"));
        assert!(!custom.contains("lsid"));
    }
}
