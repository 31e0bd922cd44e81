//! Value coercion between plan/state documents and API payloads.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Placeholder the API returns instead of secret values.
pub const REDACTED: &str = "******";

/// Decode a plan or state document into its typed model.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::Validation(e.to_string()))
}

/// `Some(planned)` when it differs from `prior`; used to build selective
/// PATCH bodies.
pub fn changed<T: PartialEq + Clone>(prior: &T, planned: &T) -> Option<T> {
    (prior != planned).then(|| planned.clone())
}

/// Like [`changed`] for optional attributes where clearing means sending
/// the empty value.
pub fn changed_or_cleared(prior: &Option<String>, planned: &Option<String>) -> Option<String> {
    if prior == planned {
        None
    } else {
        Some(planned.clone().unwrap_or_default())
    }
}

/// Treat empty strings from the API as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Merge a remote document into the locally held one.
///
/// * Redacted remote values keep the local value.
/// * Only keys the local document tracks are kept, so server-side defaults
///   do not show up as drift.
/// * A null local document (import) takes the remote one as-is.
pub fn merge_remote(local: &Value, remote: &Value) -> Value {
    match (local, remote) {
        (Value::Null, _) => remote.clone(),
        (_, Value::String(s)) if s == REDACTED => local.clone(),
        (Value::Object(local_map), Value::Object(remote_map)) => {
            let merged: Map<String, Value> = local_map
                .iter()
                .map(|(key, local_value)| {
                    let value = match remote_map.get(key) {
                        Some(remote_value) => merge_remote(local_value, remote_value),
                        None => local_value.clone(),
                    };
                    (key.clone(), value)
                })
                .collect();
            Value::Object(merged)
        }
        (_, Value::Null) => local.clone(),
        _ => remote.clone(),
    }
}

/// Keys of `planned` whose values differ from `prior`, as an object ready to
/// be sent. `None` when nothing changed.
pub fn object_diff(prior: &Value, planned: &Value) -> Option<Value> {
    let planned_map = planned.as_object()?;
    let empty = Map::new();
    let prior_map = prior.as_object().unwrap_or(&empty);

    let diff: Map<String, Value> = planned_map
        .iter()
        .filter(|(key, value)| prior_map.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if diff.is_empty() {
        None
    } else {
        Some(Value::Object(diff))
    }
}

/// Null and the empty object both mean "no config".
pub fn is_empty_object(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacted_values_keep_local_plaintext() {
        let local = json!({"host": "db.example.com", "password": "hunter2", "port": 5432});
        let remote = json!({"host": "db.example.com", "password": "******", "port": 5432});
        assert_eq!(merge_remote(&local, &remote), local);
    }

    #[test]
    fn test_remote_changes_are_reported() {
        let local = json!({"host": "db.example.com", "port": 5432});
        let remote = json!({"host": "db2.example.com", "port": 5432, "server_default": true});
        assert_eq!(
            merge_remote(&local, &remote),
            json!({"host": "db2.example.com", "port": 5432})
        );
    }

    #[test]
    fn test_import_takes_remote() {
        let remote = json!({"host": "db.example.com", "password": "******"});
        assert_eq!(merge_remote(&Value::Null, &remote), remote);
    }

    #[test]
    fn test_nested_redaction() {
        let local = json!({"tunnel": {"user": "u", "private_key": "KEY"}});
        let remote = json!({"tunnel": {"user": "u", "private_key": "******"}});
        assert_eq!(merge_remote(&local, &remote), local);
    }

    #[test]
    fn test_object_diff() {
        let prior = json!({"host": "a", "port": 1});
        let planned = json!({"host": "b", "port": 1, "user": "x"});
        assert_eq!(
            object_diff(&prior, &planned),
            Some(json!({"host": "b", "user": "x"}))
        );
        assert_eq!(object_diff(&planned, &planned), None);
    }

    #[test]
    fn test_changed_helpers() {
        assert_eq!(changed(&"a".to_string(), &"b".to_string()), Some("b".to_string()));
        assert_eq!(changed(&1, &1), None);
        assert_eq!(
            changed_or_cleared(&Some("+1".to_string()), &None),
            Some(String::new())
        );
        assert_eq!(non_empty(Some(String::new())), None);
    }
}
