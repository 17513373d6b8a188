//! Raw mapping nodes and the strict "no leftover keys" validator.
//!
//! A [`RawNode`] is one level of the client-supplied mapping document. Parsers
//! consume it destructively: every key they recognize is removed, so whatever
//! is left at the end is by definition unsupported and rejected by
//! [`check_no_remaining_fields`].

use semver::Version;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::MappingError;

/// Insertion-ordered JSON object used as the parse working set.
pub type RawNode = JsonMap<String, JsonValue>;

/// Fails when `node` still holds keys after the parser for `field_name` ran.
pub fn check_no_remaining_fields(field_name: &str, node: &RawNode) -> Result<(), MappingError> {
    if node.is_empty() {
        return Ok(());
    }
    Err(MappingError::UnsupportedFieldParameters {
        field: field_name.to_string(),
        remaining: remaining_fields(node),
    })
}

/// Fails with `message` followed by every leftover `[key : value]` pair.
pub fn check_no_remaining_fields_with_message(
    node: &RawNode,
    message: &str,
) -> Result<(), MappingError> {
    if node.is_empty() {
        return Ok(());
    }
    Err(MappingError::UnsupportedParameters {
        message: message.to_string(),
        remaining: remaining_fields(node),
    })
}

fn remaining_fields(node: &RawNode) -> Vec<(String, JsonValue)> {
    node.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Removes `key` from `node` without disturbing the order of the other keys.
pub fn take(node: &mut RawNode, key: &str) -> Option<JsonValue> {
    node.shift_remove(key)
}

/// Requires `value` to be an object and hands it back as an owned node.
pub fn into_node(value: JsonValue, on_error: impl FnOnce() -> MappingError) -> Result<RawNode, MappingError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(on_error()),
    }
}

/// Short human label for the JSON kind of `value`, used in diagnostics.
pub fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Reads a boolean mapping option.
///
/// Indices created on 6.0.0 or later only accept `true`/`false` (as JSON
/// booleans or strings). Older indices also accept the legacy lenient forms.
pub fn node_boolean(
    field_name: &str,
    key: &str,
    value: &JsonValue,
    version: &Version,
) -> Result<bool, MappingError> {
    match value {
        JsonValue::Bool(b) => return Ok(*b),
        JsonValue::String(s) if s == "true" => return Ok(true),
        JsonValue::String(s) if s == "false" => return Ok(false),
        _ => {}
    }

    if version.major < 6 {
        let lenient = match value {
            JsonValue::String(s) => match s.as_str() {
                "yes" | "on" | "1" => Some(true),
                "no" | "off" | "0" | "" => Some(false),
                _ => None,
            },
            JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        };
        if let Some(b) = lenient {
            return Ok(b);
        }
    }

    Err(MappingError::MapperParsing(format!(
        "Failed to parse value [{}] for [{key}] on field [{field_name}], only [true] or [false] are allowed",
        render_scalar(value)
    )))
}

/// Reads a string option. Numbers and booleans are accepted in their text form.
pub fn node_string(field_name: &str, key: &str, value: &JsonValue) -> Result<String, MappingError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        other => Err(MappingError::MapperParsing(format!(
            "[{key}] on field [{field_name}] must be a string but got a {}",
            kind_name(other)
        ))),
    }
}

/// Reads a non-negative integer option.
pub fn node_u64(field_name: &str, key: &str, value: &JsonValue) -> Result<u64, MappingError> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        MappingError::MapperParsing(format!(
            "[{key}] on field [{field_name}] must be a non-negative integer but got [{}]",
            render_scalar(value)
        ))
    })
}

/// Reads a single string or a list of strings.
pub fn node_string_list(
    field_name: &str,
    key: &str,
    value: &JsonValue,
) -> Result<Vec<String>, MappingError> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| node_string(field_name, key, item))
            .collect(),
        other => Ok(vec![node_string(field_name, key, other)?]),
    }
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(value: JsonValue) -> RawNode {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_node_passes_validation() {
        assert!(check_no_remaining_fields("f", &RawNode::new()).is_ok());
        assert!(check_no_remaining_fields_with_message(&RawNode::new(), "root: ").is_ok());
    }

    #[test]
    fn leftover_keys_are_listed_in_document_order() {
        let n = node(json!({"zeta": 1, "alpha": "x"}));
        let err = check_no_remaining_fields("title", &n).unwrap_err();
        assert_eq!(err.remaining_keys(), vec!["zeta", "alpha"]);
        assert!(err
            .to_string()
            .ends_with("has unsupported parameters:  [zeta : 1] [alpha : x]"));
    }

    #[test]
    fn custom_message_is_used_verbatim() {
        let n = node(json!({"bogus": true}));
        let err = check_no_remaining_fields_with_message(&n, "custom: ").unwrap_err();
        assert_eq!(err.to_string(), "custom:  [bogus : true]");
    }

    #[test]
    fn take_keeps_order_of_the_rest() {
        let mut n = node(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(take(&mut n, "a"), Some(json!(1)));
        assert_eq!(n.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(take(&mut n, "missing"), None);
    }

    #[test]
    fn booleans_are_strict_on_new_indices() {
        let v6 = Version::new(6, 8, 0);
        assert!(node_boolean("f", "index", &json!("true"), &v6).unwrap());
        let err = node_boolean("f", "index", &json!("yes"), &v6).unwrap_err();
        assert!(err.to_string().contains("only [true] or [false] are allowed"));
    }

    #[test]
    fn booleans_are_lenient_on_old_indices() {
        let v5 = Version::new(5, 6, 0);
        assert!(node_boolean("f", "index", &json!("yes"), &v5).unwrap());
        assert!(!node_boolean("f", "index", &json!("off"), &v5).unwrap());
        assert!(!node_boolean("f", "index", &json!(0), &v5).unwrap());
        assert!(node_boolean("f", "index", &json!("maybe"), &v5).is_err());
    }

    #[test]
    fn string_list_accepts_single_string() {
        assert_eq!(
            node_string_list("_source", "includes", &json!("a.*")).unwrap(),
            vec!["a.*".to_string()]
        );
        assert!(node_string_list("_source", "includes", &json!([{}])).is_err());
    }
}
