//! Error definitions for every mapping parse stage.

use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum MappingError {
    /// No type name could be derived from the caller input or the document shape.
    #[error("missing type: {0}")]
    MissingType(String),
    /// A reserved top-level field carries something other than an object.
    #[error("malformed field: {0}")]
    MalformedField(String),
    /// The decoded document does not have the expected shape.
    #[error("malformed mapping: {0}")]
    MalformedMapping(String),
    /// A field node still holds keys after its parser consumed the ones it knows.
    #[error(
        "Mapping definition for [{field}] has unsupported parameters: {}",
        render_remaining(.remaining)
    )]
    UnsupportedFieldParameters {
        field: String,
        remaining: Vec<(String, JsonValue)>,
    },
    /// A whole-document (or otherwise custom-scoped) node still holds keys.
    #[error("{message}{}", render_remaining(.remaining))]
    UnsupportedParameters {
        message: String,
        remaining: Vec<(String, JsonValue)>,
    },
    /// Grammar failure reported by a field-tree or metadata-field parser.
    #[error("mapper parsing error: {0}")]
    MapperParsing(String),
    /// The mapping source is not a valid JSON object.
    #[error("failed to parse mapping source: {0}")]
    Decode(String),
    /// A parser registration clashed with an existing one or a reserved name.
    #[error("registry error: {0}")]
    Registry(String),
    /// Index settings could not be loaded or are invalid.
    #[error("settings error: {0}")]
    Settings(String),
    /// A mapping source digest did not match the expected value.
    #[error("digest error: {0}")]
    DigestMismatch(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Filesystem I/O error from the CLI or settings loading.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MappingError {
    /// Keys left over in an unsupported-parameters error, in document order.
    pub fn remaining_keys(&self) -> Vec<&str> {
        match self {
            MappingError::UnsupportedFieldParameters { remaining, .. }
            | MappingError::UnsupportedParameters { remaining, .. } => {
                remaining.iter().map(|(key, _)| key.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Renders leftover entries as ` [key : value]` pairs.
///
/// Strings are written without quotes, everything else as compact JSON.
pub(crate) fn render_remaining(remaining: &[(String, JsonValue)]) -> String {
    let mut out = String::new();
    for (key, value) in remaining {
        out.push_str(" [");
        out.push_str(key);
        out.push_str(" : ");
        match value {
            JsonValue::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
        out.push(']');
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_field_scoped_message() {
        let err = MappingError::UnsupportedFieldParameters {
            field: "_routing".to_string(),
            remaining: vec![
                ("foo".to_string(), json!("bar")),
                ("n".to_string(), json!(1)),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Mapping definition for [_routing] has unsupported parameters:  [foo : bar] [n : 1]"
        );
        assert_eq!(err.remaining_keys(), vec!["foo", "n"]);
    }

    #[test]
    fn renders_nested_values_as_json() {
        let err = MappingError::UnsupportedParameters {
            message: "Root mapping definition has unsupported parameters: ".to_string(),
            remaining: vec![("x".to_string(), json!({"a": [1, "b"]}))],
        };
        assert_eq!(
            err.to_string(),
            "Root mapping definition has unsupported parameters:  [x : {\"a\":[1,\"b\"]}]"
        );
    }
}
