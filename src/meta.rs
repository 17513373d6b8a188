//! The opaque `_meta` block attached to a mapping.
//!
//! Its content is never interpreted, but its key order is preserved exactly:
//! mapping sources are compared byte for byte between nodes, so any reordering
//! would surface as a spurious mapping difference.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::node::RawNode;

/// Reserved top-level key holding the opaque block.
pub const META_FIELD: &str = "_meta";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
/// Read-only, insertion-ordered copy of a `_meta` object.
pub struct MetaBlock(IndexMap<String, JsonValue>);

impl MetaBlock {
    /// Takes ownership of a decoded `_meta` node. Nested objects keep their order too.
    pub fn from_node(node: RawNode) -> Self {
        Self(node.into_iter().collect())
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
