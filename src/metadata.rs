//! Metadata fields: reserved top-level keys that control engine-level
//! document behaviour rather than describing data fields.

use std::sync::Arc;

use semver::Version;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::context::ParserContext;
use crate::error::MappingError;
use crate::node::{node_boolean, node_string, node_string_list, take, RawNode};
use crate::registry::MetadataFieldParser;

pub const ROUTING_FIELD: &str = "_routing";
pub const SOURCE_FIELD: &str = "_source";
pub const PARENT_FIELD: &str = "_parent";

/// Every built-in metadata field parser, in serialization order.
pub fn builtin_metadata_parsers() -> Vec<(&'static str, Arc<dyn MetadataFieldParser>)> {
    let parsers: [(&'static str, Arc<dyn MetadataFieldParser>); 3] = [
        (SOURCE_FIELD, Arc::new(SourceFieldParser)),
        (ROUTING_FIELD, Arc::new(RoutingFieldParser)),
        (PARENT_FIELD, Arc::new(ParentFieldParser)),
    ];
    parsers.into()
}

#[derive(Debug, Clone, PartialEq)]
/// A parsed metadata field.
pub enum MetadataFieldMapper {
    Routing(RoutingFieldMapper),
    Source(SourceFieldMapper),
    Parent(ParentFieldMapper),
}

impl MetadataFieldMapper {
    pub fn to_json(&self) -> JsonValue {
        let mut out = JsonMap::new();
        match self {
            MetadataFieldMapper::Routing(m) => {
                if m.required {
                    out.insert("required".to_string(), JsonValue::Bool(true));
                }
            }
            MetadataFieldMapper::Source(m) => {
                if !m.enabled {
                    out.insert("enabled".to_string(), JsonValue::Bool(false));
                }
                if !m.includes.is_empty() {
                    out.insert("includes".to_string(), string_array(&m.includes));
                }
                if !m.excludes.is_empty() {
                    out.insert("excludes".to_string(), string_array(&m.excludes));
                }
            }
            MetadataFieldMapper::Parent(m) => {
                out.insert("type".to_string(), JsonValue::from(m.parent_type.as_str()));
                if !m.eager_global_ordinals {
                    out.insert("eager_global_ordinals".to_string(), JsonValue::Bool(false));
                }
            }
        }
        JsonValue::Object(out)
    }
}

fn string_array(values: &[String]) -> JsonValue {
    JsonValue::Array(values.iter().map(|v| JsonValue::from(v.as_str())).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingFieldMapper {
    /// Whether every indexed document must carry a routing value.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFieldMapper {
    pub enabled: bool,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl Default for SourceFieldMapper {
    fn default() -> Self {
        Self {
            enabled: true,
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentFieldMapper {
    /// Type of the parent documents.
    pub parent_type: String,
    pub eager_global_ordinals: bool,
}

pub struct RoutingFieldParser;

impl MetadataFieldParser for RoutingFieldParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<MetadataFieldMapper, MappingError> {
        let mut mapper = RoutingFieldMapper::default();
        if let Some(value) = take(node, "required") {
            mapper.required = node_boolean(name, "required", &value, ctx.index_version_created())?;
        }
        Ok(MetadataFieldMapper::Routing(mapper))
    }
}

pub struct SourceFieldParser;

impl MetadataFieldParser for SourceFieldParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<MetadataFieldMapper, MappingError> {
        let mut mapper = SourceFieldMapper::default();
        if let Some(value) = take(node, "enabled") {
            mapper.enabled = node_boolean(name, "enabled", &value, ctx.index_version_created())?;
        }
        if let Some(value) = take(node, "includes") {
            mapper.includes = node_string_list(name, "includes", &value)?;
        }
        if let Some(value) = take(node, "excludes") {
            mapper.excludes = node_string_list(name, "excludes", &value)?;
        }
        Ok(MetadataFieldMapper::Source(mapper))
    }
}

/// Parent/child linkage. Reads `type` in place; the document parser drops it.
pub struct ParentFieldParser;

impl MetadataFieldParser for ParentFieldParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<MetadataFieldMapper, MappingError> {
        let parent_type = match node.get("type") {
            Some(value) => node_string(name, "type", value)?,
            None => {
                return Err(MappingError::MalformedField(format!(
                    "[{name}] must be an object containing [type]"
                )))
            }
        };
        let eager_global_ordinals = take(node, "eager_global_ordinals")
            .map(|value| {
                node_boolean(name, "eager_global_ordinals", &value, ctx.index_version_created())
            })
            .transpose()?
            .unwrap_or(true);
        Ok(MetadataFieldMapper::Parent(ParentFieldMapper {
            parent_type,
            eager_global_ordinals,
        }))
    }

    fn is_supported(&self, version: &Version) -> bool {
        version.major < 7
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::settings::IndexSettings;
    use crate::DocumentMapperParser;

    fn run(parser: &dyn MetadataFieldParser, name: &str, value: JsonValue) -> (Result<MetadataFieldMapper, MappingError>, RawNode) {
        let doc_parser = DocumentMapperParser::from_settings(IndexSettings::new("test")).unwrap();
        let ctx = doc_parser.parser_context();
        let mut node = value.as_object().cloned().unwrap();
        let result = parser.parse(name, &mut node, &ctx);
        (result, node)
    }

    #[test]
    fn routing_reads_required() {
        let (result, rest) = run(&RoutingFieldParser, "_routing", json!({"required": true}));
        assert_eq!(
            result.unwrap(),
            MetadataFieldMapper::Routing(RoutingFieldMapper { required: true })
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn source_reads_filters() {
        let (result, _) = run(
            &SourceFieldParser,
            "_source",
            json!({"includes": "meta.*", "excludes": ["secret", "raw"]}),
        );
        let MetadataFieldMapper::Source(m) = result.unwrap() else {
            panic!("expected _source");
        };
        assert!(m.enabled);
        assert_eq!(m.includes, vec!["meta.*"]);
        assert_eq!(m.excludes, vec!["secret", "raw"]);
    }

    #[test]
    fn parent_requires_type_and_leaves_it_in_place() {
        let (result, rest) = run(&ParentFieldParser, "_parent", json!({"type": "question"}));
        let MetadataFieldMapper::Parent(m) = result.unwrap() else {
            panic!("expected _parent");
        };
        assert_eq!(m.parent_type, "question");
        assert!(rest.contains_key("type"));

        let (result, _) = run(&ParentFieldParser, "_parent", json!({}));
        assert_eq!(
            result.unwrap_err().to_string(),
            "malformed field: [_parent] must be an object containing [type]"
        );
    }

    #[test]
    fn defaults_serialize_empty() {
        let routing = MetadataFieldMapper::Routing(RoutingFieldMapper::default());
        assert_eq!(routing.to_json(), json!({}));
        let source = MetadataFieldMapper::Source(SourceFieldMapper::default());
        assert_eq!(source.to_json(), json!({}));
    }
}
