//! Mapping definition parser: turns a raw mapping document into a [`DocumentMapper`].
//!
//! One parse resolves the type name, lets the root structure parser consume the
//! field tree, extracts reserved metadata fields and the opaque `_meta` block,
//! and rejects every key nobody recognized.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use semver::Version;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::context::ParserContext;
use crate::document::{DocumentMapper, DocumentMapperBuilder};
use crate::error::MappingError;
use crate::meta::{MetaBlock, META_FIELD};
use crate::node::{
    check_no_remaining_fields, check_no_remaining_fields_with_message, into_node, kind_name,
    take, RawNode,
};
use crate::object::{RootObjectParser, RootStructureParser};
use crate::registry::{MapperRegistry, MetadataFieldParser, MetadataFieldParsers, TypeParsers};
use crate::services::{
    MapperService, MappingService, QueryContext, QueryContextSupplier, ScriptService,
    SimilarityService,
};
use crate::settings::{DateFormatter, IndexSettings};
use crate::source::MappingSource;

/// Prefix of the error raised for unrecognized top-level keys.
pub const ROOT_UNSUPPORTED_MESSAGE: &str = "Root mapping definition has unsupported parameters: ";

/// Parses mapping definitions for one index.
///
/// Cheap to clone; every collaborator is shared behind an `Arc` and never
/// mutated, so one parser can serve concurrent parses.
#[derive(Clone)]
pub struct DocumentMapperParser {
    mapping_service: Arc<dyn MappingService>,
    similarity_service: Arc<SimilarityService>,
    query_context_supplier: QueryContextSupplier,
    script_service: Arc<ScriptService>,
    root_parser: Arc<dyn RootStructureParser>,
    index_version_created: Version,
    type_parsers: Arc<TypeParsers>,
    metadata_parsers: Arc<MetadataFieldParsers>,
}

impl DocumentMapperParser {
    pub fn new(
        mapping_service: Arc<dyn MappingService>,
        similarity_service: Arc<SimilarityService>,
        registry: &MapperRegistry,
        query_context_supplier: QueryContextSupplier,
        script_service: Arc<ScriptService>,
    ) -> Self {
        let index_version_created = mapping_service.index_settings().version_created.clone();
        let metadata_parsers = registry.metadata_mapper_parsers(&index_version_created);
        Self {
            mapping_service,
            similarity_service,
            query_context_supplier,
            script_service,
            root_parser: Arc::new(RootObjectParser),
            index_version_created,
            type_parsers: Arc::new(registry.mapper_parsers().clone()),
            metadata_parsers: Arc::new(metadata_parsers),
        }
    }

    /// Parser with built-in registries and services for an index with `settings`.
    pub fn from_settings(settings: IndexSettings) -> Result<Self, MappingError> {
        let index_name = settings.index_name.clone();
        let mapping_service = MapperService::new(settings)?;
        let query_context_supplier = QueryContextSupplier::new(move || QueryContext {
            index_name: index_name.clone(),
            now_millis: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
                .unwrap_or_default(),
        });
        Ok(Self::new(
            Arc::new(mapping_service),
            Arc::new(SimilarityService::default()),
            &MapperRegistry::builtin(),
            query_context_supplier,
            Arc::new(ScriptService::default()),
        ))
    }

    /// Replaces the root structure parser.
    pub fn with_root_parser(mut self, root_parser: Arc<dyn RootStructureParser>) -> Self {
        self.root_parser = root_parser;
        self
    }

    pub fn index_version_created(&self) -> &Version {
        &self.index_version_created
    }

    /// Reserved metadata field names this parser recognizes, in registry order.
    pub fn metadata_field_names(&self) -> impl Iterator<Item = &str> {
        self.metadata_parsers.keys().map(String::as_str)
    }

    pub fn parser_context(&self) -> ParserContext<'_> {
        self.context(None)
    }

    /// Context whose `date` fields default to `date_formatter`.
    pub fn parser_context_with_date_format<'a>(
        &'a self,
        date_formatter: &'a DateFormatter,
    ) -> ParserContext<'a> {
        self.context(Some(date_formatter))
    }

    fn context<'a>(&'a self, date_formatter: Option<&'a DateFormatter>) -> ParserContext<'a> {
        ParserContext::new(
            &self.similarity_service,
            self.mapping_service.as_ref(),
            &self.type_parsers,
            &self.index_version_created,
            &self.query_context_supplier,
            date_formatter,
            &self.script_service,
        )
    }

    /// Parses a serialized mapping. A missing source is an empty mapping under `type_name`.
    pub fn parse(
        &self,
        type_name: Option<&str>,
        source: Option<&MappingSource>,
    ) -> Result<DocumentMapper, MappingError> {
        match source {
            Some(source) => self.resolve_and_parse(type_name, source.decode()?),
            None => self.parse_mapping(type_name.map(str::to_string), RawNode::new()),
        }
    }

    pub fn parse_str(
        &self,
        type_name: Option<&str>,
        input: &str,
    ) -> Result<DocumentMapper, MappingError> {
        self.parse(type_name, Some(&MappingSource::from_json_str(input)))
    }

    /// Parses an already-decoded mapping. `value` must be an object.
    pub fn parse_value(
        &self,
        type_name: Option<&str>,
        value: JsonValue,
    ) -> Result<DocumentMapper, MappingError> {
        let kind = kind_name(&value);
        let mapping = into_node(value, || {
            MappingError::MalformedMapping(format!("mapping must be an object but got a {kind}"))
        })?;
        self.resolve_and_parse(type_name, mapping)
    }

    /// Resolves the type name from the caller and the document shape.
    ///
    /// The first top-level key is the implicit type name. It is adopted (and
    /// the mapping replaced by its value) when the caller gave no type, the
    /// same type, or one that resolves to it. Any other shape is parsed as is.
    fn resolve_and_parse(
        &self,
        type_name: Option<&str>,
        mut mapping: RawNode,
    ) -> Result<DocumentMapper, MappingError> {
        let Some(root_name) = mapping.keys().next().cloned() else {
            if type_name.is_none() {
                return Err(MappingError::MissingType(
                    "malformed mapping, no type name found".to_string(),
                ));
            }
            return self.parse_mapping(type_name.map(str::to_string), mapping);
        };

        let adopt = match type_name {
            None => true,
            Some(t) => t == root_name || self.mapping_service.resolve_document_type(t) == root_name,
        };
        if !adopt {
            return self.parse_mapping(type_name.map(str::to_string), mapping);
        }

        let inner = match take(&mut mapping, &root_name) {
            None | Some(JsonValue::Null) => RawNode::new(),
            Some(JsonValue::Object(inner)) => inner,
            Some(other) => {
                return Err(MappingError::MalformedMapping(format!(
                    "[{root_name}] must be an object but got a {}",
                    kind_name(&other)
                )))
            }
        };
        self.parse_mapping(Some(root_name), inner)
    }

    fn parse_mapping(
        &self,
        type_name: Option<String>,
        mut mapping: RawNode,
    ) -> Result<DocumentMapper, MappingError> {
        let type_name = type_name
            .ok_or_else(|| MappingError::MissingType("failed to derive type".to_string()))?;
        debug!(type_name = %type_name, keys = mapping.len(), "parsing mapping definition");

        let ctx = self.parser_context();
        let mut builder =
            DocumentMapperBuilder::new(self.root_parser.parse(&type_name, &mut mapping, &ctx)?);

        let mut metadata_fields: Vec<(String, &Arc<dyn MetadataFieldParser>, JsonValue)> =
            Vec::new();
        let mut meta = None;
        let mut leftover = RawNode::new();
        for (key, value) in mapping {
            if let Some(parser) = self.metadata_parsers.get(&key) {
                metadata_fields.push((key, parser, value));
            } else if key == META_FIELD {
                meta = Some(value);
            } else {
                leftover.insert(key, value);
            }
        }

        for (name, parser, value) in metadata_fields {
            let mut field_node = into_node(value, || {
                MappingError::MalformedField(format!("[{name}] must be an object"))
            })?;
            trace!(field = %name, "parsing metadata field");
            let mapper = parser.parse(&name, &mut field_node, &ctx)?;
            take(&mut field_node, "type");
            check_no_remaining_fields(&name, &field_node)?;
            builder.put(name, mapper);
        }

        if let Some(value) = meta {
            let kind = kind_name(&value);
            let node = into_node(value, || {
                MappingError::MalformedField(format!(
                    "[{META_FIELD}] must be an object but got a {kind}"
                ))
            })?;
            builder.meta(MetaBlock::from_node(node));
        }

        check_no_remaining_fields_with_message(&leftover, ROOT_UNSUPPORTED_MESSAGE)?;

        let mapper = builder.build(
            self.mapping_service.index_settings(),
            self,
            self.mapping_service.index_analyzers(),
        );
        debug!(
            type_name = %mapper.type_name(),
            fields = mapper.root().object().properties().len(),
            metadata_fields = mapper.metadata_mappers().len(),
            "built document mapper"
        );
        Ok(mapper)
    }
}

impl fmt::Debug for DocumentMapperParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentMapperParser")
            .field("index_version_created", &self.index_version_created)
            .field("type_parsers", &self.type_parsers.keys().collect::<Vec<_>>())
            .field(
                "metadata_parsers",
                &self.metadata_parsers.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn parser() -> DocumentMapperParser {
        DocumentMapperParser::from_settings(IndexSettings::new("test")).unwrap()
    }

    #[test]
    fn absent_source_needs_a_type() {
        let err = parser().parse(None, None).unwrap_err();
        assert!(matches!(err, MappingError::MissingType(_)));
        assert_eq!(err.to_string(), "missing type: failed to derive type");
        let mapper = parser().parse(Some("doc"), None).unwrap();
        assert_eq!(mapper.type_name(), "doc");
    }

    #[test]
    fn null_type_body_is_an_empty_mapping() {
        let mapper = parser().parse_value(None, json!({"doc": null})).unwrap();
        assert_eq!(mapper.type_name(), "doc");
        assert!(mapper.root().object().properties().is_empty());
    }

    #[test]
    fn scalar_type_body_is_rejected() {
        let err = parser().parse_value(None, json!({"doc": 3})).unwrap_err();
        assert!(matches!(err, MappingError::MalformedMapping(_)));
        assert!(err.to_string().contains("[doc] must be an object but got a number"));
    }

    #[test]
    fn non_object_value_is_rejected() {
        let err = parser().parse_value(Some("doc"), json!("x")).unwrap_err();
        assert!(err.to_string().contains("mapping must be an object but got a string"));
    }

    #[test]
    fn meta_must_be_an_object() {
        let err = parser()
            .parse_value(None, json!({"doc": {"_meta": [1]}}))
            .unwrap_err();
        assert!(matches!(err, MappingError::MalformedField(_)));
        assert!(err.to_string().contains("[_meta] must be an object but got a array"));
    }

    #[test]
    fn query_context_is_supplied_lazily() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let supplier = QueryContextSupplier::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            QueryContext {
                index_name: "test".to_string(),
                now_millis: 0,
            }
        });
        let parser = DocumentMapperParser::new(
            Arc::new(MapperService::new(IndexSettings::new("test")).unwrap()),
            Arc::new(SimilarityService::default()),
            &MapperRegistry::builtin(),
            supplier,
            Arc::new(ScriptService::default()),
        );

        parser
            .parse_value(None, json!({"doc": {"properties": {"a": {"type": "keyword"}}}}))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(parser.parser_context().query_context().index_name, "test");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn context_carries_creation_version() {
        let settings = IndexSettings::new("test").with_version_created(Version::new(5, 6, 0));
        let parser = DocumentMapperParser::from_settings(settings).unwrap();
        assert_eq!(
            parser.parser_context().index_version_created(),
            &Version::new(5, 6, 0)
        );
        assert!(parser.parser_context().date_formatter().is_none());
        assert!(parser.parser_context().type_parser("keyword").is_some());
        assert!(parser.parser_context().type_parser("nope").is_none());
        assert!(parser.parser_context().similarity("BM25").is_some());
    }
}
