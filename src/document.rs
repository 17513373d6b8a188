//! The finalized mapping artifact and the builder that accumulates it.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::MappingError;
use crate::field::FieldMapper;
use crate::meta::{MetaBlock, META_FIELD};
use crate::metadata::{MetadataFieldMapper, ROUTING_FIELD, SOURCE_FIELD};
use crate::node::RawNode;
use crate::object::{parse_field, Dynamic, RootObjectBuilder, RootObjectMapper};
use crate::parser::DocumentMapperParser;
use crate::settings::{Analyzer, IndexAnalyzers, IndexSettings};
use crate::source::MappingSource;

/// Accumulates one parse's results. Owned by a single parse and consumed by [`Self::build`].
#[derive(Debug)]
pub struct DocumentMapperBuilder {
    root: RootObjectBuilder,
    metadata: IndexMap<String, MetadataFieldMapper>,
    meta: Option<MetaBlock>,
}

impl DocumentMapperBuilder {
    pub fn new(root: RootObjectBuilder) -> Self {
        Self {
            root,
            metadata: IndexMap::new(),
            meta: None,
        }
    }

    /// Adds the mapper parsed for reserved field `name`.
    pub fn put(&mut self, name: impl Into<String>, mapper: MetadataFieldMapper) {
        self.metadata.insert(name.into(), mapper);
    }

    pub fn meta(&mut self, meta: MetaBlock) {
        self.meta = Some(meta);
    }

    /// Finalizes the mapper. Metadata fields are ordered as `parser` registers them.
    pub fn build(
        mut self,
        index_settings: Arc<IndexSettings>,
        parser: &DocumentMapperParser,
        analyzers: Arc<IndexAnalyzers>,
    ) -> DocumentMapper {
        let mut metadata = IndexMap::new();
        for name in parser.metadata_field_names() {
            if let Some(mapper) = self.metadata.shift_remove(name) {
                metadata.insert(name.to_string(), mapper);
            }
        }
        // Anything the parser does not know about keeps insertion order at the end.
        metadata.extend(self.metadata);

        DocumentMapper {
            root: self.root.build(),
            metadata,
            meta: self.meta,
            index_settings,
            analyzers,
            parser: parser.clone(),
        }
    }
}

/// Immutable, parsed mapping of one document type.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    root: RootObjectMapper,
    metadata: IndexMap<String, MetadataFieldMapper>,
    meta: Option<MetaBlock>,
    index_settings: Arc<IndexSettings>,
    analyzers: Arc<IndexAnalyzers>,
    parser: DocumentMapperParser,
}

impl DocumentMapper {
    pub fn type_name(&self) -> &str {
        self.root.name()
    }

    pub fn root(&self) -> &RootObjectMapper {
        &self.root
    }

    /// Explicitly configured metadata fields, in registry order.
    pub fn metadata_mappers(&self) -> &IndexMap<String, MetadataFieldMapper> {
        &self.metadata
    }

    pub fn metadata_mapper(&self, name: &str) -> Option<&MetadataFieldMapper> {
        self.metadata.get(name)
    }

    pub fn meta(&self) -> Option<&MetaBlock> {
        self.meta.as_ref()
    }

    pub fn index_settings(&self) -> &IndexSettings {
        &self.index_settings
    }

    pub fn routing_required(&self) -> bool {
        matches!(
            self.metadata.get(ROUTING_FIELD),
            Some(MetadataFieldMapper::Routing(m)) if m.required
        )
    }

    pub fn source_enabled(&self) -> bool {
        match self.metadata.get(SOURCE_FIELD) {
            Some(MetadataFieldMapper::Source(m)) => m.enabled,
            _ => true,
        }
    }

    /// Field at dotted `path`, e.g. `user.name`.
    pub fn field(&self, path: &str) -> Option<&FieldMapper> {
        self.root.object().field(path)
    }

    /// Index-time analyzer of a text field, falling back to the index default.
    pub fn index_analyzer(&self, path: &str) -> Option<&Analyzer> {
        match self.field(path)? {
            FieldMapper::Text(text) => match &text.analyzer {
                Some(name) => self.analyzers.get(name),
                None => Some(self.analyzers.default_analyzer()),
            },
            _ => None,
        }
    }

    /// Parses a field introduced dynamically by an incoming document.
    ///
    /// Date fields without an explicit format pick up the first of the root's
    /// `dynamic_date_formats`. Returns `Ok(None)` when the root ignores
    /// unmapped fields and fails when it is strict.
    pub fn parse_dynamic_field(
        &self,
        name: &str,
        node: RawNode,
    ) -> Result<Option<FieldMapper>, MappingError> {
        match self.root.dynamic() {
            Dynamic::False => return Ok(None),
            Dynamic::Strict => {
                return Err(MappingError::MapperParsing(format!(
                    "mapping set to strict, dynamic introduction of [{name}] within [{}] is not allowed",
                    self.type_name()
                )))
            }
            Dynamic::True => {}
        }

        let mapper = match self.root.dynamic_date_formats().first() {
            Some(formatter) => {
                let ctx = self.parser.parser_context_with_date_format(formatter);
                parse_field(name, node, &ctx)?
            }
            None => parse_field(name, node, &self.parser.parser_context())?,
        };
        Ok(Some(mapper))
    }

    /// Canonical mapping: `{type: {_meta?, metadata fields.., root options.., properties}}`.
    pub fn to_json(&self) -> JsonValue {
        let mut body = JsonMap::new();
        if let Some(meta) = &self.meta {
            body.insert(META_FIELD.to_string(), meta.to_json());
        }
        for (name, mapper) in &self.metadata {
            body.insert(name.clone(), mapper.to_json());
        }
        body.extend(self.root.to_json_body());

        let mut out = JsonMap::new();
        out.insert(self.type_name().to_string(), JsonValue::Object(body));
        JsonValue::Object(out)
    }

    /// Canonical mapping as JSON text, optionally pretty-printed.
    pub fn to_json_string(&self, pretty: bool) -> Result<String, MappingError> {
        let value = self.to_json();
        let out = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        out.map_err(|e| MappingError::Serialization(e.to_string()))
    }

    /// Canonical serialized form, suitable for byte-level comparison across nodes.
    pub fn mapping_source(&self) -> Result<MappingSource, MappingError> {
        MappingSource::from_value(&self.to_json())
    }
}
