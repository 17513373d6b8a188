pub mod context;
pub mod document;
pub mod error;
pub mod field;
pub mod field_types;
pub mod meta;
pub mod metadata;
pub mod node;
pub mod object;
pub mod parser;
pub mod registry;
pub mod services;
pub mod settings;
pub mod source;

pub use context::ParserContext;
pub use document::{DocumentMapper, DocumentMapperBuilder};
pub use error::MappingError;
pub use field::FieldMapper;
pub use meta::MetaBlock;
pub use metadata::MetadataFieldMapper;
pub use node::{check_no_remaining_fields, check_no_remaining_fields_with_message, RawNode};
pub use object::{RootObjectBuilder, RootObjectMapper, RootObjectParser, RootStructureParser};
pub use parser::DocumentMapperParser;
pub use registry::{MapperRegistry, MetadataFieldParser, TypeParser};
pub use services::{
    MapperService, MappingService, QueryContext, QueryContextSupplier, ScriptService,
    SimilarityService,
};
pub use settings::{DateFormatter, IndexAnalyzers, IndexSettings};
pub use source::MappingSource;

/// Parses `input` for an index with `settings`, using the built-in registries.
pub fn parse_mapping(
    type_name: Option<&str>,
    input: &str,
    settings: IndexSettings,
) -> Result<DocumentMapper, MappingError> {
    DocumentMapperParser::from_settings(settings)?.parse_str(type_name, input)
}

/// Parses `input` and returns its canonical JSON text.
pub fn normalize_mapping(
    type_name: Option<&str>,
    input: &str,
    settings: IndexSettings,
    pretty: bool,
) -> Result<String, MappingError> {
    parse_mapping(type_name, input, settings)?.to_json_string(pretty)
}
