//! Parser traits and the registry that maps type names to them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use semver::Version;

use crate::context::ParserContext;
use crate::error::MappingError;
use crate::field::FieldMapper;
use crate::field_types::builtin_type_parsers;
use crate::meta::META_FIELD;
use crate::metadata::{builtin_metadata_parsers, MetadataFieldMapper};
use crate::node::RawNode;

/// Parses one field node of a given `type` into a [`FieldMapper`].
///
/// Implementations remove every key they recognize from `node`. The caller
/// drops `type` afterwards and rejects whatever is left.
pub trait TypeParser: Send + Sync {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError>;
}

/// Parses the value of a reserved top-level key such as `_routing`.
pub trait MetadataFieldParser: Send + Sync {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<MetadataFieldMapper, MappingError>;

    /// Whether indices created with `version` still recognize this field.
    fn is_supported(&self, _version: &Version) -> bool {
        true
    }
}

/// Field type name to parser.
pub type TypeParsers = BTreeMap<String, Arc<dyn TypeParser>>;

/// Reserved field name to parser, in registration order.
pub type MetadataFieldParsers = IndexMap<String, Arc<dyn MetadataFieldParser>>;

#[derive(Clone, Default)]
/// The two parser tables handed to a [`crate::DocumentMapperParser`].
pub struct MapperRegistry {
    mapper_parsers: TypeParsers,
    metadata_parsers: MetadataFieldParsers,
}

impl MapperRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in field type and metadata field.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, parser) in builtin_type_parsers() {
            registry.mapper_parsers.insert(name.to_string(), parser);
        }
        for (name, parser) in builtin_metadata_parsers() {
            registry.metadata_parsers.insert(name.to_string(), parser);
        }
        registry
    }

    pub fn register_type_parser(
        &mut self,
        name: impl Into<String>,
        parser: Arc<dyn TypeParser>,
    ) -> Result<(), MappingError> {
        let name = name.into();
        if self.mapper_parsers.contains_key(&name) {
            return Err(MappingError::Registry(format!(
                "mapper [{name}] is already registered"
            )));
        }
        self.mapper_parsers.insert(name, parser);
        Ok(())
    }

    /// Registers a metadata field. Names must start with `_` and may not be `_meta`.
    pub fn register_metadata_parser(
        &mut self,
        name: impl Into<String>,
        parser: Arc<dyn MetadataFieldParser>,
    ) -> Result<(), MappingError> {
        let name = name.into();
        if !name.starts_with('_') || name == META_FIELD {
            return Err(MappingError::Registry(format!(
                "metadata field name [{name}] is not allowed"
            )));
        }
        if self.metadata_parsers.contains_key(&name) {
            return Err(MappingError::Registry(format!(
                "metadata mapper [{name}] is already registered"
            )));
        }
        self.metadata_parsers.insert(name, parser);
        Ok(())
    }

    pub fn mapper_parsers(&self) -> &TypeParsers {
        &self.mapper_parsers
    }

    /// Metadata parsers available to indices created with `version`.
    pub fn metadata_mapper_parsers(&self, version: &Version) -> MetadataFieldParsers {
        self.metadata_parsers
            .iter()
            .filter(|(_, parser)| parser.is_supported(version))
            .map(|(name, parser)| (name.clone(), Arc::clone(parser)))
            .collect()
    }
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mapper_parsers", &self.mapper_parsers.keys().collect::<Vec<_>>())
            .field(
                "metadata_parsers",
                &self.metadata_parsers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::RoutingFieldParser;

    #[test]
    fn builtin_registry_has_core_types() {
        let registry = MapperRegistry::builtin();
        for name in ["keyword", "text", "long", "date", "boolean", "object", "nested"] {
            assert!(registry.mapper_parsers().contains_key(name), "{name}");
        }
    }

    #[test]
    fn parent_field_is_dropped_for_new_indices() {
        let registry = MapperRegistry::builtin();
        let old = registry.metadata_mapper_parsers(&Version::new(6, 8, 0));
        let new = registry.metadata_mapper_parsers(&Version::new(7, 0, 0));
        assert!(old.contains_key("_parent"));
        assert!(!new.contains_key("_parent"));
        assert!(new.contains_key("_routing"));
    }

    #[test]
    fn metadata_names_are_checked() {
        let mut registry = MapperRegistry::builtin();
        let err = registry
            .register_metadata_parser("_routing", Arc::new(RoutingFieldParser))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert!(registry
            .register_metadata_parser("_meta", Arc::new(RoutingFieldParser))
            .is_err());
        assert!(registry
            .register_metadata_parser("routing", Arc::new(RoutingFieldParser))
            .is_err());
        assert!(registry
            .register_metadata_parser("_custom", Arc::new(RoutingFieldParser))
            .is_ok());
    }
}
