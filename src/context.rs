//! Capabilities handed to every parser during one mapping parse.

use std::sync::Arc;

use semver::Version;

use crate::registry::{TypeParser, TypeParsers};
use crate::services::{
    MappingService, QueryContext, QueryContextSupplier, ScriptService, SimilarityProvider,
    SimilarityService,
};
use crate::settings::DateFormatter;

/// Read-only, request-scoped bundle shared by reference across recursive parser calls.
///
/// Built by [`crate::DocumentMapperParser::parser_context`] (or its date-format
/// variant) and never mutated afterwards.
pub struct ParserContext<'a> {
    similarity_service: &'a SimilarityService,
    mapping_service: &'a dyn MappingService,
    type_parsers: &'a TypeParsers,
    index_version_created: &'a Version,
    query_context_supplier: &'a QueryContextSupplier,
    date_formatter: Option<&'a DateFormatter>,
    script_service: &'a ScriptService,
}

impl<'a> ParserContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        similarity_service: &'a SimilarityService,
        mapping_service: &'a dyn MappingService,
        type_parsers: &'a TypeParsers,
        index_version_created: &'a Version,
        query_context_supplier: &'a QueryContextSupplier,
        date_formatter: Option<&'a DateFormatter>,
        script_service: &'a ScriptService,
    ) -> Self {
        Self {
            similarity_service,
            mapping_service,
            type_parsers,
            index_version_created,
            query_context_supplier,
            date_formatter,
            script_service,
        }
    }

    pub fn similarity(&self, name: &str) -> Option<&'a SimilarityProvider> {
        self.similarity_service.similarity(name)
    }

    pub fn mapping_service(&self) -> &'a dyn MappingService {
        self.mapping_service
    }

    /// Parser for field type `type_name`. Absence is for the caller to report.
    pub fn type_parser(&self, type_name: &str) -> Option<&'a dyn TypeParser> {
        self.type_parsers.get(type_name).map(Arc::as_ref)
    }

    pub fn index_version_created(&self) -> &'a Version {
        self.index_version_created
    }

    /// Runs the deferred query context supplier.
    pub fn query_context(&self) -> QueryContext {
        self.query_context_supplier.get()
    }

    /// Date format override, set when re-parsing dynamically added fields.
    pub fn date_formatter(&self) -> Option<&'a DateFormatter> {
        self.date_formatter
    }

    pub fn script_service(&self) -> &'a ScriptService {
        self.script_service
    }
}
