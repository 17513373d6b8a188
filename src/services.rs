//! Longer-lived collaborators the parser borrows from: the owning schema
//! service, similarity and script registries, and the query context supplier.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::MappingError;
use crate::settings::{IndexAnalyzers, IndexSettings};

/// Alias that single-type indices accept in place of their concrete type name.
pub const DOC_TYPE_ALIAS: &str = "_doc";

/// The schema service that owns a [`crate::DocumentMapperParser`].
pub trait MappingService: Send + Sync {
    /// Normalizes a caller-supplied type name (for example resolving `_doc`).
    fn resolve_document_type(&self, type_name: &str) -> String;

    /// Settings of the owning index.
    fn index_settings(&self) -> Arc<IndexSettings>;

    /// Analyzers registered on the owning index.
    fn index_analyzers(&self) -> Arc<IndexAnalyzers>;
}

#[derive(Debug, Clone)]
/// [`MappingService`] implementation backed by static index settings.
pub struct MapperService {
    settings: Arc<IndexSettings>,
    analyzers: Arc<IndexAnalyzers>,
}

impl MapperService {
    pub fn new(settings: IndexSettings) -> Result<Self, MappingError> {
        let analyzers = IndexAnalyzers::from_settings(&settings)?;
        Ok(Self {
            settings: Arc::new(settings),
            analyzers: Arc::new(analyzers),
        })
    }
}

impl MappingService for MapperService {
    fn resolve_document_type(&self, type_name: &str) -> String {
        match (&self.settings.single_type, type_name) {
            (Some(single), DOC_TYPE_ALIAS) => single.clone(),
            _ => type_name.to_string(),
        }
    }

    fn index_settings(&self) -> Arc<IndexSettings> {
        Arc::clone(&self.settings)
    }

    fn index_analyzers(&self) -> Arc<IndexAnalyzers> {
        Arc::clone(&self.analyzers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A scoring model fields can opt into with the `similarity` option.
pub struct SimilarityProvider {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
/// Registry of named similarities.
pub struct SimilarityService {
    providers: BTreeMap<String, SimilarityProvider>,
}

impl Default for SimilarityService {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        for name in ["BM25", "classic", "boolean"] {
            providers.insert(
                name.to_string(),
                SimilarityProvider {
                    name: name.to_string(),
                    kind: name.to_string(),
                },
            );
        }
        Self { providers }
    }
}

impl SimilarityService {
    /// Registers a custom similarity `name` built on the base model `kind`.
    pub fn register(&mut self, name: impl Into<String>, kind: &str) -> Result<(), MappingError> {
        let name = name.into();
        if !self.providers.contains_key(kind) {
            return Err(MappingError::Settings(format!(
                "Unknown base similarity type [{kind}] for similarity [{name}]"
            )));
        }
        self.providers.insert(
            name.clone(),
            SimilarityProvider {
                name,
                kind: kind.to_string(),
            },
        );
        Ok(())
    }

    pub fn similarity(&self, name: &str) -> Option<&SimilarityProvider> {
        self.providers.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A script accepted by the [`ScriptService`].
pub struct Script {
    pub lang: String,
    pub source: String,
}

#[derive(Debug, Clone)]
/// Gatekeeper for scripts embedded in mappings.
pub struct ScriptService {
    allowed_langs: BTreeSet<String>,
}

/// Language assumed when a script does not name one.
pub const DEFAULT_SCRIPT_LANG: &str = "painless";

impl Default for ScriptService {
    fn default() -> Self {
        Self::new([DEFAULT_SCRIPT_LANG, "expression"])
    }
}

impl ScriptService {
    pub fn new<I, S>(allowed_langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_langs: allowed_langs.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks that `lang` is enabled and `source` is non-empty.
    pub fn compile(&self, lang: &str, source: &str) -> Result<Script, MappingError> {
        if !self.allowed_langs.contains(lang) {
            return Err(MappingError::MapperParsing(format!(
                "script_lang not supported [{lang}]"
            )));
        }
        if source.trim().is_empty() {
            return Err(MappingError::MapperParsing(
                "script source must not be empty".to_string(),
            ));
        }
        Ok(Script {
            lang: lang.to_string(),
            source: source.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request-level state that some field parsers need lazily.
pub struct QueryContext {
    pub index_name: String,
    pub now_millis: i64,
}

/// Deferred producer of a [`QueryContext`]. Only invoked when a parser asks for it.
#[derive(Clone)]
pub struct QueryContextSupplier(Arc<dyn Fn() -> QueryContext + Send + Sync>);

impl QueryContextSupplier {
    pub fn new(f: impl Fn() -> QueryContext + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn get(&self) -> QueryContext {
        (self.0)()
    }
}

impl fmt::Debug for QueryContextSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueryContextSupplier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_alias_resolves_to_single_type() {
        let service =
            MapperService::new(IndexSettings::new("logs").with_single_type("event")).unwrap();
        assert_eq!(service.resolve_document_type("_doc"), "event");
        assert_eq!(service.resolve_document_type("other"), "other");
    }

    #[test]
    fn doc_alias_without_single_type_is_unchanged() {
        let service = MapperService::new(IndexSettings::new("logs")).unwrap();
        assert_eq!(service.resolve_document_type("_doc"), "_doc");
    }

    #[test]
    fn custom_similarity_needs_known_base() {
        let mut similarity = SimilarityService::default();
        similarity.register("my_bm25", "BM25").unwrap();
        assert_eq!(similarity.similarity("my_bm25").unwrap().kind, "BM25");
        assert!(similarity.register("x", "nope").is_err());
    }

    #[test]
    fn script_service_checks_language() {
        let scripts = ScriptService::default();
        assert!(scripts.compile("painless", "doc['a'].value").is_ok());
        let err = scripts.compile("groovy", "1").unwrap_err();
        assert!(err.to_string().contains("script_lang not supported [groovy]"));
        assert!(scripts.compile("painless", " ").is_err());
    }
}
