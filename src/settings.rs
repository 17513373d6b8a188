//! Index-level configuration consumed while parsing and finalizing mappings.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// Date format used when neither the field nor the parse context sets one.
pub const DEFAULT_DATE_FORMAT: &str = "strict_date_optional_time||epoch_millis";

/// Analyzers every index knows about without configuration.
pub const BUILTIN_ANALYZERS: &[&str] = &["standard", "simple", "whitespace", "keyword", "stop"];

const DEFAULT_ANALYZER: &str = "standard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// Settings of the index that owns the mappings being parsed.
pub struct IndexSettings {
    /// Index name, only used for diagnostics and the query context.
    pub index_name: String,
    /// Version the index was created with. Fixed for the index lifetime.
    #[serde(default = "default_version_created")]
    pub version_created: Version,
    /// Date format applied to `date` fields that do not declare one.
    #[serde(default = "default_date_format")]
    pub default_date_format: String,
    /// Concrete type that the `_doc` alias resolves to, if the index has one.
    #[serde(default)]
    pub single_type: Option<String>,
    /// Analyzer configuration.
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// Analyzer section of [`IndexSettings`].
pub struct AnalysisSettings {
    /// Name of the analyzer used when a text field does not pick one.
    #[serde(default)]
    pub default_analyzer: Option<String>,
    /// Custom analyzer names registered on the index.
    #[serde(default)]
    pub analyzers: Vec<String>,
}

fn default_version_created() -> Version {
    Version::new(6, 8, 0)
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl IndexSettings {
    /// Creates settings with defaults for everything but the index name.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            version_created: default_version_created(),
            default_date_format: default_date_format(),
            single_type: None,
            analysis: AnalysisSettings::default(),
        }
    }

    /// Returns a copy created with `version`.
    pub fn with_version_created(mut self, version: Version) -> Self {
        self.version_created = version;
        self
    }

    /// Returns a copy whose `_doc` alias resolves to `type_name`.
    pub fn with_single_type(mut self, type_name: impl Into<String>) -> Self {
        self.single_type = Some(type_name.into());
        self
    }

    /// Parses settings from JSON text.
    pub fn from_json_str(input: &str) -> Result<Self, MappingError> {
        let settings: IndexSettings = serde_json::from_str(input)
            .map_err(|e| MappingError::Settings(format!("invalid index settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let input = fs::read_to_string(path.as_ref()).map_err(|e| {
            MappingError::Settings(format!(
                "failed to read '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&input)
    }

    /// The default date formatter for this index.
    pub fn date_formatter(&self) -> Result<DateFormatter, MappingError> {
        DateFormatter::new(&self.default_date_format)
            .map_err(|e| MappingError::Settings(format!("default_date_format: {e}")))
    }

    fn validate(&self) -> Result<(), MappingError> {
        if self.index_name.is_empty() {
            return Err(MappingError::Settings("index_name must not be empty".to_string()));
        }
        self.date_formatter()?;
        IndexAnalyzers::from_settings(self)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A named analyzer known to the index.
pub struct Analyzer {
    pub name: String,
    pub builtin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Analyzers registered on an index, plus the index default.
pub struct IndexAnalyzers {
    default: Analyzer,
    analyzers: BTreeMap<String, Analyzer>,
}

impl Default for IndexAnalyzers {
    fn default() -> Self {
        Self {
            default: Analyzer {
                name: DEFAULT_ANALYZER.to_string(),
                builtin: true,
            },
            analyzers: builtin_analyzers(),
        }
    }
}

impl IndexAnalyzers {
    /// Builds the analyzer set declared by `settings`.
    pub fn from_settings(settings: &IndexSettings) -> Result<Self, MappingError> {
        let mut analyzers = builtin_analyzers();
        for name in &settings.analysis.analyzers {
            if name.is_empty() {
                return Err(MappingError::Settings(
                    "analyzer names must not be empty".to_string(),
                ));
            }
            analyzers.insert(
                name.clone(),
                Analyzer {
                    name: name.clone(),
                    builtin: false,
                },
            );
        }

        let default_name = settings
            .analysis
            .default_analyzer
            .as_deref()
            .unwrap_or(DEFAULT_ANALYZER);
        let default = analyzers.get(default_name).cloned().ok_or_else(|| {
            MappingError::Settings(format!("default analyzer [{default_name}] is not defined"))
        })?;

        Ok(Self { default, analyzers })
    }

    pub fn get(&self, name: &str) -> Option<&Analyzer> {
        self.analyzers.get(name)
    }

    pub fn default_analyzer(&self) -> &Analyzer {
        &self.default
    }
}

fn builtin_analyzers() -> BTreeMap<String, Analyzer> {
    BUILTIN_ANALYZERS
        .iter()
        .map(|name| {
            (
                name.to_string(),
                Analyzer {
                    name: name.to_string(),
                    builtin: true,
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A date format expression such as `yyyy-MM-dd||epoch_millis`.
pub struct DateFormatter {
    pattern: String,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DateFormatter {
    /// Validates and wraps a format expression. Every `||` alternative must be non-empty.
    pub fn new(pattern: &str) -> Result<Self, MappingError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.split("||").any(|part| part.trim().is_empty()) {
            return Err(MappingError::MapperParsing(format!(
                "Invalid format: [{pattern}]"
            )));
        }
        Ok(Self {
            pattern: trimmed.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The individual `||`-separated alternatives.
    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.pattern.split("||").map(str::trim)
    }
}
