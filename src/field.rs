//! Field mappers produced by the field-type parsers.

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::object::ObjectMapper;
use crate::services::{Script, DEFAULT_SCRIPT_LANG};
use crate::settings::DateFormatter;

#[derive(Debug, Clone, PartialEq)]
/// One node of the parsed field tree.
pub enum FieldMapper {
    Keyword(KeywordFieldMapper),
    Text(TextFieldMapper),
    Number(NumberFieldMapper),
    Boolean(BooleanFieldMapper),
    Date(DateFieldMapper),
    Object(ObjectMapper),
}

impl FieldMapper {
    pub fn name(&self) -> &str {
        match self {
            FieldMapper::Keyword(m) => &m.name,
            FieldMapper::Text(m) => &m.name,
            FieldMapper::Number(m) => &m.name,
            FieldMapper::Boolean(m) => &m.name,
            FieldMapper::Date(m) => &m.name,
            FieldMapper::Object(m) => m.name(),
        }
    }

    /// The mapping `type` this mapper serializes as.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldMapper::Keyword(_) => "keyword",
            FieldMapper::Text(_) => "text",
            FieldMapper::Number(m) => m.number_type.name(),
            FieldMapper::Boolean(_) => "boolean",
            FieldMapper::Date(_) => "date",
            FieldMapper::Object(m) if m.is_nested() => "nested",
            FieldMapper::Object(_) => "object",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMapper> {
        match self {
            FieldMapper::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Canonical mapping form, emitting only non-default options.
    pub fn to_json(&self) -> JsonValue {
        let mut out = JsonMap::new();
        match self {
            FieldMapper::Object(m) => return m.to_json(),
            FieldMapper::Keyword(m) => {
                out.insert("type".to_string(), JsonValue::from("keyword"));
                write_index_options(&mut out, m.index, Some(m.doc_values));
                if let Some(ignore_above) = m.ignore_above {
                    out.insert("ignore_above".to_string(), JsonValue::from(ignore_above));
                }
                if let Some(null_value) = &m.null_value {
                    out.insert("null_value".to_string(), JsonValue::from(null_value.as_str()));
                }
                if let Some(similarity) = &m.similarity {
                    out.insert("similarity".to_string(), JsonValue::from(similarity.as_str()));
                }
            }
            FieldMapper::Text(m) => {
                out.insert("type".to_string(), JsonValue::from("text"));
                write_index_options(&mut out, m.index, None);
                if let Some(analyzer) = &m.analyzer {
                    out.insert("analyzer".to_string(), JsonValue::from(analyzer.as_str()));
                }
                if let Some(search_analyzer) = &m.search_analyzer {
                    out.insert(
                        "search_analyzer".to_string(),
                        JsonValue::from(search_analyzer.as_str()),
                    );
                }
                if let Some(similarity) = &m.similarity {
                    out.insert("similarity".to_string(), JsonValue::from(similarity.as_str()));
                }
            }
            FieldMapper::Number(m) => {
                out.insert("type".to_string(), JsonValue::from(m.number_type.name()));
                write_index_options(&mut out, m.index, Some(m.doc_values));
                if !m.coerce {
                    out.insert("coerce".to_string(), JsonValue::Bool(false));
                }
                if let Some(null_value) = &m.null_value {
                    out.insert("null_value".to_string(), JsonValue::Number(null_value.clone()));
                }
                if let Some(script) = &m.script {
                    let mut s = JsonMap::new();
                    s.insert("source".to_string(), JsonValue::from(script.source.as_str()));
                    if script.lang != DEFAULT_SCRIPT_LANG {
                        s.insert("lang".to_string(), JsonValue::from(script.lang.as_str()));
                    }
                    out.insert("script".to_string(), JsonValue::Object(s));
                }
            }
            FieldMapper::Boolean(m) => {
                out.insert("type".to_string(), JsonValue::from("boolean"));
                write_index_options(&mut out, m.index, Some(m.doc_values));
                if let Some(null_value) = m.null_value {
                    out.insert("null_value".to_string(), JsonValue::Bool(null_value));
                }
            }
            FieldMapper::Date(m) => {
                out.insert("type".to_string(), JsonValue::from("date"));
                write_index_options(&mut out, m.index, Some(m.doc_values));
                // Always written: the fallback format depends on index settings.
                out.insert("format".to_string(), JsonValue::from(m.format.pattern()));
                if let Some(null_value) = &m.null_value {
                    out.insert("null_value".to_string(), JsonValue::from(null_value.as_str()));
                }
            }
        }
        JsonValue::Object(out)
    }
}

fn write_index_options(out: &mut JsonMap<String, JsonValue>, index: bool, doc_values: Option<bool>) {
    if !index {
        out.insert("index".to_string(), JsonValue::Bool(false));
    }
    if doc_values == Some(false) {
        out.insert("doc_values".to_string(), JsonValue::Bool(false));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFieldMapper {
    pub name: String,
    pub index: bool,
    pub doc_values: bool,
    pub ignore_above: Option<u64>,
    pub null_value: Option<String>,
    pub similarity: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFieldMapper {
    pub name: String,
    pub index: bool,
    /// Index-time analyzer; `None` means the index default.
    pub analyzer: Option<String>,
    /// Search-time analyzer; `None` means the index-time analyzer.
    pub search_analyzer: Option<String>,
    pub similarity: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
}

impl NumberType {
    pub const ALL: [NumberType; 6] = [
        NumberType::Long,
        NumberType::Integer,
        NumberType::Short,
        NumberType::Byte,
        NumberType::Double,
        NumberType::Float,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumberType::Long => "long",
            NumberType::Integer => "integer",
            NumberType::Short => "short",
            NumberType::Byte => "byte",
            NumberType::Double => "double",
            NumberType::Float => "float",
        }
    }

    pub fn is_integral(self) -> bool {
        !matches!(self, NumberType::Double | NumberType::Float)
    }

    /// Inclusive bounds for integral types.
    pub fn integral_range(self) -> Option<(i64, i64)> {
        match self {
            NumberType::Long => Some((i64::MIN, i64::MAX)),
            NumberType::Integer => Some((i32::MIN as i64, i32::MAX as i64)),
            NumberType::Short => Some((i16::MIN as i64, i16::MAX as i64)),
            NumberType::Byte => Some((i8::MIN as i64, i8::MAX as i64)),
            NumberType::Double | NumberType::Float => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberFieldMapper {
    pub name: String,
    pub number_type: NumberType,
    pub index: bool,
    pub doc_values: bool,
    pub coerce: bool,
    pub null_value: Option<Number>,
    pub script: Option<Script>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanFieldMapper {
    pub name: String,
    pub index: bool,
    pub doc_values: bool,
    pub null_value: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateFieldMapper {
    pub name: String,
    pub index: bool,
    pub doc_values: bool,
    pub format: DateFormatter,
    pub null_value: Option<String>,
}
