//! Built-in field-type parsers.
//!
//! Each parser removes the options it understands from the field node. Unknown
//! options stay behind and are rejected by the caller's leftover check.

use std::sync::Arc;

use serde_json::{Number, Value as JsonValue};

use crate::context::ParserContext;
use crate::error::MappingError;
use crate::field::{
    BooleanFieldMapper, DateFieldMapper, FieldMapper, KeywordFieldMapper, NumberFieldMapper,
    NumberType, TextFieldMapper,
};
use crate::node::{
    check_no_remaining_fields, kind_name, node_boolean, node_string, node_u64, take, RawNode,
};
use crate::object::{parse_object_options, ObjectMapper};
use crate::registry::TypeParser;
use crate::services::{Script, DEFAULT_SCRIPT_LANG};
use crate::settings::DateFormatter;

/// Every built-in field type, keyed by its mapping `type` name.
pub fn builtin_type_parsers() -> Vec<(&'static str, Arc<dyn TypeParser>)> {
    let fixed: [(&'static str, Arc<dyn TypeParser>); 6] = [
        ("keyword", Arc::new(KeywordParser)),
        ("text", Arc::new(TextParser)),
        ("boolean", Arc::new(BooleanParser)),
        ("date", Arc::new(DateParser)),
        ("object", Arc::new(ObjectParser { nested: false })),
        ("nested", Arc::new(ObjectParser { nested: true })),
    ];
    let mut parsers = Vec::from(fixed);
    for number_type in NumberType::ALL {
        parsers.push((number_type.name(), Arc::new(NumberParser(number_type))));
    }
    parsers
}

fn take_bool(
    name: &str,
    node: &mut RawNode,
    key: &str,
    ctx: &ParserContext<'_>,
) -> Result<Option<bool>, MappingError> {
    take(node, key)
        .map(|value| node_boolean(name, key, &value, ctx.index_version_created()))
        .transpose()
}

fn take_null_value(name: &str, node: &mut RawNode) -> Result<Option<JsonValue>, MappingError> {
    match take(node, "null_value") {
        Some(JsonValue::Null) => Err(MappingError::MapperParsing(format!(
            "Property [null_value] cannot be null on field [{name}]"
        ))),
        other => Ok(other),
    }
}

fn take_similarity(
    name: &str,
    node: &mut RawNode,
    ctx: &ParserContext<'_>,
) -> Result<Option<String>, MappingError> {
    let Some(value) = take(node, "similarity") else {
        return Ok(None);
    };
    let similarity = node_string(name, "similarity", &value)?;
    if ctx.similarity(&similarity).is_none() {
        return Err(MappingError::MapperParsing(format!(
            "Unknown Similarity type [{similarity}] for field [{name}]"
        )));
    }
    Ok(Some(similarity))
}

pub struct KeywordParser;

impl TypeParser for KeywordParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let ignore_above = take(node, "ignore_above")
            .map(|value| node_u64(name, "ignore_above", &value))
            .transpose()?;
        let null_value = take_null_value(name, node)?
            .map(|value| node_string(name, "null_value", &value))
            .transpose()?;

        Ok(FieldMapper::Keyword(KeywordFieldMapper {
            name: name.to_string(),
            index: take_bool(name, node, "index", ctx)?.unwrap_or(true),
            doc_values: take_bool(name, node, "doc_values", ctx)?.unwrap_or(true),
            ignore_above,
            null_value,
            similarity: take_similarity(name, node, ctx)?,
        }))
    }
}

pub struct TextParser;

impl TextParser {
    fn take_analyzer(
        name: &str,
        node: &mut RawNode,
        key: &str,
        ctx: &ParserContext<'_>,
    ) -> Result<Option<String>, MappingError> {
        let Some(value) = take(node, key) else {
            return Ok(None);
        };
        let analyzer = node_string(name, key, &value)?;
        if ctx
            .mapping_service()
            .index_analyzers()
            .get(&analyzer)
            .is_none()
        {
            return Err(MappingError::MapperParsing(format!(
                "analyzer [{analyzer}] not found for field [{name}]"
            )));
        }
        Ok(Some(analyzer))
    }
}

impl TypeParser for TextParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let analyzer = Self::take_analyzer(name, node, "analyzer", ctx)?;
        let search_analyzer = Self::take_analyzer(name, node, "search_analyzer", ctx)?;
        if search_analyzer.is_some() && analyzer.is_none() {
            return Err(MappingError::MapperParsing(format!(
                "analyzer on field [{name}] must be set when search_analyzer is set"
            )));
        }

        Ok(FieldMapper::Text(TextFieldMapper {
            name: name.to_string(),
            index: take_bool(name, node, "index", ctx)?.unwrap_or(true),
            analyzer,
            search_analyzer,
            similarity: take_similarity(name, node, ctx)?,
        }))
    }
}

pub struct NumberParser(pub NumberType);

impl NumberParser {
    fn parse_number(
        &self,
        name: &str,
        value: &JsonValue,
        coerce: bool,
    ) -> Result<Number, MappingError> {
        let number_type = self.0;
        let number = match value {
            JsonValue::Number(n) => n.clone(),
            JsonValue::String(s) if coerce => s
                .trim()
                .parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().and_then(Number::from_f64))
                .ok_or_else(|| {
                    MappingError::MapperParsing(format!(
                        "For input string: [{s}] on field [{name}]"
                    ))
                })?,
            other => {
                return Err(MappingError::MapperParsing(format!(
                    "[null_value] on field [{name}] must be a number but got a {}",
                    kind_name(other)
                )))
            }
        };

        match number_type.integral_range() {
            Some((min, max)) => {
                let as_int = number.as_i64().ok_or_else(|| {
                    MappingError::MapperParsing(format!(
                        "Value [{number}] has a decimal part or is out of range for a {} on field [{name}]",
                        number_type.name()
                    ))
                })?;
                if as_int < min || as_int > max {
                    return Err(MappingError::MapperParsing(format!(
                        "Value [{number}] is out of range for a {} on field [{name}]",
                        number_type.name()
                    )));
                }
                Ok(number)
            }
            None => Ok(number),
        }
    }

    fn parse_script(
        name: &str,
        value: JsonValue,
        ctx: &ParserContext<'_>,
    ) -> Result<Script, MappingError> {
        match value {
            JsonValue::String(source) => ctx.script_service().compile(DEFAULT_SCRIPT_LANG, &source),
            JsonValue::Object(mut script_node) => {
                let source = take(&mut script_node, "source")
                    .map(|v| node_string(name, "script.source", &v))
                    .transpose()?
                    .ok_or_else(|| {
                        MappingError::MapperParsing(format!(
                            "script on field [{name}] must define [source]"
                        ))
                    })?;
                let lang = take(&mut script_node, "lang")
                    .map(|v| node_string(name, "script.lang", &v))
                    .transpose()?
                    .unwrap_or_else(|| DEFAULT_SCRIPT_LANG.to_string());
                check_no_remaining_fields(&format!("{name}.script"), &script_node)?;
                ctx.script_service().compile(&lang, &source)
            }
            other => Err(MappingError::MapperParsing(format!(
                "script on field [{name}] must be a string or an object but got a {}",
                kind_name(&other)
            ))),
        }
    }
}

impl TypeParser for NumberParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let coerce = take_bool(name, node, "coerce", ctx)?.unwrap_or(true);
        let null_value = take_null_value(name, node)?
            .map(|value| self.parse_number(name, &value, coerce))
            .transpose()?;
        let script = take(node, "script")
            .map(|value| Self::parse_script(name, value, ctx))
            .transpose()?;
        if script.is_some() && null_value.is_some() {
            return Err(MappingError::MapperParsing(format!(
                "Field [{name}] cannot set both [script] and [null_value]"
            )));
        }

        Ok(FieldMapper::Number(NumberFieldMapper {
            name: name.to_string(),
            number_type: self.0,
            index: take_bool(name, node, "index", ctx)?.unwrap_or(true),
            doc_values: take_bool(name, node, "doc_values", ctx)?.unwrap_or(true),
            coerce,
            null_value,
            script,
        }))
    }
}

pub struct BooleanParser;

impl TypeParser for BooleanParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let null_value = take_null_value(name, node)?
            .map(|value| node_boolean(name, "null_value", &value, ctx.index_version_created()))
            .transpose()?;

        Ok(FieldMapper::Boolean(BooleanFieldMapper {
            name: name.to_string(),
            index: take_bool(name, node, "index", ctx)?.unwrap_or(true),
            doc_values: take_bool(name, node, "doc_values", ctx)?.unwrap_or(true),
            null_value,
        }))
    }
}

pub struct DateParser;

impl TypeParser for DateParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let format = match take(node, "format") {
            Some(value) => DateFormatter::new(&node_string(name, "format", &value)?)?,
            None => match ctx.date_formatter() {
                Some(formatter) => formatter.clone(),
                None => ctx.mapping_service().index_settings().date_formatter()?,
            },
        };
        let null_value = take_null_value(name, node)?
            .map(|value| node_string(name, "null_value", &value))
            .transpose()?;

        Ok(FieldMapper::Date(DateFieldMapper {
            name: name.to_string(),
            index: take_bool(name, node, "index", ctx)?.unwrap_or(true),
            doc_values: take_bool(name, node, "doc_values", ctx)?.unwrap_or(true),
            format,
            null_value,
        }))
    }
}

pub struct ObjectParser {
    pub nested: bool,
}

impl TypeParser for ObjectParser {
    fn parse(
        &self,
        name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<FieldMapper, MappingError> {
        let options = parse_object_options(name, node, ctx)?;
        Ok(FieldMapper::Object(ObjectMapper::new(name, self.nested, options)))
    }
}
