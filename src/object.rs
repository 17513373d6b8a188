//! Object mappers, the root object, and the root structure parser.
//!
//! The root structure parser consumes the field-tree keys of the working
//! mapping (`properties`, `dynamic`, ...) and leaves everything else for the
//! document parser, which handles metadata fields and rejects leftovers.

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::trace;

use crate::context::ParserContext;
use crate::error::MappingError;
use crate::field::FieldMapper;
use crate::node::{
    check_no_remaining_fields, into_node, kind_name, node_boolean, node_string,
    node_string_list, take, RawNode,
};
use crate::settings::DateFormatter;

/// Formats tried on string values of dynamically added fields.
pub const DEFAULT_DYNAMIC_DATE_FORMATS: &[&str] = &[
    "strict_date_optional_time",
    "yyyy/MM/dd HH:mm:ss||yyyy/MM/dd||epoch_millis",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How unmapped fields found in documents are handled.
pub enum Dynamic {
    True,
    False,
    Strict,
}

impl Dynamic {
    pub fn parse(field_name: &str, value: &JsonValue) -> Result<Self, MappingError> {
        match value {
            JsonValue::Bool(true) => Ok(Dynamic::True),
            JsonValue::Bool(false) => Ok(Dynamic::False),
            JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Dynamic::True),
                "false" => Ok(Dynamic::False),
                "strict" => Ok(Dynamic::Strict),
                _ => Err(dynamic_error(field_name, value)),
            },
            _ => Err(dynamic_error(field_name, value)),
        }
    }

    pub fn to_json(self) -> JsonValue {
        match self {
            Dynamic::True => JsonValue::Bool(true),
            Dynamic::False => JsonValue::Bool(false),
            Dynamic::Strict => JsonValue::from("strict"),
        }
    }
}

fn dynamic_error(field_name: &str, value: &JsonValue) -> MappingError {
    MappingError::MapperParsing(format!(
        "Could not convert [{field_name}.dynamic] to boolean, got [{value}]"
    ))
}

#[derive(Debug, Clone, PartialEq)]
/// An `object` or `nested` node of the field tree.
pub struct ObjectMapper {
    name: String,
    nested: bool,
    dynamic: Option<Dynamic>,
    enabled: bool,
    properties: BTreeMap<String, FieldMapper>,
}

impl ObjectMapper {
    pub fn new(name: impl Into<String>, nested: bool, options: ObjectOptions) -> Self {
        Self {
            name: name.into(),
            nested,
            dynamic: options.dynamic,
            enabled: options.enabled.unwrap_or(true),
            properties: options.properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// Explicit `dynamic` setting; `None` inherits from the parent object.
    pub fn dynamic(&self) -> Option<Dynamic> {
        self.dynamic
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn properties(&self) -> &BTreeMap<String, FieldMapper> {
        &self.properties
    }

    /// Looks up a field by dotted path, descending through object properties.
    pub fn field(&self, path: &str) -> Option<&FieldMapper> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let child = self.properties.get(head)?;
        match rest {
            None => Some(child),
            Some(rest) => child.as_object()?.field(rest),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut out = JsonMap::new();
        if self.nested {
            out.insert("type".to_string(), JsonValue::from("nested"));
        } else if self.properties.is_empty() {
            out.insert("type".to_string(), JsonValue::from("object"));
        }
        self.write_body(&mut out);
        JsonValue::Object(out)
    }

    fn write_body(&self, out: &mut JsonMap<String, JsonValue>) {
        if let Some(dynamic) = self.dynamic {
            out.insert("dynamic".to_string(), dynamic.to_json());
        }
        if !self.enabled {
            out.insert("enabled".to_string(), JsonValue::Bool(false));
        }
        if !self.properties.is_empty() {
            let properties = self
                .properties
                .iter()
                .map(|(name, mapper)| (name.clone(), mapper.to_json()))
                .collect();
            out.insert("properties".to_string(), JsonValue::Object(properties));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Options shared by the root object and inner objects.
pub struct ObjectOptions {
    pub dynamic: Option<Dynamic>,
    pub enabled: Option<bool>,
    pub properties: BTreeMap<String, FieldMapper>,
}

/// Consumes `dynamic`, `enabled` and `properties` from `node`.
pub fn parse_object_options(
    name: &str,
    node: &mut RawNode,
    ctx: &ParserContext<'_>,
) -> Result<ObjectOptions, MappingError> {
    let mut options = ObjectOptions::default();
    if let Some(value) = take(node, "dynamic") {
        options.dynamic = Some(Dynamic::parse(name, &value)?);
    }
    if let Some(value) = take(node, "enabled") {
        options.enabled = Some(node_boolean(
            name,
            "enabled",
            &value,
            ctx.index_version_created(),
        )?);
    }
    if let Some(value) = take(node, "properties") {
        let properties = match value {
            JsonValue::Object(map) => map,
            // Legacy clients send an empty list for "no properties".
            JsonValue::Array(items) if items.is_empty() => RawNode::new(),
            other => {
                return Err(MappingError::MapperParsing(format!(
                    "properties must be a map type, got a {} on field [{name}]",
                    kind_name(&other)
                )))
            }
        };
        options.properties = parse_properties(properties, ctx)?;
    }
    Ok(options)
}

fn parse_properties(
    properties: RawNode,
    ctx: &ParserContext<'_>,
) -> Result<BTreeMap<String, FieldMapper>, MappingError> {
    let mut out = BTreeMap::new();
    for (field_name, field_node) in properties {
        if field_name.trim().is_empty() {
            return Err(MappingError::MapperParsing(
                "name cannot be empty string".to_string(),
            ));
        }
        let kind = kind_name(&field_node);
        let node = into_node(field_node, || {
            MappingError::MapperParsing(format!(
                "Expected map for property [fields] on field [{field_name}] but got a {kind}"
            ))
        })?;
        let mapper = parse_field(&field_name, node, ctx)?;
        out.insert(field_name, mapper);
    }
    Ok(out)
}

/// Parses a single field definition, deriving its type when it is implicit.
///
/// The field parser sees `type` but does not need to remove it; it is dropped
/// here before the leftover check.
pub fn parse_field(
    field_name: &str,
    mut node: RawNode,
    ctx: &ParserContext<'_>,
) -> Result<FieldMapper, MappingError> {
    let type_name = match node.get("type") {
        Some(value) => node_string(field_name, "type", value)?,
        None if node.contains_key("properties")
            || (node.len() == 1 && node.contains_key("enabled")) =>
        {
            "object".to_string()
        }
        None => {
            return Err(MappingError::MapperParsing(format!(
                "No type specified for field [{field_name}]"
            )))
        }
    };

    let parser = ctx.type_parser(&type_name).ok_or_else(|| {
        MappingError::MapperParsing(format!(
            "No handler for type [{type_name}] declared on field [{field_name}]"
        ))
    })?;

    trace!(field = field_name, field_type = %type_name, "parsing field");
    let mapper = parser.parse(field_name, &mut node, ctx)?;
    take(&mut node, "type");
    check_no_remaining_fields(field_name, &node)?;
    Ok(mapper)
}

/// Produces the root builder from the working mapping.
///
/// Implementations remove the keys they understand from `node` and leave the
/// rest (metadata fields, `_meta`, unknown keys) for the document parser.
pub trait RootStructureParser: Send + Sync {
    fn parse(
        &self,
        type_name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<RootObjectBuilder, MappingError>;
}

#[derive(Debug, Clone, PartialEq)]
/// Accumulates the root object's options until the document mapper is built.
pub struct RootObjectBuilder {
    type_name: String,
    object: ObjectOptions,
    date_detection: Option<bool>,
    numeric_detection: Option<bool>,
    dynamic_date_formats: Option<Vec<DateFormatter>>,
}

impl RootObjectBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            object: ObjectOptions::default(),
            date_detection: None,
            numeric_detection: None,
            dynamic_date_formats: None,
        }
    }

    pub fn object_options(mut self, options: ObjectOptions) -> Self {
        self.object = options;
        self
    }

    pub fn date_detection(mut self, enabled: bool) -> Self {
        self.date_detection = Some(enabled);
        self
    }

    pub fn numeric_detection(mut self, enabled: bool) -> Self {
        self.numeric_detection = Some(enabled);
        self
    }

    pub fn dynamic_date_formats(mut self, formats: Vec<DateFormatter>) -> Self {
        self.dynamic_date_formats = Some(formats);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn build(self) -> RootObjectMapper {
        let dynamic_date_formats = match self.dynamic_date_formats {
            Some(formats) => formats,
            None => default_dynamic_date_formats(),
        };
        RootObjectMapper {
            object: ObjectMapper::new(self.type_name, false, self.object),
            date_detection: self.date_detection.unwrap_or(true),
            numeric_detection: self.numeric_detection.unwrap_or(false),
            dynamic_date_formats,
        }
    }
}

fn default_dynamic_date_formats() -> Vec<DateFormatter> {
    DEFAULT_DYNAMIC_DATE_FORMATS
        .iter()
        .filter_map(|pattern| DateFormatter::new(pattern).ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
/// The top of the field tree, named after the document type.
pub struct RootObjectMapper {
    object: ObjectMapper,
    date_detection: bool,
    numeric_detection: bool,
    dynamic_date_formats: Vec<DateFormatter>,
}

impl RootObjectMapper {
    pub fn name(&self) -> &str {
        self.object.name()
    }

    pub fn object(&self) -> &ObjectMapper {
        &self.object
    }

    /// Root `dynamic` setting, defaulting to [`Dynamic::True`].
    pub fn dynamic(&self) -> Dynamic {
        self.object.dynamic().unwrap_or(Dynamic::True)
    }

    pub fn date_detection(&self) -> bool {
        self.date_detection
    }

    pub fn numeric_detection(&self) -> bool {
        self.numeric_detection
    }

    pub fn dynamic_date_formats(&self) -> &[DateFormatter] {
        &self.dynamic_date_formats
    }

    /// Root options and properties, without the type wrapper.
    pub fn to_json_body(&self) -> JsonMap<String, JsonValue> {
        let mut out = JsonMap::new();
        if !self.date_detection {
            out.insert("date_detection".to_string(), JsonValue::Bool(false));
        }
        if self.numeric_detection {
            out.insert("numeric_detection".to_string(), JsonValue::Bool(true));
        }
        if self.dynamic_date_formats != default_dynamic_date_formats() {
            let formats = self
                .dynamic_date_formats
                .iter()
                .map(|f| JsonValue::from(f.pattern()))
                .collect();
            out.insert("dynamic_date_formats".to_string(), JsonValue::Array(formats));
        }
        self.object.write_body(&mut out);
        out
    }
}

/// Default [`RootStructureParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RootObjectParser;

impl RootStructureParser for RootObjectParser {
    fn parse(
        &self,
        type_name: &str,
        node: &mut RawNode,
        ctx: &ParserContext<'_>,
    ) -> Result<RootObjectBuilder, MappingError> {
        let version = ctx.index_version_created();
        let mut builder =
            RootObjectBuilder::new(type_name).object_options(parse_object_options(type_name, node, ctx)?);

        if let Some(value) = take(node, "date_detection") {
            builder = builder.date_detection(node_boolean(type_name, "date_detection", &value, version)?);
        }
        if let Some(value) = take(node, "numeric_detection") {
            builder = builder.numeric_detection(node_boolean(
                type_name,
                "numeric_detection",
                &value,
                version,
            )?);
        }
        if let Some(value) = take(node, "dynamic_date_formats") {
            let formats = node_string_list(type_name, "dynamic_date_formats", &value)?
                .iter()
                .map(|pattern| DateFormatter::new(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.dynamic_date_formats(formats);
        }
        Ok(builder)
    }
}
