use serde_json::json;

use doc_mapper::metadata::{RoutingFieldMapper, SourceFieldMapper};
use doc_mapper::{
    DocumentMapperParser, FieldMapper, IndexSettings, MappingError, MappingSource,
    MetadataFieldMapper,
};

fn parser() -> DocumentMapperParser {
    DocumentMapperParser::from_settings(IndexSettings::new("test")).unwrap()
}

#[test]
fn empty_mapping_with_caller_type() {
    let mapper = parser()
        .parse(Some("doc"), Some(&MappingSource::from_json_str("{}")))
        .unwrap();
    assert_eq!(mapper.type_name(), "doc");
    assert!(mapper.root().object().properties().is_empty());
    assert!(mapper.metadata_mappers().is_empty());
    assert!(mapper.meta().is_none());
}

#[test]
fn empty_mapping_without_type_fails() {
    let err = parser()
        .parse(None, Some(&MappingSource::from_json_str("{}")))
        .unwrap_err();
    assert!(matches!(err, MappingError::MissingType(_)));
    assert!(err.to_string().contains("no type name found"));
}

#[test]
fn meta_block_and_empty_properties() {
    let mapper = parser()
        .parse_value(
            None,
            json!({"doc": {"_meta": {"owner": "x"}, "properties": {}}}),
        )
        .unwrap();
    assert_eq!(mapper.type_name(), "doc");
    let meta = mapper.meta().unwrap();
    assert_eq!(meta.len(), 1);
    assert_eq!(meta.get("owner"), Some(&json!("x")));
}

#[test]
fn unknown_top_level_key_fails_at_root() {
    let err = parser()
        .parse_value(None, json!({"doc": {"_meta": {}, "bogus_top_key": 1}}))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedParameters { .. }));
    assert_eq!(err.remaining_keys(), vec!["bogus_top_key"]);
    assert_eq!(
        err.to_string(),
        "Root mapping definition has unsupported parameters:  [bogus_top_key : 1]"
    );
}

#[test]
fn metadata_field_must_be_an_object() {
    let err = parser()
        .parse_value(None, json!({"doc": {"_routing": "not-a-map"}}))
        .unwrap_err();
    assert!(matches!(err, MappingError::MalformedField(_)));
    assert!(err.to_string().contains("[_routing] must be an object"));
}

#[test]
fn every_metadata_field_rejects_scalars() {
    for name in ["_routing", "_source", "_parent"] {
        for bad in [json!(true), json!(1), json!("x"), json!([])] {
            let mut body = serde_json::Map::new();
            body.insert(name.to_string(), bad);
            let mut doc = serde_json::Map::new();
            doc.insert("doc".to_string(), serde_json::Value::Object(body));

            let err = parser()
                .parse_value(None, serde_json::Value::Object(doc))
                .unwrap_err();
            assert!(
                err.to_string().contains(&format!("[{name}] must be an object")),
                "{name}: {err}"
            );
        }
    }
}

#[test]
fn metadata_leftovers_are_field_scoped() {
    let err = parser()
        .parse_value(
            None,
            json!({"doc": {"_routing": {"type": "ignored", "required": true, "path": "id", "x": [1]}}}),
        )
        .unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedFieldParameters { .. }));
    assert_eq!(err.remaining_keys(), vec!["path", "x"]);
    assert_eq!(
        err.to_string(),
        "Mapping definition for [_routing] has unsupported parameters:  [path : id] [x : [1]]"
    );
}

#[test]
fn metadata_type_subkey_is_consumed() {
    let mapper = parser()
        .parse_value(None, json!({"doc": {"_routing": {"type": "whatever", "required": true}}}))
        .unwrap();
    assert!(mapper.routing_required());
    assert_eq!(
        mapper.metadata_mapper("_routing"),
        Some(&MetadataFieldMapper::Routing(RoutingFieldMapper { required: true }))
    );
}

#[test]
fn metadata_errors_win_over_root_leftovers() {
    let err = parser()
        .parse_value(
            None,
            json!({"doc": {"bogus": 1, "_meta": "nope", "_source": {"enabled": false, "junk": 2}}}),
        )
        .unwrap_err();
    assert!(err.to_string().starts_with("Mapping definition for [_source]"));

    let err = parser()
        .parse_value(None, json!({"doc": {"bogus": 1, "_meta": "nope"}}))
        .unwrap_err();
    assert!(err.to_string().contains("[_meta] must be an object"));
}

#[test]
fn parent_field_is_supported_on_old_indices() {
    let mapper = parser()
        .parse_value(None, json!({"answer": {"_parent": {"type": "question"}}}))
        .unwrap();
    match mapper.metadata_mapper("_parent") {
        Some(MetadataFieldMapper::Parent(parent)) => assert_eq!(parent.parent_type, "question"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parent_field_is_unknown_on_new_indices() {
    let settings = IndexSettings::new("test").with_version_created(semver::Version::new(7, 1, 0));
    let parser = DocumentMapperParser::from_settings(settings).unwrap();
    let err = parser
        .parse_value(None, json!({"answer": {"_parent": {"type": "question"}}}))
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Root mapping definition has unsupported parameters:  [_parent : "));
}

#[test]
fn full_mapping_builds_field_tree() {
    let mapper = parser()
        .parse_value(
            None,
            json!({
                "event": {
                    "dynamic": "strict",
                    "_source": {"excludes": ["raw"]},
                    "_routing": {"required": true},
                    "_meta": {"version": 3},
                    "properties": {
                        "title": {"type": "text", "analyzer": "whitespace"},
                        "tags": {"type": "keyword", "ignore_above": 64},
                        "at": {"type": "date", "format": "epoch_millis"},
                        "user": {
                            "properties": {
                                "id": {"type": "long"},
                                "active": {"type": "boolean", "null_value": false}
                            }
                        },
                        "items": {"type": "nested", "properties": {"sku": {"type": "keyword"}}}
                    }
                }
            }),
        )
        .unwrap();

    assert_eq!(mapper.type_name(), "event");
    assert!(mapper.routing_required());
    assert!(mapper.source_enabled());
    assert_eq!(
        mapper.metadata_mapper("_source"),
        Some(&MetadataFieldMapper::Source(SourceFieldMapper {
            enabled: true,
            includes: vec![],
            excludes: vec!["raw".to_string()],
        }))
    );
    assert_eq!(mapper.field("user.id").unwrap().type_name(), "long");
    assert_eq!(mapper.field("items").unwrap().type_name(), "nested");
    assert_eq!(mapper.field("items.sku").unwrap().type_name(), "keyword");
    assert!(mapper.field("user.missing").is_none());
    assert_eq!(mapper.index_analyzer("title").unwrap().name, "whitespace");
    assert!(mapper.index_analyzer("tags").is_none());
    match mapper.field("at") {
        Some(FieldMapper::Date(date)) => assert_eq!(date.format.pattern(), "epoch_millis"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn nested_field_errors_propagate_unchanged() {
    let err = parser()
        .parse_value(
            None,
            json!({"doc": {"properties": {"user": {"properties": {"age": {"type": "integer", "store": true}}}}}}),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mapping definition for [age] has unsupported parameters:  [store : true]"
    );
}

#[test]
fn text_field_uses_default_analyzer() {
    let settings = IndexSettings::from_json_str(
        r#"{"index_name": "t", "analysis": {"default_analyzer": "folding", "analyzers": ["folding"]}}"#,
    )
    .unwrap();
    let parser = DocumentMapperParser::from_settings(settings).unwrap();
    let mapper = parser
        .parse_value(None, json!({"doc": {"properties": {"body": {"type": "text"}, "title": {"type": "text", "analyzer": "folding"}}}}))
        .unwrap();
    assert_eq!(mapper.index_analyzer("body").unwrap().name, "folding");
    assert_eq!(mapper.index_analyzer("title").unwrap().name, "folding");
}

#[test]
fn source_can_be_disabled() {
    let mapper = parser()
        .parse_value(None, json!({"doc": {"_source": {"enabled": false}}}))
        .unwrap();
    assert!(!mapper.source_enabled());
    assert!(!mapper.routing_required());
}
