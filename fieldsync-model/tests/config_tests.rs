use fieldsync_model::{ManualConfig, ManualError};
use fieldsync_types::{Direction, Side, ValueKind};
use pretty_assertions::assert_eq;

const MANUAL: &str = r#"{
    "integration": "ExampleCrm",
    "mappings": [
        {"internal_entity": "contact", "internal_field": "email",
         "integration_entity": "Contact", "integration_field": "email"},
        {"internal_entity": "contact", "internal_field": "points",
         "integration_entity": "Contact", "integration_field": "score"}
    ],
    "internal_types": {"contact": {"email": "string", "points": "integer"}},
    "integration_types": {"Contact": {"email": "text", "score": "float"}}
}"#;

#[test]
fn loads_manual_with_type_tables() {
    let manual = ManualConfig::from_json(MANUAL).unwrap().into_manual().unwrap();

    assert_eq!(manual.integration(), "ExampleCrm");
    assert_eq!(
        manual.resolve(Direction::InternalToIntegration, "contact", "points"),
        Some(("Contact", "score"))
    );
    assert_eq!(
        manual.declared_kind(Side::Internal, "contact", "points"),
        Some(ValueKind::Int)
    );
    assert_eq!(
        manual.declared_kind(Side::Integration, "Contact", "score"),
        Some(ValueKind::Float)
    );
}

#[test]
fn type_tables_are_optional() {
    let json = r#"{"integration": "x", "mappings": [
        {"internal_entity": "a", "internal_field": "b",
         "integration_entity": "C", "integration_field": "d"}]}"#;
    let manual = ManualConfig::from_json(json).unwrap().into_manual().unwrap();
    assert!(manual.field_types(Side::Internal).is_empty());
}

#[test]
fn unknown_kind_is_unsupported() {
    let json = MANUAL.replace("\"float\"", "\"decimal\"");
    let err = ManualConfig::from_json(&json).unwrap().into_manual().unwrap_err();
    assert!(matches!(err, ManualError::UnsupportedType(_)));
}

#[test]
fn duplicate_mapping_in_document_fails_fast() {
    let json = MANUAL.replace("\"score\"", "\"email\"");
    let err = ManualConfig::from_json(&json).unwrap().into_manual().unwrap_err();
    assert!(matches!(err, ManualError::DuplicateMapping { .. }));
}

#[test]
fn malformed_document_is_a_config_error() {
    let err = ManualConfig::from_json("{\"integration\": 3}").unwrap_err();
    assert!(matches!(err, ManualError::Config(_)));
}
