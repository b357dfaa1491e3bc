use fieldsync_model::{FieldMapping, FieldTypeTable, ManualError, MappingManual};
use fieldsync_types::{Direction, Side, ValueKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn person_manual() -> MappingManual {
    MappingManual::new(
        "ExampleCrm",
        vec![
            FieldMapping::new("contact", "email", "Contact", "email"),
            FieldMapping::new("contact", "firstname", "Contact", "first_name"),
            FieldMapping::new("contact", "lastname", "Contact", "last_name"),
            FieldMapping::new("contact", "company", "Lead", "company_name"),
        ],
    )
    .unwrap()
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn manual_keeps_declaration_order() {
    let manual = person_manual();
    assert_eq!(manual.integration(), "ExampleCrm");
    assert_eq!(manual.len(), 4);
    assert_eq!(manual.mappings()[1].integration_field(), "first_name");
}

#[test]
fn duplicate_internal_field_is_rejected() {
    let err = MappingManual::new(
        "ExampleCrm",
        vec![
            FieldMapping::new("contact", "email", "Contact", "email"),
            FieldMapping::new("contact", "email", "Lead", "email"),
        ],
    )
    .unwrap_err();

    match err {
        ManualError::DuplicateMapping { side, entity, field } => {
            assert_eq!(side, Side::Internal);
            assert_eq!(entity, "contact");
            assert_eq!(field, "email");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_integration_field_is_rejected() {
    let err = MappingManual::new(
        "ExampleCrm",
        vec![
            FieldMapping::new("contact", "email", "Contact", "email"),
            FieldMapping::new("contact", "email2", "Contact", "email"),
        ],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ManualError::DuplicateMapping { side: Side::Integration, .. }
    ));
    assert_eq!(
        err.to_string(),
        "duplicate mapping for integration field Contact.email"
    );
}

#[test]
fn same_field_name_on_different_entities_is_allowed() {
    let manual = MappingManual::new(
        "ExampleCrm",
        vec![
            FieldMapping::new("contact", "email", "Contact", "email"),
            FieldMapping::new("company", "email", "Account", "email"),
        ],
    );
    assert!(manual.is_ok());
}

#[test]
fn empty_names_are_rejected() {
    let err = MappingManual::new(
        "ExampleCrm",
        vec![FieldMapping::new("contact", "", "Contact", "x")],
    )
    .unwrap_err();
    assert!(matches!(err, ManualError::InvalidMapping(_)));
}

// ── Lookups ──────────────────────────────────────────────────────

#[test]
fn resolve_in_both_directions() {
    let manual = person_manual();
    assert_eq!(
        manual.resolve(Direction::InternalToIntegration, "contact", "firstname"),
        Some(("Contact", "first_name"))
    );
    assert_eq!(
        manual.resolve(Direction::IntegrationToInternal, "Lead", "company_name"),
        Some(("contact", "company"))
    );
}

#[test]
fn unmapped_field_resolves_to_none() {
    let manual = person_manual();
    assert_eq!(
        manual.resolve(Direction::InternalToIntegration, "contact", "points"),
        None
    );
    assert_eq!(
        manual.resolve(Direction::IntegrationToInternal, "Opportunity", "email"),
        None
    );
}

#[test]
fn fields_for_lists_source_fields() {
    let manual = person_manual();
    let fields = manual.fields_for(Direction::IntegrationToInternal, "Contact");
    assert_eq!(
        fields,
        BTreeSet::from(["email", "first_name", "last_name"])
    );
    assert!(manual
        .fields_for(Direction::InternalToIntegration, "unknown")
        .is_empty());
}

#[test]
fn entities_and_targets_in_declaration_order() {
    let manual = person_manual();
    assert_eq!(manual.entities(Side::Internal), vec!["contact"]);
    assert_eq!(manual.entities(Side::Integration), vec!["Contact", "Lead"]);
    assert_eq!(
        manual.targets_for(Direction::InternalToIntegration, "contact"),
        vec!["Contact", "Lead"]
    );
    assert_eq!(
        manual.targets_for(Direction::IntegrationToInternal, "Lead"),
        vec!["contact"]
    );
}

// ── Field types ──────────────────────────────────────────────────

#[test]
fn field_types_must_cover_mapped_fields() {
    let table = FieldTypeTable::new()
        .with_field("Contact", "email", ValueKind::String)
        .with_field("Contact", "first_name", ValueKind::String);

    let err = person_manual()
        .with_field_types(Side::Integration, table)
        .unwrap_err();
    match err {
        ManualError::UndeclaredField { side, entity, field } => {
            assert_eq!(side, Side::Integration);
            assert_eq!((entity.as_str(), field.as_str()), ("Contact", "last_name"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_field_types_are_accepted() {
    let manual = person_manual()
        .with_field_types(Side::Internal, FieldTypeTable::new())
        .unwrap();
    assert_eq!(manual.declared_kind(Side::Internal, "contact", "email"), None);
}

#[test]
fn declared_kind_reads_the_sides_table() {
    let table = FieldTypeTable::new()
        .with_field("contact", "email", ValueKind::String)
        .with_field("contact", "firstname", ValueKind::String)
        .with_field("contact", "lastname", ValueKind::String)
        .with_field("contact", "company", ValueKind::String)
        .with_field("contact", "points", ValueKind::Int);
    let manual = person_manual()
        .with_field_types(Side::Internal, table)
        .unwrap();

    assert_eq!(
        manual.declared_kind(Side::Internal, "contact", "points"),
        Some(ValueKind::Int)
    );
    assert_eq!(manual.declared_kind(Side::Integration, "Contact", "email"), None);
}

// ── Bijection ────────────────────────────────────────────────────

fn unique_mappings() -> impl Strategy<Value = Vec<FieldMapping>> {
    // Unique field names per side; entities drawn from a small pool so
    // several fields share an entity.
    prop::collection::btree_set("[a-z]{1,6}", 1..20).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let n = names.len();
        (
            Just(names),
            prop::collection::vec(0usize..3, n),
            prop::collection::vec(0usize..3, n),
        )
            .prop_map(|(names, internal_entities, integration_entities)| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        FieldMapping::new(
                            format!("entity{}", internal_entities[i]),
                            format!("in_{name}"),
                            format!("Entity{}", integration_entities[i]),
                            format!("out_{name}"),
                        )
                    })
                    .collect()
            })
    })
}

proptest! {
    #[test]
    fn resolve_round_trips(mappings in unique_mappings()) {
        let manual = MappingManual::new("prop", mappings.clone()).unwrap();
        for m in &mappings {
            let (entity, field) = manual
                .resolve(Direction::InternalToIntegration, m.internal_entity(), m.internal_field())
                .unwrap();
            prop_assert_eq!(
                manual.resolve(Direction::IntegrationToInternal, entity, field),
                Some((m.internal_entity(), m.internal_field()))
            );
        }
    }
}
