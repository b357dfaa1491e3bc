mod common;

use common::{contact, person};
use fieldsync_sync::{CorrelationMap, Correlator, NoCorrelation, ObjectChange, correlate_with};
use fieldsync_types::Direction;
use pretty_assertions::assert_eq;

#[test]
fn no_correlation_never_matches() {
    let change = ObjectChange::identified("Contact", "42");
    assert_eq!(
        NoCorrelation.correlate(Direction::InternalToIntegration, "Contact", &change),
        None
    );
}

#[test]
fn correlation_map_links_both_directions() {
    let mut map = CorrelationMap::new();
    map.link("person", "42", "Contact", "c-7");
    assert_eq!(map.len(), 1);

    // Translated objects carry the source-side id.
    let outgoing = ObjectChange::identified("Contact", "42");
    assert_eq!(
        map.correlate(Direction::InternalToIntegration, "Contact", &outgoing),
        Some("c-7".to_string())
    );

    let incoming = ObjectChange::identified("person", "c-7");
    assert_eq!(
        map.correlate(Direction::IntegrationToInternal, "person", &incoming),
        Some("42".to_string())
    );
}

#[test]
fn correlation_map_misses() {
    let mut map = CorrelationMap::new();
    map.link("person", "42", "Contact", "c-7");

    let unknown = ObjectChange::identified("Contact", "43");
    assert_eq!(map.correlate(Direction::InternalToIntegration, "Contact", &unknown), None);

    // Wrong destination entity.
    let other = ObjectChange::identified("Lead", "42");
    assert_eq!(map.correlate(Direction::InternalToIntegration, "Lead", &other), None);

    assert_eq!(
        map.correlate(Direction::InternalToIntegration, "Contact", &ObjectChange::new("Contact")),
        None
    );
    assert!(CorrelationMap::new().is_empty());
}

#[test]
fn closure_correlator_matches_on_field_values() {
    let by_email = correlate_with(|direction, entity, change| {
        let email = change.value("Email")?.as_str()?;
        (direction == Direction::InternalToIntegration
            && entity == "Contact"
            && email == "jon@example.com")
            .then(|| "c-7".to_string())
    });

    let translated = contact("42").with_field("Email", "jon@example.com");
    assert_eq!(
        by_email.correlate(Direction::InternalToIntegration, "Contact", &translated),
        Some("c-7".to_string())
    );

    let other = person("42").with_field("email", "jon@example.com");
    assert_eq!(by_email.correlate(Direction::IntegrationToInternal, "person", &other), None);
}
