mod common;

use common::{contact, field_at, linked, person, person_manual, t};
use fieldsync_sync::exchange::mock::MemoryExchange;
use fieldsync_sync::{
    AuthoritativeSideJudge, DataExchange, DiagnosticKind, LatestChangeJudge, SyncConfig,
    SyncError, SyncService,
};
use fieldsync_types::{NormalizedValue, Side};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::watch;

fn service() -> SyncService {
    SyncService::new(Arc::new(LatestChangeJudge), linked(), SyncConfig::default())
}

fn two_way_internal() -> MemoryExchange {
    MemoryExchange::new(Side::Internal)
        .with_object(person("42").with_field_change(field_at("email", "jon@example.com", 5)))
}

fn two_way_integration() -> MemoryExchange {
    MemoryExchange::new(Side::Integration)
        .with_object(contact("c-7").with_field_change(field_at("FirstName", "Jon", 5)))
}

#[tokio::test]
async fn sync_delivers_both_orders() {
    let internal = two_way_internal();
    let integration = two_way_integration();

    let result = service()
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert!(result.delivered);
    assert!(result.internal_order_delivered);
    assert!(result.integration_order_delivered);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.run_id, result.outcome.run_id);

    let to_crm = integration.delivered();
    assert_eq!(to_crm.len(), 1);
    assert_eq!(to_crm[0], result.outcome.integration_order);
    assert_eq!(
        to_crm[0].identified("Contact", "c-7").unwrap().value("Email"),
        Some(&NormalizedValue::from("jon@example.com"))
    );

    let to_internal = internal.delivered();
    assert_eq!(to_internal.len(), 1);
    assert_eq!(
        to_internal[0].identified("person", "42").unwrap().value("first_name"),
        Some(&NormalizedValue::from("Jon"))
    );
}

#[tokio::test]
async fn delivery_failure_does_not_stop_the_other_side() {
    let internal = two_way_internal();
    let integration = two_way_integration().failing_delivery("quota exceeded");

    let result = service()
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert!(!result.delivered);
    assert!(!result.integration_order_delivered);
    assert!(result.internal_order_delivered);
    assert_eq!(internal.delivered().len(), 1);

    assert_eq!(result.diagnostics.len(), 1);
    let failure = &result.diagnostics[0];
    assert_eq!(failure.kind, DiagnosticKind::DeliveryFailed);
    assert_eq!(failure.side, Some(Side::Integration));
    assert!(failure.message.contains("quota exceeded"));
    // The outcome itself stays as assembled.
    assert!(result.outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn run_diagnostics_are_reported_once() {
    let internal = MemoryExchange::new(Side::Internal).with_object(
        person("42")
            .with_field("email", "jon@example.com")
            .with_field("nickname", "jj"),
    );
    let integration = two_way_integration();

    let result = service()
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::UnmappedFieldSkipped);
    assert!(result.outcome.diagnostics.is_empty());

    let json = serde_json::to_string(&result).unwrap();
    assert_eq!(json.matches("unmapped_field_skipped").count(), 1);
}

#[tokio::test]
async fn fetch_failure_delivers_nothing() {
    let internal = two_way_internal();
    let integration = two_way_integration().failing_fetch("503");

    let err = service()
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Fetch { side: Side::Integration, .. }));
    assert!(internal.delivered().is_empty());
    assert!(integration.delivered().is_empty());
}

#[tokio::test]
async fn empty_orders_are_skipped_by_default() {
    let internal = MemoryExchange::new(Side::Internal);
    let integration = two_way_integration();

    let result = service()
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert!(result.delivered);
    assert_eq!(internal.delivered().len(), 1);
    assert!(integration.delivered().is_empty());
}

#[tokio::test]
async fn empty_orders_can_be_delivered() {
    let internal = MemoryExchange::new(Side::Internal);
    let integration = MemoryExchange::new(Side::Integration);
    let service = SyncService::new(
        Arc::new(LatestChangeJudge),
        linked(),
        SyncConfig {
            skip_empty_orders: false,
            ..SyncConfig::default()
        },
    );

    service
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert_eq!(internal.delivered().len(), 1);
    assert!(internal.delivered()[0].is_empty());
    assert_eq!(integration.delivered().len(), 1);
}

#[tokio::test]
async fn custom_judge_overrides_conflicts() {
    let internal = MemoryExchange::new(Side::Internal)
        .with_object(person("42").with_field_change(field_at("first_name", "Jon", 9)));
    let integration = MemoryExchange::new(Side::Integration)
        .with_object(contact("c-7").with_field_change(field_at("FirstName", "John", 1)));
    let service = SyncService::new(
        Arc::new(AuthoritativeSideJudge::new(Side::Integration)),
        linked(),
        SyncConfig::default(),
    );

    let result = service
        .sync(&internal, &integration, person_manual(), t(0))
        .await
        .unwrap();

    assert!(result.outcome.integration_order.is_empty());
    let update = result.outcome.internal_order.identified("person", "42").unwrap();
    assert_eq!(update.value("first_name"), Some(&NormalizedValue::from("John")));
}

#[tokio::test]
async fn integration_sync_needs_an_internal_exchange() {
    let err = SyncService::with_defaults()
        .process_integration_sync(&two_way_integration(), person_manual(), t(0))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
}

#[tokio::test]
async fn integration_sync_uses_the_fixed_internal_side() {
    let internal = Arc::new(two_way_internal());
    let service = service().for_internal(Arc::clone(&internal) as Arc<dyn DataExchange>);

    let crm = two_way_integration();
    let result = service
        .process_integration_sync(&crm, person_manual(), t(0))
        .await
        .unwrap();

    assert!(result.delivered);
    assert_eq!(internal.requests().len(), 1);
    assert_eq!(internal.delivered().len(), 1);
    assert_eq!(crm.delivered().len(), 1);
}

#[tokio::test]
async fn cancelled_sync_delivers_nothing() {
    let internal = two_way_internal();
    let integration = two_way_integration();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let err = service()
        .sync_until_cancelled(&internal, &integration, person_manual(), t(0), rx)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Cancelled));
    assert!(internal.delivered().is_empty());
}

#[test]
fn diagnostic_kind_reads_snake_case() {
    let json = serde_json::json!({ "kind": "delivery_failed" });
    let kind: DiagnosticKind = serde_json::from_value(json["kind"].clone()).unwrap();
    assert_eq!(kind, DiagnosticKind::DeliveryFailed);
}
