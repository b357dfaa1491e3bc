#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use fieldsync_model::{FieldMapping, MappingManual};
use fieldsync_sync::{
    CorrelationMap, Correlator, FieldChange, LatestChangeJudge, NoCorrelation, ObjectChange,
    SyncConfig, SyncProcess,
};
use fieldsync_types::NormalizedValue;
use std::sync::Arc;

/// `2024-01-01T00:00:00Z` plus `secs`.
pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
}

pub fn field_at(name: &str, value: impl Into<NormalizedValue>, secs: i64) -> FieldChange {
    FieldChange::new(name, value).with_changed_at(t(secs))
}

/// `person` internally, `Contact` in the CRM.
pub fn person_manual() -> Arc<MappingManual> {
    Arc::new(
        MappingManual::new(
            "ExampleCrm",
            vec![
                FieldMapping::new("person", "email", "Contact", "Email"),
                FieldMapping::new("person", "first_name", "Contact", "FirstName"),
                FieldMapping::new("person", "last_name", "Contact", "LastName"),
            ],
        )
        .unwrap(),
    )
}

/// person#42 is Contact#c-7.
pub fn linked() -> Arc<CorrelationMap> {
    let mut map = CorrelationMap::new();
    map.link("person", "42", "Contact", "c-7");
    Arc::new(map)
}

pub fn process_with(manual: Arc<MappingManual>, correlator: Arc<dyn Correlator>) -> SyncProcess {
    SyncProcess::new(
        manual,
        Arc::new(LatestChangeJudge),
        correlator,
        SyncConfig::default(),
    )
}

pub fn linked_process() -> SyncProcess {
    process_with(person_manual(), linked())
}

pub fn uncorrelated_process() -> SyncProcess {
    process_with(person_manual(), Arc::new(NoCorrelation))
}

pub fn person(id: &str) -> ObjectChange {
    ObjectChange::identified("person", id)
}

pub fn contact(id: &str) -> ObjectChange {
    ObjectChange::identified("Contact", id)
}
