//! Sync orders: the judged create/update instructions for one side.

use crate::{Diagnostic, ObjectChange};
use chrono::{DateTime, Utc};
use fieldsync_types::Side;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

/// Changes to deliver to one side, split into objects to create and objects
/// to update.
///
/// An object with an identifier always lands in `identified`, keyed by
/// `(entity, identifier)`; objects without one land in `unidentified`. A key
/// can therefore never appear in both partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOrder {
    destination: Side,
    unidentified: BTreeMap<String, Vec<ObjectChange>>,
    identified: BTreeMap<String, BTreeMap<String, ObjectChange>>,
}

impl SyncOrder {
    pub fn new(destination: Side) -> Self {
        Self {
            destination,
            unidentified: BTreeMap::new(),
            identified: BTreeMap::new(),
        }
    }

    /// The side this order is delivered to.
    pub fn destination(&self) -> Side {
        self.destination
    }

    /// Adds an object to the partition its identifier selects.
    ///
    /// A second change for an already identified key is merged into the
    /// first field by field. The later field-level timestamp keeps its value,
    /// then the later object-level one. Two different values that cannot be
    /// ordered are both dropped and returned as `ConflictUnresolved`
    /// diagnostics.
    pub fn add(&mut self, change: ObjectChange) -> Vec<Diagnostic> {
        let Some(id) = change.identifier.clone() else {
            self.unidentified
                .entry(change.entity.clone())
                .or_default()
                .push(change);
            return Vec::new();
        };

        let objects = self.identified.entry(change.entity.clone()).or_default();
        let Some(existing) = objects.get_mut(&id) else {
            objects.insert(id, change);
            return Vec::new();
        };

        warn!(
            "Merging duplicate {} order entries for {}#{}",
            self.destination, change.entity, id
        );
        let conflicts = merge_fields(self.destination, existing, change);
        if existing.is_empty() {
            objects.remove(&id);
        }
        conflicts
    }

    /// Objects to create, by entity.
    pub fn unidentified_objects(&self) -> &BTreeMap<String, Vec<ObjectChange>> {
        &self.unidentified
    }

    /// Objects to update, by entity and identifier.
    pub fn identified_objects(&self) -> &BTreeMap<String, BTreeMap<String, ObjectChange>> {
        &self.identified
    }

    /// The update for one identified object.
    pub fn identified(&self, entity: &str, identifier: &str) -> Option<&ObjectChange> {
        self.identified.get(entity)?.get(identifier)
    }

    pub fn unidentified_count(&self) -> usize {
        self.unidentified.values().map(Vec::len).sum()
    }

    pub fn identified_count(&self) -> usize {
        self.identified.values().map(BTreeMap::len).sum()
    }

    pub fn object_count(&self) -> usize {
        self.unidentified_count() + self.identified_count()
    }

    pub fn is_empty(&self) -> bool {
        self.object_count() == 0
    }
}

/// Folds `incoming` into `existing`, field by field.
fn merge_fields(
    destination: Side,
    existing: &mut ObjectChange,
    incoming: ObjectChange,
) -> Vec<Diagnostic> {
    let mut conflicts = Vec::new();
    let existing_at = existing.changed_at;

    for field in incoming.fields {
        let Some(current) = existing.field(&field.name) else {
            existing.add_field(field);
            continue;
        };
        if current.value == field.value {
            continue;
        }

        let ordering = compare(field.changed_at, current.changed_at)
            .then_with(|| compare(incoming.changed_at, existing_at));
        match ordering {
            Ordering::Greater => existing.add_field(field),
            Ordering::Less => {}
            Ordering::Equal => {
                let detail = format!(
                    "two changes for {}#{} set {} to {} and {}",
                    existing.entity,
                    existing.identifier.as_deref().unwrap_or_default(),
                    field.name,
                    current.value,
                    field.value
                );
                warn!("{}", detail);
                conflicts.push(Diagnostic::merge_conflict(
                    destination,
                    &existing.entity,
                    existing.identifier.as_deref(),
                    &field.name,
                    detail,
                ));
                existing.fields.retain(|f| f.name != field.name);
            }
        }
    }

    if incoming.changed_at > existing.changed_at {
        existing.changed_at = incoming.changed_at;
    }
    conflicts
}

/// Orders two timestamps; unknown on either side compares equal.
fn compare(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}
