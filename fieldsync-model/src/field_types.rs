use fieldsync_types::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The declared value kind of every field on one side, by entity.
///
/// Each side owns its own table: the same logical field may be an `int` on
/// one side and a `string` on the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTypeTable {
    entities: BTreeMap<String, BTreeMap<String, ValueKind>>,
}

impl FieldTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_field(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        self.insert(entity, field, kind);
        self
    }

    /// Declares `entity.field` as `kind`, replacing any earlier declaration.
    pub fn insert(&mut self, entity: impl Into<String>, field: impl Into<String>, kind: ValueKind) {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(field.into(), kind);
    }

    /// The declared kind of `entity.field`, if any.
    pub fn kind_of(&self, entity: &str, field: &str) -> Option<ValueKind> {
        self.entities.get(entity)?.get(field).copied()
    }

    pub fn contains(&self, entity: &str, field: &str) -> bool {
        self.kind_of(entity, field).is_some()
    }

    /// Declared fields of one entity.
    pub fn fields(&self, entity: &str) -> impl Iterator<Item = (&str, ValueKind)> {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(f, k)| (f.as_str(), *k)))
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.values().all(BTreeMap::is_empty)
    }
}
