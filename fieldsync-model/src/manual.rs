//! The mapping manual for one integration.

use crate::{FieldMapping, FieldTypeTable, ManualError, ManualResult};
use fieldsync_types::{Direction, Side, ValueKind};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// `entity -> field -> index into MappingManual::mappings`.
type SideIndex = HashMap<String, HashMap<String, usize>>;

/// The complete, ordered set of field mappings for one integration.
///
/// Lookups work in both directions. Construction rejects a manual that maps
/// the same `(entity, field)` twice on either side, so every lookup has at
/// most one answer and `resolve` is a bijection per direction.
#[derive(Debug, Clone)]
pub struct MappingManual {
    integration: String,
    mappings: Vec<FieldMapping>,
    internal_index: SideIndex,
    integration_index: SideIndex,
    internal_types: FieldTypeTable,
    integration_types: FieldTypeTable,
}

impl MappingManual {
    /// Builds a manual, validating that mappings are unique per side.
    pub fn new(integration: impl Into<String>, mappings: Vec<FieldMapping>) -> ManualResult<Self> {
        let integration = integration.into();
        let mut internal_index = SideIndex::new();
        let mut integration_index = SideIndex::new();

        for (idx, mapping) in mappings.iter().enumerate() {
            for side in [Side::Internal, Side::Integration] {
                let (entity, field) = (mapping.entity(side), mapping.field(side));
                if entity.is_empty() || field.is_empty() {
                    return Err(ManualError::InvalidMapping(format!(
                        "{side} entity and field must be non-empty (mapping #{idx})"
                    )));
                }

                let index = match side {
                    Side::Internal => &mut internal_index,
                    Side::Integration => &mut integration_index,
                };
                let fields = index.entry(entity.to_string()).or_default();
                if fields.insert(field.to_string(), idx).is_some() {
                    return Err(ManualError::DuplicateMapping {
                        side,
                        entity: entity.to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }

        debug!(
            "Built mapping manual for {} with {} mappings",
            integration,
            mappings.len()
        );

        Ok(Self {
            integration,
            mappings,
            internal_index,
            integration_index,
            internal_types: FieldTypeTable::default(),
            integration_types: FieldTypeTable::default(),
        })
    }

    /// Attaches `side`'s field-type table.
    ///
    /// A non-empty table must declare every field the manual maps on that
    /// side. An empty table means values from that side are taken as
    /// reported, without kind checks.
    pub fn with_field_types(mut self, side: Side, table: FieldTypeTable) -> ManualResult<Self> {
        if !table.is_empty() {
            if let Some(missing) = self
                .mappings
                .iter()
                .find(|m| !table.contains(m.entity(side), m.field(side)))
            {
                return Err(ManualError::UndeclaredField {
                    side,
                    entity: missing.entity(side).to_string(),
                    field: missing.field(side).to_string(),
                });
            }
        }

        match side {
            Side::Internal => self.internal_types = table,
            Side::Integration => self.integration_types = table,
        }
        Ok(self)
    }

    /// The integration this manual belongs to.
    pub fn integration(&self) -> &str {
        &self.integration
    }

    /// All mappings in declaration order.
    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The mapping that covers `entity.field` on `side`.
    pub fn mapping_for(&self, side: Side, entity: &str, field: &str) -> Option<&FieldMapping> {
        let idx = self.index(side).get(entity)?.get(field)?;
        self.mappings.get(*idx)
    }

    /// Translates `(entity, field)` from the direction's source side to its
    /// destination side. `None` means the field is not mapped.
    pub fn resolve(&self, direction: Direction, entity: &str, field: &str) -> Option<(&str, &str)> {
        let destination = direction.destination();
        self.mapping_for(direction.source(), entity, field)
            .map(|m| (m.entity(destination), m.field(destination)))
    }

    /// Mapped fields of a source-side entity.
    pub fn fields_for(&self, direction: Direction, entity: &str) -> BTreeSet<&str> {
        self.index(direction.source())
            .get(entity)
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Entities of `side` that appear in the manual, in declaration order.
    pub fn entities(&self, side: Side) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.mappings
            .iter()
            .map(|m| m.entity(side))
            .filter(|entity| seen.insert(*entity))
            .collect()
    }

    /// Destination entities that a source entity's fields map into, in
    /// declaration order.
    pub fn targets_for(&self, direction: Direction, entity: &str) -> Vec<&str> {
        let (source, destination) = (direction.source(), direction.destination());
        let mut seen = BTreeSet::new();
        self.mappings
            .iter()
            .filter(|m| m.entity(source) == entity)
            .map(|m| m.entity(destination))
            .filter(|target| seen.insert(*target))
            .collect()
    }

    /// `side`'s field-type table.
    pub fn field_types(&self, side: Side) -> &FieldTypeTable {
        match side {
            Side::Internal => &self.internal_types,
            Side::Integration => &self.integration_types,
        }
    }

    /// Declared kind of `entity.field` on `side`.
    pub fn declared_kind(&self, side: Side, entity: &str, field: &str) -> Option<ValueKind> {
        self.field_types(side).kind_of(entity, field)
    }

    fn index(&self, side: Side) -> &SideIndex {
        match side {
            Side::Internal => &self.internal_index,
            Side::Integration => &self.integration_index,
        }
    }
}
