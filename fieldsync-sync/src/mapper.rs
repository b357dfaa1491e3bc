//! Object mapper - translates reported objects into the other side's terms.
//!
//! Each reported object is split into one [`MappedObject`] per destination
//! entity its fields map into. Every value is checked against the kind the
//! source side declares and converted into the kind the destination side
//! declares, so anything leaving the mapper is ready to be judged and
//! delivered.

use crate::{ChangeReport, Correlator, Diagnostic, FieldChange, ObjectChange};
use chrono::{DateTime, Utc};
use fieldsync_model::MappingManual;
use fieldsync_types::{Direction, NormalizationError, NormalizedValue, Side, to_native};
use tracing::debug;

/// One field, in both sides' terms.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedField {
    pub source_field: String,
    pub target_field: String,
    /// The value as reported, in the source side's kind.
    pub source_value: NormalizedValue,
    /// The value converted into the destination side's kind.
    pub target_value: NormalizedValue,
    pub changed_at: Option<DateTime<Utc>>,
}

/// A reported object translated into one destination entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedObject {
    pub source_side: Side,
    pub source_entity: String,
    /// The object's id on the reporting side.
    pub source_id: Option<String>,
    pub target_entity: String,
    /// The object's id on the destination side, if correlation found one.
    pub target_id: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
    pub fields: Vec<MappedField>,
}

impl MappedObject {
    /// The direction this object travels in.
    pub fn direction(&self) -> Direction {
        self.source_side.outgoing()
    }

    /// Looks a field up by its destination-side name.
    pub fn field(&self, target_field: &str) -> Option<&MappedField> {
        self.fields.iter().find(|f| f.target_field == target_field)
    }

    /// Builds the order entry for this object from the given fields.
    pub(crate) fn to_change<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a MappedField>,
    ) -> ObjectChange {
        self.change_with(fields.into_iter().map(MappedField::to_change).collect())
    }

    /// Builds the order entry for this object around already settled fields.
    pub(crate) fn change_with(&self, fields: Vec<FieldChange>) -> ObjectChange {
        ObjectChange {
            entity: self.target_entity.clone(),
            identifier: self.target_id.clone(),
            changed_at: self.changed_at,
            fields,
        }
    }
}

impl MappedField {
    /// The field as delivered, carrying its converted value.
    pub fn to_change(&self) -> FieldChange {
        self.with_value(self.target_value.clone())
    }

    /// The field as delivered, carrying `value` instead.
    pub fn with_value(&self, value: NormalizedValue) -> FieldChange {
        FieldChange {
            name: self.target_field.clone(),
            value,
            changed_at: self.changed_at,
        }
    }
}

/// Translates change reports through a [`MappingManual`].
pub struct ObjectMapper<'a> {
    manual: &'a MappingManual,
    correlator: &'a dyn Correlator,
}

impl<'a> ObjectMapper<'a> {
    pub fn new(manual: &'a MappingManual, correlator: &'a dyn Correlator) -> Self {
        Self { manual, correlator }
    }

    /// Maps every object of `report`, recording skipped fields and excluded
    /// objects in `diagnostics`.
    pub fn map_report(
        &self,
        report: &ChangeReport,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<MappedObject> {
        let mut mapped = Vec::new();
        for object in report.iter() {
            mapped.extend(self.map_object(report.source(), object, diagnostics));
        }
        debug!(
            "Mapped {} {} object(s) into {} destination object(s)",
            report.object_count(),
            report.source(),
            mapped.len()
        );
        mapped
    }

    /// Maps one object. Returns nothing when no field is mapped, or when any
    /// mapped field fails its kind check or conversion.
    pub fn map_object(
        &self,
        source: Side,
        object: &ObjectChange,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<MappedObject> {
        let direction = source.outgoing();
        let id = object.identifier.as_deref();
        let mut groups: Vec<(String, Vec<MappedField>)> = Vec::new();
        let mut failed = 0usize;

        for field in &object.fields {
            let Some((target_entity, target_field)) =
                self.manual.resolve(direction, &object.entity, &field.name)
            else {
                diagnostics.push(Diagnostic::unmapped_field(
                    source,
                    &object.entity,
                    id,
                    &field.name,
                ));
                continue;
            };

            let converted = self.convert(direction, object, field, target_entity, target_field);
            let target_value = match converted {
                Ok(value) => value,
                Err(err) => {
                    failed += 1;
                    diagnostics.push(Diagnostic::normalization_failed(
                        source,
                        &object.entity,
                        id,
                        &field.name,
                        &err.with_field(&field.name),
                    ));
                    continue;
                }
            };

            let mapped = MappedField {
                source_field: field.name.clone(),
                target_field: target_field.to_string(),
                source_value: field.value.clone(),
                target_value,
                changed_at: field.changed_at,
            };
            match groups.iter_mut().find(|(entity, _)| entity == target_entity) {
                Some((_, fields)) => fields.push(mapped),
                None => groups.push((target_entity.to_string(), vec![mapped])),
            }
        }

        if failed > 0 {
            diagnostics.push(Diagnostic::object_excluded(source, &object.entity, id, failed));
            return Vec::new();
        }

        groups
            .into_iter()
            .map(|(target_entity, fields)| {
                let mut mapped = MappedObject {
                    source_side: source,
                    source_entity: object.entity.clone(),
                    source_id: object.identifier.clone(),
                    target_entity,
                    target_id: None,
                    changed_at: object.changed_at,
                    fields,
                };
                // The correlator sees destination names with the source id.
                let mut translated = mapped.to_change(&mapped.fields);
                translated.identifier = mapped.source_id.clone();
                mapped.target_id = self
                    .correlator
                    .correlate(direction, &mapped.target_entity, &translated);
                mapped
            })
            .collect()
    }

    /// Checks a value against the source side's declared kind and converts
    /// it into the destination side's. A side without a type table is taken
    /// as reported.
    fn convert(
        &self,
        direction: Direction,
        object: &ObjectChange,
        field: &FieldChange,
        target_entity: &str,
        target_field: &str,
    ) -> Result<NormalizedValue, NormalizationError> {
        if let Some(declared) =
            self.manual
                .declared_kind(direction.source(), &object.entity, &field.name)
        {
            if field.value.kind() != declared {
                return Err(NormalizationError::new(
                    declared,
                    to_native(&field.value),
                    format!("reported as {}", field.value.kind()),
                ));
            }
        }

        match self
            .manual
            .declared_kind(direction.destination(), target_entity, target_field)
        {
            Some(kind) => field.value.coerce(kind),
            None => Ok(field.value.clone()),
        }
    }
}
