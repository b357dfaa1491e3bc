//! Change reports: what one side says changed since a timestamp.

use crate::Diagnostic;
use chrono::{DateTime, Utc};
use fieldsync_model::FieldTypeTable;
use fieldsync_types::{NormalizedValue, Normalizer, Side, UnsupportedTypeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One changed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub name: String,
    pub value: NormalizedValue,
    /// When this specific field changed, if the side knows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<DateTime<Utc>>,
}

impl FieldChange {
    pub fn new(name: impl Into<String>, value: impl Into<NormalizedValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            changed_at: None,
        }
    }

    #[must_use]
    pub fn with_changed_at(mut self, changed_at: DateTime<Utc>) -> Self {
        self.changed_at = Some(changed_at);
        self
    }
}

/// The changed fields of one object.
///
/// In a [`ChangeReport`], `identifier` is the object's id on the reporting
/// side. In a [`SyncOrder`](crate::SyncOrder) it is the id on the side the
/// order is delivered to, and `None` means the object must be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectChange {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// When the object as a whole last changed. Used when field-level
    /// timestamps are unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<DateTime<Utc>>,
    pub fields: Vec<FieldChange>,
}

impl ObjectChange {
    /// An object with no identifier.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            identifier: None,
            changed_at: None,
            fields: Vec::new(),
        }
    }

    /// An object with a known identifier.
    pub fn identified(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            ..Self::new(entity)
        }
    }

    #[must_use]
    pub fn with_changed_at(mut self, changed_at: DateTime<Utc>) -> Self {
        self.changed_at = Some(changed_at);
        self
    }

    /// Builder-style [`add_field`](Self::add_field) without a field timestamp.
    #[must_use]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<NormalizedValue>,
    ) -> Self {
        self.add_field(FieldChange::new(name, value));
        self
    }

    #[must_use]
    pub fn with_field_change(mut self, field: FieldChange) -> Self {
        self.add_field(field);
        self
    }

    /// Adds a field, replacing an earlier change to the same field.
    pub fn add_field(&mut self, field: FieldChange) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldChange> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&NormalizedValue> {
        self.field(name).map(|f| &f.value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Objects changed on one side since `from_timestamp`, by entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    source: Side,
    integration: String,
    from_timestamp: DateTime<Utc>,
    objects: BTreeMap<String, Vec<ObjectChange>>,
    /// Problems the side hit while building the report.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

impl ChangeReport {
    pub fn new(
        source: Side,
        integration: impl Into<String>,
        from_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            integration: integration.into(),
            from_timestamp,
            objects: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The side that produced this report.
    pub fn source(&self) -> Side {
        self.source
    }

    pub fn integration(&self) -> &str {
        &self.integration
    }

    pub fn from_timestamp(&self) -> DateTime<Utc> {
        self.from_timestamp
    }

    pub fn add_object(&mut self, object: ObjectChange) -> &mut Self {
        self.objects
            .entry(object.entity.clone())
            .or_default()
            .push(object);
        self
    }

    /// Normalizes a native object and adds it to the report.
    ///
    /// Each field is converted with the kind `types` declares for it. A
    /// field with no declared kind is dropped with an `UnsupportedType`
    /// diagnostic. A field whose value fails to normalize is recorded and
    /// the remaining fields are still checked; if any failed, the whole
    /// object is left out with an `ObjectExcluded` diagnostic. Returns
    /// whether the object was added.
    pub fn add_native_object<'a>(
        &mut self,
        entity: &str,
        identifier: Option<String>,
        changed_at: Option<DateTime<Utc>>,
        fields: impl IntoIterator<Item = (&'a str, &'a serde_json::Value)>,
        types: &FieldTypeTable,
        normalizer: &dyn Normalizer,
    ) -> bool {
        let mut object = ObjectChange {
            entity: entity.to_string(),
            identifier,
            changed_at,
            fields: Vec::new(),
        };
        let mut failed = 0usize;

        for (name, native) in fields {
            let Some(kind) = types.kind_of(entity, name) else {
                let err = UnsupportedTypeError(format!("undeclared field {entity}.{name}"));
                self.diagnostics.push(Diagnostic::unsupported_type(
                    self.source,
                    entity,
                    object.identifier.as_deref(),
                    name,
                    &err,
                ));
                continue;
            };

            match normalizer.normalize(kind, native) {
                Ok(value) => object.add_field(FieldChange {
                    name: name.to_string(),
                    value,
                    changed_at: None,
                }),
                Err(err) => {
                    failed += 1;
                    self.diagnostics.push(Diagnostic::normalization_failed(
                        self.source,
                        entity,
                        object.identifier.as_deref(),
                        name,
                        &err.with_field(name),
                    ));
                }
            }
        }

        if failed > 0 {
            debug!(
                "Excluding {} object {} ({:?}): {} field(s) failed to normalize",
                self.source, entity, object.identifier, failed
            );
            self.diagnostics.push(Diagnostic::object_excluded(
                self.source,
                entity,
                object.identifier.as_deref(),
                failed,
            ));
            return false;
        }

        self.add_object(object);
        true
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Changed objects of one entity.
    pub fn objects(&self, entity: &str) -> &[ObjectChange] {
        self.objects.get(entity).map(Vec::as_slice).unwrap_or_default()
    }

    /// All entities with at least one changed object.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Every changed object, entity by entity.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectChange> {
        self.objects.values().flatten()
    }

    pub fn object_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.object_count() == 0
    }
}
