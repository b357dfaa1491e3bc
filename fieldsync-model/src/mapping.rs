use fieldsync_types::Side;
use serde::{Deserialize, Serialize};

/// One declared correspondence between an internal field and an
/// integration field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMapping {
    internal_entity: String,
    internal_field: String,
    integration_entity: String,
    integration_field: String,
}

impl FieldMapping {
    pub fn new(
        internal_entity: impl Into<String>,
        internal_field: impl Into<String>,
        integration_entity: impl Into<String>,
        integration_field: impl Into<String>,
    ) -> Self {
        Self {
            internal_entity: internal_entity.into(),
            internal_field: internal_field.into(),
            integration_entity: integration_entity.into(),
            integration_field: integration_field.into(),
        }
    }

    pub fn internal_entity(&self) -> &str {
        &self.internal_entity
    }

    pub fn internal_field(&self) -> &str {
        &self.internal_field
    }

    pub fn integration_entity(&self) -> &str {
        &self.integration_entity
    }

    pub fn integration_field(&self) -> &str {
        &self.integration_field
    }

    /// The entity on `side`.
    pub fn entity(&self, side: Side) -> &str {
        match side {
            Side::Internal => &self.internal_entity,
            Side::Integration => &self.integration_entity,
        }
    }

    /// The field on `side`.
    pub fn field(&self, side: Side) -> &str {
        match side {
            Side::Internal => &self.internal_field,
            Side::Integration => &self.integration_field,
        }
    }
}
