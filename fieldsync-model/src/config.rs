//! Loading a mapping manual from its JSON document.
//!
//! ```json
//! {
//!   "integration": "ExampleCrm",
//!   "mappings": [
//!     {"internal_entity": "contact", "internal_field": "email",
//!      "integration_entity": "Contact", "integration_field": "email"}
//!   ],
//!   "internal_types": {"contact": {"email": "string"}},
//!   "integration_types": {"Contact": {"email": "string"}}
//! }
//! ```
//!
//! Kind names go through `ValueKind::from_str`, so aliases such as
//! `"integer"` are accepted and unknown names fail with `UnsupportedType`.

use crate::{FieldMapping, FieldTypeTable, ManualResult, MappingManual};
use fieldsync_types::{Side, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `entity -> field -> kind name`, as written in the document.
type RawTypeTable = BTreeMap<String, BTreeMap<String, String>>;

/// The persisted form of a [`MappingManual`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualConfig {
    pub integration: String,
    pub mappings: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub internal_types: RawTypeTable,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub integration_types: RawTypeTable,
}

impl ManualConfig {
    /// Parses a manual document.
    pub fn from_json(json: &str) -> ManualResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the document and builds the manual.
    pub fn into_manual(self) -> ManualResult<MappingManual> {
        let internal = parse_table(&self.internal_types)?;
        let integration = parse_table(&self.integration_types)?;

        MappingManual::new(self.integration, self.mappings)?
            .with_field_types(Side::Internal, internal)?
            .with_field_types(Side::Integration, integration)
    }
}

fn parse_table(raw: &RawTypeTable) -> ManualResult<FieldTypeTable> {
    let mut table = FieldTypeTable::new();
    for (entity, fields) in raw {
        for (field, kind) in fields {
            table.insert(entity.as_str(), field.as_str(), kind.parse::<ValueKind>()?);
        }
    }
    Ok(table)
}
