//! File-backed exchange and helpers for the `fieldsync` binary.
//!
//! A snapshot file holds every record of one side, by entity:
//!
//! ```json
//! { "person": [ { "id": "42", "email": "jon@example.com",
//!                 "last_modified": "2024-01-01T00:00:05Z" } ] }
//! ```
//!
//! Delivering an order writes a payload file next to it:
//!
//! ```json
//! { "create": [ { "entity": "person", "fields": { ... } } ],
//!   "update": [ { "entity": "person", "id": "42", "fields": { ... } } ] }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldsync_model::{FieldTypeTable, ManualConfig, MappingManual};
use fieldsync_sync::{
    ChangeReport, CorrelationMap, DataExchange, Diagnostic, ExchangeError, ObjectChange,
    RequestDao, SyncOrder,
};
use fieldsync_types::{Normalizer, Side, ValueKind, ValueNormalizer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "last_modified";

/// Reads and validates a mapping manual document.
pub fn load_manual(path: &Path) -> Result<MappingManual> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manual {}", path.display()))?;
    let manual = ManualConfig::from_json(&json)
        .and_then(ManualConfig::into_manual)
        .with_context(|| format!("Invalid manual {}", path.display()))?;
    info!(
        "Loaded manual for {} ({} mappings)",
        manual.integration(),
        manual.len()
    );
    Ok(manual)
}

/// A known pair of records, one on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub internal_entity: String,
    pub internal_id: String,
    pub integration_entity: String,
    pub integration_id: String,
}

/// Reads a JSON array of [`Link`]s into a correlation table.
pub fn load_links(path: &Path) -> Result<CorrelationMap> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read links {}", path.display()))?;
    let links: Vec<Link> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid links file {}", path.display()))?;

    let mut map = CorrelationMap::new();
    for link in &links {
        map.link(
            &link.internal_entity,
            &link.internal_id,
            &link.integration_entity,
            &link.integration_id,
        );
    }
    debug!("Loaded {} record link(s)", map.len());
    Ok(map)
}

/// One record in a delivered payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadObject {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

/// What a [`JsonFileExchange`] writes on delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub create: Vec<PayloadObject>,
    pub update: Vec<PayloadObject>,
}

/// A side backed by a JSON snapshot file.
pub struct JsonFileExchange {
    side: Side,
    name: String,
    snapshot: PathBuf,
    output: PathBuf,
    types: FieldTypeTable,
    normalizer: Arc<dyn Normalizer>,
    id_field: String,
    timestamp_field: String,
}

impl JsonFileExchange {
    pub fn new(side: Side, snapshot: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            side,
            name: side.as_str().to_string(),
            snapshot: snapshot.into(),
            output: output.into(),
            types: FieldTypeTable::default(),
            normalizer: Arc::new(ValueNormalizer),
            id_field: DEFAULT_ID_FIELD.to_string(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declared kinds of this side's fields. Without a table, kinds are
    /// inferred from the JSON values.
    #[must_use]
    pub fn with_types(mut self, types: FieldTypeTable) -> Self {
        self.types = types;
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    async fn read_snapshot(&self) -> Result<Map<String, Value>, ExchangeError> {
        let bytes = tokio::fs::read(&self.snapshot).await?;
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(entities) => Ok(entities),
            _ => Err(ExchangeError::Rejected(format!(
                "snapshot {} must be an object of entity arrays",
                self.snapshot.display()
            ))),
        }
    }

    fn record_id(&self, record: &Map<String, Value>) -> Option<String> {
        match record.get(&self.id_field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Adds one snapshot record to the report if it changed since `from`.
    fn add_record(
        &self,
        report: &mut ChangeReport,
        entity: &str,
        fields: &[String],
        record: &Map<String, Value>,
        from: DateTime<Utc>,
    ) {
        let id = self.record_id(record);

        let changed_at = match record.get(&self.timestamp_field) {
            None | Some(Value::Null) => None,
            Some(native) => match self.normalizer.normalize(ValueKind::DateTime, native) {
                Ok(value) => value.as_datetime().map(|dt| dt.with_timezone(&Utc)),
                Err(err) => {
                    report.push_diagnostic(Diagnostic::normalization_failed(
                        self.side,
                        entity,
                        id.as_deref(),
                        &self.timestamp_field,
                        &err.with_field(&self.timestamp_field),
                    ));
                    report.push_diagnostic(Diagnostic::object_excluded(
                        self.side,
                        entity,
                        id.as_deref(),
                        1,
                    ));
                    return;
                }
            },
        };
        if changed_at.is_some_and(|ts| ts < from) {
            return;
        }

        let requested: Vec<(&str, &Value)> = record
            .iter()
            .filter(|(name, value)| fields.contains(name) && !value.is_null())
            .map(|(name, value)| (name.as_str(), value))
            .collect();

        let inferred;
        let types = if self.types.is_empty() {
            inferred = infer_types(entity, &requested);
            &inferred
        } else {
            &self.types
        };

        report.add_native_object(
            entity,
            id,
            changed_at,
            requested,
            types,
            self.normalizer.as_ref(),
        );
    }

    fn payload_object(&self, change: &ObjectChange) -> PayloadObject {
        PayloadObject {
            entity: change.entity.clone(),
            id: change.identifier.clone(),
            fields: change
                .fields
                .iter()
                .map(|f| (f.name.clone(), self.normalizer.denormalize(&f.value)))
                .collect(),
        }
    }
}

#[async_trait]
impl DataExchange for JsonFileExchange {
    fn side(&self) -> Side {
        self.side
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_sync_report(&self, request: &RequestDao) -> Result<ChangeReport, ExchangeError> {
        let snapshot = self.read_snapshot().await?;
        let mut report = ChangeReport::new(self.side, &self.name, request.from_timestamp());

        for object in request.objects() {
            let Some(records) = snapshot.get(object.object()) else {
                debug!("{} snapshot has no {} records", self.name, object.object());
                continue;
            };
            let Value::Array(records) = records else {
                return Err(ExchangeError::Rejected(format!(
                    "entity {} must be an array of records",
                    object.object()
                )));
            };
            for record in records {
                let Value::Object(record) = record else {
                    return Err(ExchangeError::Rejected(format!(
                        "{} record is not an object",
                        object.object()
                    )));
                };
                self.add_record(
                    &mut report,
                    object.object(),
                    object.fields(),
                    record,
                    request.from_timestamp(),
                );
            }
        }

        info!(
            "Read {} changed object(s) from {}",
            report.object_count(),
            self.snapshot.display()
        );
        Ok(report)
    }

    async fn execute_sync_order(&self, order: &SyncOrder) -> Result<(), ExchangeError> {
        let payload = OrderPayload {
            create: order
                .unidentified_objects()
                .values()
                .flatten()
                .map(|change| self.payload_object(change))
                .collect(),
            update: order
                .identified_objects()
                .values()
                .flat_map(|objects| objects.values())
                .map(|change| self.payload_object(change))
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&payload)?;
        tokio::fs::write(&self.output, json).await?;
        info!(
            "Wrote {} create(s) and {} update(s) to {}",
            payload.create.len(),
            payload.update.len(),
            self.output.display()
        );
        Ok(())
    }
}

/// Guesses field kinds from JSON values, for snapshots without a type table.
fn infer_types(entity: &str, fields: &[(&str, &Value)]) -> FieldTypeTable {
    let mut table = FieldTypeTable::new();
    for (name, value) in fields {
        let kind = match value {
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Int,
            Value::Number(_) => ValueKind::Float,
            _ => ValueKind::String,
        };
        table.insert(entity, *name, kind);
    }
    table
}
