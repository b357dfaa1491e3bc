//! Non-fatal conditions recorded during a sync run.
//!
//! A run never truncates its output silently: every field or object left out
//! of an order has a diagnostic explaining why.

use fieldsync_types::{NormalizationError, Side, UnsupportedTypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of condition a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A reported field has no mapping; it was dropped.
    UnmappedFieldSkipped,
    /// A field's type is not declared or not supported; it was dropped.
    UnsupportedType,
    /// A value could not be normalized or converted.
    NormalizationFailed,
    /// Both sides changed a field and the judge could not pick a winner.
    /// Neither side was updated for that field.
    ConflictUnresolved,
    /// An object was left out of the order because of field errors.
    ObjectExcluded,
    /// A side failed to apply its order.
    DeliveryFailed,
}

impl DiagnosticKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnmappedFieldSkipped => "unmapped_field_skipped",
            Self::UnsupportedType => "unsupported_type",
            Self::NormalizationFailed => "normalization_failed",
            Self::ConflictUnresolved => "conflict_unresolved",
            Self::ObjectExcluded => "object_excluded",
            Self::DeliveryFailed => "delivery_failed",
        }
    }
}

/// A structured, serializable record of one non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The side the offending data came from. `None` for two-sided conflicts;
    /// the destination for conflicts between changes bound for one record.
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Diagnostic {
    fn object(
        kind: DiagnosticKind,
        side: Side,
        entity: &str,
        identifier: Option<&str>,
        message: String,
    ) -> Self {
        Self {
            kind,
            side: Some(side),
            entity: Some(entity.to_string()),
            identifier: identifier.map(str::to_string),
            field: None,
            message,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn unmapped_field(side: Side, entity: &str, identifier: Option<&str>, field: &str) -> Self {
        Self::object(
            DiagnosticKind::UnmappedFieldSkipped,
            side,
            entity,
            identifier,
            format!("{side} field {entity}.{field} has no mapping"),
        )
        .with_field(field)
    }

    pub fn unsupported_type(
        side: Side,
        entity: &str,
        identifier: Option<&str>,
        field: &str,
        error: &UnsupportedTypeError,
    ) -> Self {
        Self::object(
            DiagnosticKind::UnsupportedType,
            side,
            entity,
            identifier,
            error.to_string(),
        )
        .with_field(field)
    }

    pub fn normalization_failed(
        side: Side,
        entity: &str,
        identifier: Option<&str>,
        field: &str,
        error: &NormalizationError,
    ) -> Self {
        Self::object(
            DiagnosticKind::NormalizationFailed,
            side,
            entity,
            identifier,
            error.to_string(),
        )
        .with_field(field)
    }

    pub fn object_excluded(
        side: Side,
        entity: &str,
        identifier: Option<&str>,
        failed_fields: usize,
    ) -> Self {
        Self::object(
            DiagnosticKind::ObjectExcluded,
            side,
            entity,
            identifier,
            format!("{side} object {entity} excluded: {failed_fields} field(s) failed"),
        )
    }

    /// A two-sided conflict, reported against the integration's naming.
    pub fn conflict_unresolved(
        entity: &str,
        identifier: Option<&str>,
        field: &str,
        detail: String,
    ) -> Self {
        Self {
            kind: DiagnosticKind::ConflictUnresolved,
            side: None,
            entity: Some(entity.to_string()),
            identifier: identifier.map(str::to_string),
            field: Some(field.to_string()),
            message: detail,
        }
    }

    /// Two changes bound for the same record of `destination` disagree on a
    /// field and neither is newer.
    pub fn merge_conflict(
        destination: Side,
        entity: &str,
        identifier: Option<&str>,
        field: &str,
        detail: String,
    ) -> Self {
        Self::object(
            DiagnosticKind::ConflictUnresolved,
            destination,
            entity,
            identifier,
            detail,
        )
        .with_field(field)
    }

    pub fn delivery_failed(side: Side, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::DeliveryFailed,
            side: Some(side),
            entity: None,
            identifier: None,
            field: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}
