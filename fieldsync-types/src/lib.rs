//! Core type definitions for fieldsync.
//!
//! This crate defines the side-agnostic types every other fieldsync crate
//! depends on:
//! - [`Side`] and [`Direction`], naming the two systems being reconciled
//! - [`RunId`], a time-ordered identifier for one sync run (UUID v7)
//! - [`NormalizedValue`] and [`ValueKind`], the typed representation of a
//!   single field value
//! - [`Normalizer`] and [`ValueNormalizer`], converting between a side's
//!   native JSON encoding and [`NormalizedValue`]
//!
//! Field names, entities and mappings are not defined here; they live in
//! `fieldsync-model`.

mod ids;
mod normalize;
mod side;
mod value;

pub use ids::RunId;
pub use normalize::{to_native, to_normalized, Normalizer, ValueNormalizer};
pub use side::{Direction, Side};
pub use value::{NormalizedValue, ValueKind};

/// Result type alias for normalization.
pub type NormalizationResult<T> = std::result::Result<T, NormalizationError>;

/// A value kind name that fieldsync does not know how to represent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported value type '{0}'")]
pub struct UnsupportedTypeError(pub String);

/// A native value could not be converted to (or between) value kinds.
///
/// Raised per field. Callers isolate it to the offending field and keep
/// processing siblings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot normalize {raw} as {kind}{}: {reason}", field_suffix(.field))]
pub struct NormalizationError {
    /// Field the value belongs to, once known.
    pub field: Option<String>,
    /// The offending raw value, rendered as JSON.
    pub raw: String,
    /// The kind the value was being converted to.
    pub kind: ValueKind,
    /// Why the conversion failed.
    pub reason: String,
}

impl NormalizationError {
    pub fn new(kind: ValueKind, raw: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            field: None,
            raw: raw.to_string(),
            kind,
            reason: reason.into(),
        }
    }

    /// Attaches the field name the failing value belongs to.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|f| format!(" for field '{f}'"))
        .unwrap_or_default()
}
