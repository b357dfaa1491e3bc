//! Error types for mapping manual construction.

use fieldsync_types::{Side, UnsupportedTypeError};
use thiserror::Error;

/// Result type for manual operations.
pub type ManualResult<T> = Result<T, ManualError>;

/// Configuration errors. All of them surface when a manual is built, never
/// during a sync run.
#[derive(Debug, Error)]
pub enum ManualError {
    /// The same `(entity, field)` is mapped twice on one side.
    #[error("duplicate mapping for {side} field {entity}.{field}")]
    DuplicateMapping {
        side: Side,
        entity: String,
        field: String,
    },

    /// A mapped field is missing from that side's field-type table.
    #[error("{side} field {entity}.{field} is mapped but has no declared type")]
    UndeclaredField {
        side: Side,
        entity: String,
        field: String,
    },

    /// A mapping with an empty entity or field name.
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    /// A field-type table names a kind fieldsync does not support.
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedTypeError),

    /// The manual document is not valid JSON for a manual.
    #[error("manual config error: {0}")]
    Config(#[from] serde_json::Error),
}
