//! Field mapping model for fieldsync.
//!
//! Defines how the two sides of a sync correspond to each other:
//! - [`FieldMapping`] — one `(entity, field)` pair on each side
//! - [`MappingManual`] — every mapping for one integration, indexed in both
//!   directions, plus each side's [`FieldTypeTable`]
//! - [`FieldTypeTable`] — the declared [`ValueKind`] of every field on one side
//! - [`ManualConfig`] — the JSON document a manual is loaded from
//!
//! A manual is validated once at construction and is immutable afterwards.
//! Sync runs borrow it; nothing in a run mutates it.
//!
//! [`ValueKind`]: fieldsync_types::ValueKind

mod config;
mod error;
mod field_types;
mod manual;
mod mapping;

pub use config::ManualConfig;
pub use error::{ManualError, ManualResult};
pub use field_types::FieldTypeTable;
pub use manual::MappingManual;
pub use mapping::FieldMapping;
