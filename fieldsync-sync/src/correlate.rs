//! Identifier correlation between the two sides.
//!
//! Whether a changed object already exists on the other side (and under which
//! id) is knowledge the core does not own. A [`Correlator`] is injected into
//! the sync process and asked once per translated object.

use crate::ObjectChange;
use fieldsync_types::Direction;
use std::collections::HashMap;

/// Resolves the destination-side identifier of a changed object.
pub trait Correlator: Send + Sync {
    /// `entity` is the destination entity. `change` is the object already
    /// translated into destination field names; its `identifier` is still
    /// the source-side id. Returns the destination id, or `None` if the
    /// object is not known there.
    fn correlate(
        &self,
        direction: Direction,
        entity: &str,
        change: &ObjectChange,
    ) -> Option<String>;
}

/// Never correlates: every object is unidentified on the other side.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCorrelation;

impl Correlator for NoCorrelation {
    fn correlate(&self, _: Direction, _: &str, _: &ObjectChange) -> Option<String> {
        None
    }
}

/// A correlation table handed in by the caller, typically loaded from
/// wherever past runs recorded which records belong together.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMap {
    /// `(direction, destination entity, source id) -> destination id`
    links: HashMap<(Direction, String, String), String>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `internal_entity#internal_id` and
    /// `integration_entity#integration_id` are the same record, in both
    /// directions.
    pub fn link(
        &mut self,
        internal_entity: &str,
        internal_id: &str,
        integration_entity: &str,
        integration_id: &str,
    ) -> &mut Self {
        self.links.insert(
            (
                Direction::InternalToIntegration,
                integration_entity.to_string(),
                internal_id.to_string(),
            ),
            integration_id.to_string(),
        );
        self.links.insert(
            (
                Direction::IntegrationToInternal,
                internal_entity.to_string(),
                integration_id.to_string(),
            ),
            internal_id.to_string(),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.links.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Correlator for CorrelationMap {
    fn correlate(
        &self,
        direction: Direction,
        entity: &str,
        change: &ObjectChange,
    ) -> Option<String> {
        let source_id = change.identifier.as_ref()?;
        self.links
            .get(&(direction, entity.to_string(), source_id.clone()))
            .cloned()
    }
}

/// Adapts a closure into a [`Correlator`].
pub struct FnCorrelator<F>(F);

/// Wraps `f` as a correlator, e.g. to look records up by email through an
/// API client the caller owns.
pub fn correlate_with<F>(f: F) -> FnCorrelator<F>
where
    F: Fn(Direction, &str, &ObjectChange) -> Option<String> + Send + Sync,
{
    FnCorrelator(f)
}

impl<F> Correlator for FnCorrelator<F>
where
    F: Fn(Direction, &str, &ObjectChange) -> Option<String> + Send + Sync,
{
    fn correlate(
        &self,
        direction: Direction,
        entity: &str,
        change: &ObjectChange,
    ) -> Option<String> {
        (self.0)(direction, entity, change)
    }
}
