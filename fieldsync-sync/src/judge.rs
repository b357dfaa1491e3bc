//! Conflict resolution: picking the winning value for one field.
//!
//! The judge sees at most one candidate per side for a single mapped field
//! of a single logical object and returns a [`Verdict`]. It works per field,
//! so two fields of the same object may be won by different sides in the
//! same run.
//!
//! Judges must be deterministic: the verdict depends only on the candidates
//! passed in, never on the time of the call.

use chrono::{DateTime, Utc};
use fieldsync_types::{NormalizedValue, Side};
use std::cmp::Ordering;

/// One side's value for a field, with the timestamps known for it.
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidate<'a> {
    pub value: &'a NormalizedValue,
    /// Field-level change time, if the side reports one.
    pub changed_at: Option<DateTime<Utc>>,
    /// Change time of the object the field belongs to.
    pub object_changed_at: Option<DateTime<Utc>>,
}

impl<'a> FieldCandidate<'a> {
    pub fn new(value: &'a NormalizedValue) -> Self {
        Self {
            value,
            changed_at: None,
            object_changed_at: None,
        }
    }

    #[must_use]
    pub fn changed_at(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.changed_at = ts;
        self
    }

    #[must_use]
    pub fn object_changed_at(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.object_changed_at = ts;
        self
    }
}

/// Which side's value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    Internal,
    Integration,
    /// Neither side is overwritten.
    NoChange,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Internal => Self::Internal,
            Side::Integration => Self::Integration,
        }
    }
}

/// The judge's decision for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub winner: Winner,
    /// The winning value; `None` for `NoChange`.
    pub value: Option<NormalizedValue>,
    /// Both sides changed the field to different values and no winner could
    /// be determined.
    pub unresolved: bool,
}

impl Verdict {
    /// `side` wins with `value`.
    pub fn won_by(side: Side, value: NormalizedValue) -> Self {
        Self {
            winner: side.into(),
            value: Some(value),
            unresolved: false,
        }
    }

    /// Nothing to apply.
    pub fn no_change() -> Self {
        Self {
            winner: Winner::NoChange,
            value: None,
            unresolved: false,
        }
    }

    /// A conflict the judge refuses to settle.
    pub fn unresolved() -> Self {
        Self {
            unresolved: true,
            ..Self::no_change()
        }
    }

    /// The winning side, if any.
    pub fn winning_side(&self) -> Option<Side> {
        match self.winner {
            Winner::Internal => Some(Side::Internal),
            Winner::Integration => Some(Side::Integration),
            Winner::NoChange => None,
        }
    }
}

/// Pluggable conflict-resolution strategy.
pub trait SyncJudge: Send + Sync {
    /// Decides which side's value wins for one field.
    fn decide(
        &self,
        internal: Option<FieldCandidate<'_>>,
        integration: Option<FieldCandidate<'_>>,
    ) -> Verdict;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Shared handling of the cases every judge agrees on. Returns `None` when
/// both sides changed the field to different values.
fn settle_uncontested(
    internal: Option<FieldCandidate<'_>>,
    integration: Option<FieldCandidate<'_>>,
) -> Option<Verdict> {
    match (internal, integration) {
        (None, None) => Some(Verdict::no_change()),
        (Some(i), None) => Some(Verdict::won_by(Side::Internal, i.value.clone())),
        (None, Some(e)) => Some(Verdict::won_by(Side::Integration, e.value.clone())),
        (Some(i), Some(e)) if i.value.agrees_with(e.value) => Some(Verdict::no_change()),
        (Some(_), Some(_)) => None,
    }
}

/// The default judge: the most recent change wins.
///
/// - Only one side changed the field: that side wins.
/// - Both sides hold the same value: no change.
/// - Both changed it: the later field-level timestamp wins. When the field
///   timestamps are equal or either is missing, the object-level timestamps
///   decide. When those are also equal or missing, the verdict is
///   `NoChange` with `unresolved` set; neither side is overwritten.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestChangeJudge;

impl LatestChangeJudge {
    fn compare(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        }
    }
}

impl SyncJudge for LatestChangeJudge {
    fn decide(
        &self,
        internal: Option<FieldCandidate<'_>>,
        integration: Option<FieldCandidate<'_>>,
    ) -> Verdict {
        if let Some(verdict) = settle_uncontested(internal, integration) {
            return verdict;
        }
        let (Some(i), Some(e)) = (internal, integration) else {
            return Verdict::no_change();
        };

        let ordering = Self::compare(i.changed_at, e.changed_at)
            .then_with(|| Self::compare(i.object_changed_at, e.object_changed_at));

        match ordering {
            Ordering::Greater => Verdict::won_by(Side::Internal, i.value.clone()),
            Ordering::Less => Verdict::won_by(Side::Integration, e.value.clone()),
            Ordering::Equal => Verdict::unresolved(),
        }
    }

    fn name(&self) -> &'static str {
        "latest_change"
    }
}

/// A judge that settles every two-sided conflict in favour of one side.
///
/// One-sided changes still pass through from whichever side made them.
#[derive(Debug, Clone, Copy)]
pub struct AuthoritativeSideJudge {
    authority: Side,
}

impl AuthoritativeSideJudge {
    pub fn new(authority: Side) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> Side {
        self.authority
    }
}

impl SyncJudge for AuthoritativeSideJudge {
    fn decide(
        &self,
        internal: Option<FieldCandidate<'_>>,
        integration: Option<FieldCandidate<'_>>,
    ) -> Verdict {
        if let Some(verdict) = settle_uncontested(internal, integration) {
            return verdict;
        }
        let winning = match self.authority {
            Side::Internal => internal,
            Side::Integration => integration,
        };
        match winning {
            Some(candidate) => Verdict::won_by(self.authority, candidate.value.clone()),
            None => Verdict::no_change(),
        }
    }

    fn name(&self) -> &'static str {
        "authoritative_side"
    }
}
