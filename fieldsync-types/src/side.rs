//! The two sides of a sync and the directions between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two systems being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The system of record.
    Internal,
    /// The external system being synchronized with.
    Integration,
}

impl Side {
    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Internal => Self::Integration,
            Self::Integration => Self::Internal,
        }
    }

    /// Returns the direction in which changes from this side flow.
    #[must_use]
    pub const fn outgoing(self) -> Direction {
        match self {
            Self::Internal => Direction::InternalToIntegration,
            Self::Integration => Direction::IntegrationToInternal,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The direction a field name or value is translated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    InternalToIntegration,
    IntegrationToInternal,
}

impl Direction {
    /// The side names are translated from.
    #[must_use]
    pub const fn source(self) -> Side {
        match self {
            Self::InternalToIntegration => Side::Internal,
            Self::IntegrationToInternal => Side::Integration,
        }
    }

    /// The side names are translated to.
    #[must_use]
    pub const fn destination(self) -> Side {
        self.source().opposite()
    }

    /// Returns the reverse direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::InternalToIntegration => Self::IntegrationToInternal,
            Self::IntegrationToInternal => Self::InternalToIntegration,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source(), self.destination())
    }
}
