//! Type-safe region identifier.
//!
//! [`RegionId`] is a newtype wrapper around the numeric area identifier a
//! chat session is scoped to, providing type safety so that region
//! identifiers cannot be confused with other integers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a chat region.
///
/// Wraps the numeric area identifier assigned by the surrounding system.
/// A session is bound to exactly one region for its whole lifetime; the
/// region id appears in the transport endpoint query string and in the
/// history collaborator's request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(u64);

impl RegionId {
    /// Creates a `RegionId` from a raw numeric identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the inner numeric identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RegionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RegionId> for u64 {
    fn from(id: RegionId) -> Self {
        id.0
    }
}
