//! # WorkUnit and RunId.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Process-wide counter for run identifiers.
static RUN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifier of one distribution run.
///
/// Monotonically increasing within a process; never reused. Every result travelling
/// back to the coordinator carries the id of the run it was dispatched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Allocates the next run id.
    pub(crate) fn next() -> Self {
        RunId(RUN_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Wraps a raw id (e.g. decoded from the wire).
    pub fn from_raw(raw: u64) -> Self {
        RunId(raw)
    }

    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One contiguous sub-range of the overall computation.
///
/// Invariants (enforced by [`WorkUnit::new`]): `id >= 1`, `start >= 1`, `end >= start`.
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawUnit")]
pub struct WorkUnit {
    id: u32,
    start: u64,
    end: u64,
}

impl WorkUnit {
    /// Creates a unit, returning `None` if the range or id is invalid.
    pub fn new(id: u32, start: u64, end: u64) -> Option<Self> {
        if id == 0 || start == 0 || end < start {
            return None;
        }
        Some(Self { id, start, end })
    }

    /// 1-based unit id; also the canonical aggregation position.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// First integer of the range (inclusive).
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last integer of the range (inclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of integers covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`; a unit covers at least one integer.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {} [{}..={}]", self.id, self.start, self.end)
    }
}

#[derive(Deserialize)]
struct RawUnit {
    id: u32,
    start: u64,
    end: u64,
}

impl TryFrom<RawUnit> for WorkUnit {
    type Error = String;

    fn try_from(raw: RawUnit) -> Result<Self, Self::Error> {
        WorkUnit::new(raw.id, raw.start, raw.end).ok_or_else(|| {
            format!(
                "invalid work unit id={} range=[{}, {}]",
                raw.id, raw.start, raw.end
            )
        })
    }
}
