//! Half-open UTC interval primitive.
//!
//! All scheduling math in the engine is expressed over `[start, end)`
//! intervals with minute-level practical resolution.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A half-open interval `[start, end)` of absolute UTC time.
///
/// Invariant: `start < end`. The constructor enforces it; every interval
/// produced by the engine satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// ## Summary
    /// Creates a new interval after checking the `start < end` invariant.
    ///
    /// ## Errors
    /// Returns [`EngineError::EmptyInterval`] when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<Self> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(EngineError::EmptyInterval { start, end })
        }
    }

    /// Length of the interval.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Whether the instant falls inside `[start, end)`.
    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether `other` is fully contained in this interval.
    ///
    /// Containment is inclusive on both edges of the half-open span: an
    /// interval contains itself.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether the two intervals share any instant.
    ///
    /// Half-open semantics: touching intervals (`a.end == b.start`) do not
    /// overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The overlapping portion of the two intervals, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }

    /// ## Summary
    /// Subtracts the given busy intervals from this one, returning the
    /// maximal disjoint sub-intervals that remain free, in ascending order.
    ///
    /// Busy intervals are clipped to this interval first, so subtraction is
    /// exact: a busy interval touching a boundary consumes only the
    /// overlapping portion. Zero-length remainders are discarded.
    #[must_use]
    pub fn subtract_all(&self, busy: &[Self]) -> Vec<Self> {
        let mut blocks: Vec<Self> = busy
            .iter()
            .filter_map(|interval| self.intersect(interval))
            .collect();

        if blocks.is_empty() {
            return vec![*self];
        }

        blocks.sort_by_key(|block| (block.start, block.end));

        // Walk a cursor over the merged busy blocks; the gaps are free.
        let mut free = Vec::new();
        let mut cursor = self.start;

        for block in &blocks {
            if cursor < block.start {
                free.push(Self {
                    start: cursor,
                    end: block.start,
                });
            }
            cursor = cursor.max(block.end);
        }

        if cursor < self.end {
            free.push(Self {
                start: cursor,
                end: self.end,
            });
        }

        free
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
