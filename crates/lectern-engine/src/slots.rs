//! Free-interval unpacking: raw occurrences minus existing bookings.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use lectern_core::types::RuleId;
use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;
use crate::rule::RecurrenceRule;

/// A lesson or interview already occupying part of a rule's availability.
///
/// Read-only from the engine's perspective; produced by the booking store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedInterval {
    pub rule_id: RuleId,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl BookedInterval {
    /// The concrete interval this booking occupies, or `None` for a
    /// non-positive duration.
    #[must_use]
    pub fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::new(self.start, self.start + TimeDelta::minutes(self.duration_minutes)).ok()
    }
}

/// ## Summary
/// Unpacks a set of rules into free intervals within `window`, net of the
/// given bookings.
///
/// Per rule: expand raw occurrences, subtract the bookings that belong to
/// that rule, discard zero-length remainders, and sort ascending by start.
/// The result maps each rule id to its ordered, disjoint free intervals.
///
/// Pure and stateless: identical inputs always produce identical,
/// order-stable output, so results are safe to memoize or publish verbatim.
#[must_use]
pub fn unpack(
    rules: &[RecurrenceRule],
    booked: &[BookedInterval],
    window: &TimeInterval,
) -> BTreeMap<RuleId, Vec<TimeInterval>> {
    let mut free_by_rule = BTreeMap::new();

    for rule in rules {
        let busy: Vec<TimeInterval> = booked
            .iter()
            .filter(|booking| booking.rule_id == rule.id)
            .filter_map(BookedInterval::interval)
            .collect();

        let mut free: Vec<TimeInterval> = rule
            .expand(window)
            .iter()
            .flat_map(|occurrence| occurrence.subtract_all(&busy))
            .collect();
        free.sort_by_key(|interval| (interval.start, interval.end));

        free_by_rule.insert(rule.id, free);
    }

    free_by_rule
}
