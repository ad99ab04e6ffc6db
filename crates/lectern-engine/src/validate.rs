//! Candidate booking validation.

use chrono::{NaiveTime, TimeDelta};

use crate::interval::TimeInterval;
use crate::rule::RecurrenceRule;
use crate::slots::{BookedInterval, unpack};

/// ## Summary
/// Checks whether `candidate` fits inside the rule's free availability on
/// the candidate's day.
///
/// The rule is unpacked over `[start_of_day(candidate.start), +1 day)` net
/// of `booked`, and the candidate must be fully contained in one resulting
/// free interval; partial overlap is rejected.
///
/// This is an optimistic pre-check, not the consistency boundary: the
/// booking write that follows must run in a transaction that enforces the
/// overlap constraint authoritatively. Never errors: a rule with no
/// occurrence on the candidate's day, a malformed rule, or an empty free
/// list all answer `false`.
#[must_use]
pub fn can_book(
    rule: &RecurrenceRule,
    booked: &[BookedInterval],
    candidate: &TimeInterval,
) -> bool {
    let day_start = candidate.start.date_naive().and_time(NaiveTime::MIN).and_utc();
    let Ok(window) = TimeInterval::new(day_start, day_start + TimeDelta::days(1)) else {
        return false;
    };

    let free = unpack(std::slice::from_ref(rule), booked, &window);
    free.get(&rule.id)
        .is_some_and(|intervals| intervals.iter().any(|interval| interval.contains(candidate)))
}
