//! Recurrence rules and occurrence expansion.
//!
//! A [`RecurrenceRule`] is a tutor's availability declaration: a wall-clock
//! time span repeated daily, weekly, monthly, or not at all, bounded by a
//! validity date range. Expansion turns one rule into the concrete UTC
//! occurrence intervals that fall inside a query window.
//!
//! Repetition math is delegated to the `rrule` crate: the rule is rendered
//! as RRULE text, parsed, and built against a UTC DTSTART. Malformed rules
//! never fail expansion; they degrade to zero occurrences with a warning.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta, Weekday};
use lectern_core::types::{RuleId, UserId};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};
use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;

/// Safety cap on the number of occurrences generated per expansion.
const MAX_OCCURRENCES: u16 = 1000;

/// How often a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Fires once, on `valid_from`.
    NoRepeat,
    Daily,
    EveryWeek,
    EveryMonth,
}

/// A wall-clock time span with no date component.
///
/// Malformed spans (`start >= end`) are representable; expansion treats them
/// as producing no availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeOfDay {
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }
}

/// A recurring availability declaration owned by a tutor or interviewer.
///
/// Immutable once referenced by an occurrence snapshot; edits only affect
/// future expansion calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub owner_id: UserId,
    /// Day of week the rule fires on. `None` is "any day" and is the normal
    /// value for [`Repeat::Daily`] and [`Repeat::NoRepeat`] rules.
    pub weekday: Option<Weekday>,
    pub time_of_day: TimeOfDay,
    pub valid_from: NaiveDate,
    /// Exclusive upper validity bound; `None` means unbounded.
    pub valid_to: Option<NaiveDate>,
    pub repeat: Repeat,
}

impl RecurrenceRule {
    /// ## Summary
    /// Expands the rule into raw occurrence intervals within `window`, in
    /// ascending start order, clipped to the window. Occurrences are not yet
    /// net of bookings; see [`crate::slots::unpack`] for that.
    ///
    /// Malformed rules (inverted time of day, `valid_from` after `valid_to`,
    /// unbuildable recurrence) produce zero occurrences and a warning rather
    /// than an error.
    #[must_use]
    pub fn expand(&self, window: &TimeInterval) -> Vec<TimeInterval> {
        if !self.time_of_day.is_well_formed() {
            tracing::warn!(
                rule = self.id,
                "rule has a zero-length or inverted time of day, treating as no availability"
            );
            return Vec::new();
        }

        if let Some(valid_to) = self.valid_to {
            if valid_to < self.valid_from {
                tracing::warn!(
                    rule = self.id,
                    %valid_to,
                    valid_from = %self.valid_from,
                    "rule validity range is inverted, treating as no availability"
                );
                return Vec::new();
            }
        }

        match self.repeat {
            Repeat::NoRepeat => self
                .occurrence_on(self.valid_from)
                .and_then(|occurrence| occurrence.intersect(window))
                .into_iter()
                .collect(),
            Repeat::Daily | Repeat::EveryWeek | Repeat::EveryMonth => {
                self.expand_repeating(window)
            }
        }
    }

    fn expand_repeating(&self, window: &TimeInterval) -> Vec<TimeInterval> {
        let Some(set) = self.recurrence_set() else {
            return Vec::new();
        };

        // Start the query a day early so an occurrence straddling the window
        // start still shows up; clipping below trims it back.
        let after = (window.start - TimeDelta::days(1)).with_timezone(&Tz::UTC);
        let before = window.end.with_timezone(&Tz::UTC);

        let result = set.after(after).before(before).all(MAX_OCCURRENCES);
        if result.limited {
            tracing::warn!(rule = self.id, cap = MAX_OCCURRENCES, "occurrence expansion hit the safety cap");
        }

        result
            .dates
            .into_iter()
            .filter_map(|date| self.occurrence_on(date.date_naive()))
            .filter_map(|occurrence| occurrence.intersect(window))
            .collect()
    }

    /// Builds the validated recurrence set, or `None` when the rule cannot
    /// fire at all (empty validity range, unparseable RRULE).
    fn recurrence_set(&self) -> Option<RRuleSet> {
        let mut parts: Vec<String> = Vec::new();

        match self.repeat {
            Repeat::Daily => {
                parts.push("FREQ=DAILY".to_owned());
                if self.weekday.is_some() {
                    // Ambiguous data entry: daily repetition wins over the
                    // explicit weekday.
                    tracing::warn!(
                        rule = self.id,
                        "daily rule carries an explicit weekday, ignoring it"
                    );
                }
            }
            Repeat::EveryWeek => {
                let weekday = self.weekday.unwrap_or_else(|| self.valid_from.weekday());
                parts.push("FREQ=WEEKLY".to_owned());
                parts.push(format!("BYDAY={}", byday_code(weekday)));
            }
            Repeat::EveryMonth => {
                parts.push("FREQ=MONTHLY".to_owned());
                parts.push(format!("BYMONTHDAY={}", self.valid_from.day()));
            }
            Repeat::NoRepeat => return None,
        }

        // `valid_to` is exclusive while RRULE's UNTIL is inclusive, so the
        // last day a bounded rule may fire on is `valid_to - 1`.
        if let Some(valid_to) = self.valid_to {
            let last_day = valid_to.pred_opt()?;
            if last_day < self.valid_from {
                tracing::trace!(rule = self.id, "rule validity range is empty");
                return None;
            }
            parts.push(format!("UNTIL={}T235959Z", last_day.format("%Y%m%d")));
        }

        let text = parts.join(";");
        let dt_start = self
            .valid_from
            .and_time(self.time_of_day.start)
            .and_utc()
            .with_timezone(&Tz::UTC);

        let rrule = match text.parse::<RRule<Unvalidated>>() {
            Ok(rrule) => rrule,
            Err(error) => {
                tracing::warn!(rule = self.id, %error, rrule = %text, "failed to parse recurrence rule, treating as no availability");
                return None;
            }
        };

        match rrule.build(dt_start) {
            Ok(set) => Some(set),
            Err(error) => {
                tracing::warn!(rule = self.id, %error, rrule = %text, "failed to build recurrence set, treating as no availability");
                None
            }
        }
    }

    /// The concrete UTC interval this rule occupies on `date`, if the time
    /// of day produces a non-empty span.
    fn occurrence_on(&self, date: NaiveDate) -> Option<TimeInterval> {
        TimeInterval::new(
            date.and_time(self.time_of_day.start).and_utc(),
            date.and_time(self.time_of_day.end).and_utc(),
        )
        .ok()
    }
}

const fn byday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
