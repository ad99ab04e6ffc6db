//! File-backed [`AvailabilitySource`] for the daemon.
//!
//! Stands in for the platform's relational rule/booking store, which is
//! outside this core. The seed document is re-read on every fetch so each
//! rebuild sees a fresh snapshot.

use std::path::PathBuf;

use chrono::NaiveTime;
use lectern_core::types::UserId;
use lectern_engine::interval::TimeInterval;
use lectern_engine::rule::RecurrenceRule;
use lectern_engine::slots::BookedInterval;
use lectern_service::source::AvailabilitySource;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SeedDocument {
    tutors: Vec<UserId>,
    rules: Vec<RecurrenceRule>,
    bookings: Vec<BookedInterval>,
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> anyhow::Result<SeedDocument> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl AvailabilitySource for FileSource {
    async fn activated_tutors(&self) -> anyhow::Result<Vec<UserId>> {
        Ok(self.load().await?.tutors)
    }

    async fn rules_in_window(
        &self,
        tutors: &[UserId],
        window: &TimeInterval,
    ) -> anyhow::Result<Vec<RecurrenceRule>> {
        let seed = self.load().await?;
        Ok(seed
            .rules
            .into_iter()
            .filter(|rule| tutors.contains(&rule.owner_id))
            .filter(|rule| rule_valid_in_window(rule, window))
            .collect())
    }

    async fn bookings_in_window(
        &self,
        _tutors: &[UserId],
        window: &TimeInterval,
    ) -> anyhow::Result<Vec<BookedInterval>> {
        let seed = self.load().await?;
        Ok(seed
            .bookings
            .into_iter()
            .filter(|booking| {
                booking
                    .interval()
                    .is_some_and(|interval| interval.overlaps(window))
            })
            .collect())
    }
}

/// Whether any part of the rule's validity date range touches the window.
fn rule_valid_in_window(rule: &RecurrenceRule, window: &TimeInterval) -> bool {
    let starts_before_window_end =
        rule.valid_from.and_time(NaiveTime::MIN).and_utc() < window.end;
    let ends_after_window_start = rule
        .valid_to
        .is_none_or(|valid_to| valid_to.and_time(NaiveTime::MIN).and_utc() > window.start);
    starts_before_window_end && ends_after_window_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use lectern_engine::rule::{Repeat, TimeOfDay};

    fn rule(valid_from: NaiveDate, valid_to: Option<NaiveDate>) -> RecurrenceRule {
        RecurrenceRule {
            id: 1,
            owner_id: 10,
            weekday: None,
            time_of_day: TimeOfDay {
                start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            },
            valid_from,
            valid_to,
            repeat: Repeat::Daily,
        }
    }

    #[test]
    fn test_rule_validity_window_overlap() {
        let window = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 8, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 9, 9, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();

        // Open-ended rule that started before the window.
        assert!(rule_valid_in_window(&rule(date(7, 1), None), &window));
        // Rule entirely before the window.
        assert!(!rule_valid_in_window(
            &rule(date(7, 1), Some(date(8, 1))),
            &window
        ));
        // Rule starting after the window closes.
        assert!(!rule_valid_in_window(&rule(date(10, 1), None), &window));
        // Rule overlapping the tail of the window.
        assert!(rule_valid_in_window(&rule(date(9, 1), None), &window));
    }
}
