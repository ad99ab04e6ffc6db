//! Rolling multi-tutor availability cache.
//!
//! Each rebuild recomputes the full window from scratch for every activated
//! tutor and publishes the whole batch as one atomic replace, keyed by
//! window bounds plus tutor id. Readers never observe a half-updated
//! window; a failed rebuild leaves the previous entries in place, stale but
//! valid. Incremental patching is deliberately avoided (drift risk).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lectern_core::constants::AVAILABILITY_KEY_PREFIX;
use lectern_core::types::{RuleId, UserId};
use lectern_engine::interval::TimeInterval;
use lectern_engine::rule::RecurrenceRule;
use lectern_engine::slots::{self, BookedInterval};
use lectern_store::SharedStore;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::source::AvailabilitySource;

/// Default TTL on published entries; long enough to survive a couple of
/// missed rebuild cycles, short enough that superseded windows expire
/// without a sweeper.
const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 3);

/// One tutor's unpacked availability over a cache window.
///
/// Created and replaced wholesale on each rebuild cycle, never partially
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCacheEntry {
    pub tutor_id: UserId,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub free_intervals_by_rule: BTreeMap<RuleId, Vec<TimeInterval>>,
}

/// Orchestrates fetch, unpack, and publish for the tutor population.
///
/// Safe to run redundantly: the computation is deterministic given the same
/// source snapshot and the publish is a last-writer-wins atomic replace.
pub struct AvailabilityCacheBuilder<Src, St> {
    source: Src,
    store: St,
    entry_ttl: Duration,
}

impl<Src, St> AvailabilityCacheBuilder<Src, St>
where
    Src: AvailabilitySource,
    St: SharedStore,
{
    #[must_use]
    pub fn new(source: Src, store: St) -> Self {
        Self {
            source,
            store,
            entry_ttl: DEFAULT_ENTRY_TTL,
        }
    }

    #[must_use]
    pub fn with_entry_ttl(mut self, entry_ttl: Duration) -> Self {
        self.entry_ttl = entry_ttl;
        self
    }

    /// ## Summary
    /// Recomputes availability for every activated tutor over
    /// `[window_start, window_start + horizon_days)` and publishes the batch
    /// atomically. Returns the published entries.
    ///
    /// ## Errors
    /// Returns an error when the source or the store is unreachable; the
    /// previously published window is left untouched in that case.
    pub async fn rebuild(
        &self,
        window_start: DateTime<Utc>,
        horizon_days: u32,
    ) -> ServiceResult<Vec<AvailabilityCacheEntry>> {
        let window = TimeInterval::new(
            window_start,
            window_start + TimeDelta::days(i64::from(horizon_days)),
        )?;

        let tutors = self.source.activated_tutors().await?;
        let rules = self.source.rules_in_window(&tutors, &window).await?;
        let bookings = self.source.bookings_in_window(&tutors, &window).await?;

        tracing::info!(
            tutors = tutors.len(),
            rules = rules.len(),
            bookings = bookings.len(),
            window = %window,
            "rebuilding availability cache"
        );

        let rule_owners: HashMap<RuleId, UserId> =
            rules.iter().map(|rule| (rule.id, rule.owner_id)).collect();

        let mut rules_by_tutor: BTreeMap<UserId, Vec<RecurrenceRule>> = BTreeMap::new();
        for rule in rules {
            rules_by_tutor.entry(rule.owner_id).or_default().push(rule);
        }

        let mut bookings_by_tutor: BTreeMap<UserId, Vec<BookedInterval>> = BTreeMap::new();
        for booking in bookings {
            if let Some(owner) = rule_owners.get(&booking.rule_id) {
                bookings_by_tutor.entry(*owner).or_default().push(booking);
            } else {
                tracing::trace!(
                    rule = booking.rule_id,
                    "booking references a rule outside the window, skipping"
                );
            }
        }

        let entries: Vec<AvailabilityCacheEntry> = tutors
            .iter()
            .map(|&tutor_id| {
                let tutor_rules = rules_by_tutor.get(&tutor_id).map_or(&[][..], Vec::as_slice);
                let tutor_bookings = bookings_by_tutor
                    .get(&tutor_id)
                    .map_or(&[][..], Vec::as_slice);

                AvailabilityCacheEntry {
                    tutor_id,
                    window_start: window.start,
                    window_end: window.end,
                    free_intervals_by_rule: slots::unpack(tutor_rules, tutor_bookings, &window),
                }
            })
            .collect();

        self.publish(&entries).await?;

        tracing::info!(entries = entries.len(), "availability cache published");
        Ok(entries)
    }

    /// Reads one tutor's published entry for a window, if present.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable or the stored entry
    /// does not deserialize.
    pub async fn read(
        &self,
        tutor_id: UserId,
        window: &TimeInterval,
    ) -> ServiceResult<Option<AvailabilityCacheEntry>> {
        let key = entry_key(tutor_id, window);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn publish(&self, entries: &[AvailabilityCacheEntry]) -> ServiceResult<()> {
        let mut batch = Vec::with_capacity(entries.len());
        for entry in entries {
            let window = TimeInterval::new(entry.window_start, entry.window_end)?;
            batch.push((
                entry_key(entry.tutor_id, &window),
                serde_json::to_string(entry)?,
            ));
        }
        self.store.set_many(&batch, Some(self.entry_ttl)).await?;
        Ok(())
    }
}

/// Store key for one tutor's entry in one window.
#[must_use]
pub fn entry_key(tutor_id: UserId, window: &TimeInterval) -> String {
    format!(
        "{AVAILABILITY_KEY_PREFIX}:{}:{}:{tutor_id}",
        window.start.timestamp(),
        window.end.timestamp()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use lectern_engine::rule::{Repeat, TimeOfDay};
    use lectern_store::MemoryStore;

    #[derive(Default)]
    struct StaticSource {
        tutors: Vec<UserId>,
        rules: Vec<RecurrenceRule>,
        bookings: Vec<BookedInterval>,
    }

    impl AvailabilitySource for StaticSource {
        async fn activated_tutors(&self) -> anyhow::Result<Vec<UserId>> {
            Ok(self.tutors.clone())
        }

        async fn rules_in_window(
            &self,
            _tutors: &[UserId],
            _window: &TimeInterval,
        ) -> anyhow::Result<Vec<RecurrenceRule>> {
            Ok(self.rules.clone())
        }

        async fn bookings_in_window(
            &self,
            _tutors: &[UserId],
            _window: &TimeInterval,
        ) -> anyhow::Result<Vec<BookedInterval>> {
            Ok(self.bookings.clone())
        }
    }

    struct UnreachableSource;

    impl AvailabilitySource for UnreachableSource {
        async fn activated_tutors(&self) -> anyhow::Result<Vec<UserId>> {
            Err(anyhow!("rule source is unreachable"))
        }

        async fn rules_in_window(
            &self,
            _tutors: &[UserId],
            _window: &TimeInterval,
        ) -> anyhow::Result<Vec<RecurrenceRule>> {
            Err(anyhow!("rule source is unreachable"))
        }

        async fn bookings_in_window(
            &self,
            _tutors: &[UserId],
            _window: &TimeInterval,
        ) -> anyhow::Result<Vec<BookedInterval>> {
            Err(anyhow!("rule source is unreachable"))
        }
    }

    fn daily_rule(id: RuleId, owner_id: UserId) -> RecurrenceRule {
        RecurrenceRule {
            id,
            owner_id,
            weekday: None,
            time_of_day: TimeOfDay {
                start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            },
            valid_from: NaiveDate::from_ymd_opt(2024, 8, 10).unwrap(),
            valid_to: None,
            repeat: Repeat::Daily,
        }
    }

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 10, 0, 0, 0).unwrap()
    }

    fn window(days: u32) -> TimeInterval {
        TimeInterval::new(
            window_start(),
            window_start() + TimeDelta::days(i64::from(days)),
        )
        .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_rebuild_publishes_one_entry_per_tutor() {
        let source = StaticSource {
            tutors: vec![10, 20],
            rules: vec![daily_rule(1, 10), daily_rule(2, 20)],
            bookings: vec![BookedInterval {
                rule_id: 1,
                start: Utc.with_ymd_and_hms(2024, 8, 10, 10, 30, 0).unwrap(),
                duration_minutes: 30,
            }],
        };
        let builder = AvailabilityCacheBuilder::new(source, MemoryStore::new())
            .with_entry_ttl(Duration::from_secs(3600));

        let entries = builder.rebuild(window_start(), 2).await.unwrap();
        assert_eq!(entries.len(), 2);

        let published = builder.read(10, &window(2)).await.unwrap().unwrap();
        assert_eq!(published, entries[0]);
        // Rule 1 has a booking carved out of day one.
        assert_eq!(published.free_intervals_by_rule.get(&1).unwrap().len(), 3);

        let untouched = builder.read(20, &window(2)).await.unwrap().unwrap();
        assert_eq!(untouched.free_intervals_by_rule.get(&2).unwrap().len(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_tutor_without_rules_gets_empty_entry() {
        let source = StaticSource {
            tutors: vec![10],
            ..StaticSource::default()
        };
        let builder = AvailabilityCacheBuilder::new(source, MemoryStore::new());

        builder.rebuild(window_start(), 2).await.unwrap();
        let entry = builder.read(10, &window(2)).await.unwrap().unwrap();
        assert!(entry.free_intervals_by_rule.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_rebuild_keeps_previous_entries() {
        let store = MemoryStore::new();
        let builder = AvailabilityCacheBuilder::new(
            StaticSource {
                tutors: vec![10],
                rules: vec![daily_rule(1, 10)],
                bookings: vec![],
            },
            store.clone(),
        );
        builder.rebuild(window_start(), 2).await.unwrap();

        let failing = AvailabilityCacheBuilder::new(UnreachableSource, store);
        assert!(failing.rebuild(window_start(), 2).await.is_err());

        // Stale-but-valid beats empty: the first publish is still readable.
        let entry = failing.read(10, &window(2)).await.unwrap().unwrap();
        assert_eq!(entry.tutor_id, 10);
    }

    #[test_log::test(tokio::test)]
    async fn test_rebuild_replaces_entries_wholesale() {
        let store = MemoryStore::new();
        let first = AvailabilityCacheBuilder::new(
            StaticSource {
                tutors: vec![10],
                rules: vec![daily_rule(1, 10)],
                bookings: vec![],
            },
            store.clone(),
        );
        first.rebuild(window_start(), 2).await.unwrap();

        // A booking landed since the last cycle.
        let second = AvailabilityCacheBuilder::new(
            StaticSource {
                tutors: vec![10],
                rules: vec![daily_rule(1, 10)],
                bookings: vec![BookedInterval {
                    rule_id: 1,
                    start: Utc.with_ymd_and_hms(2024, 8, 10, 10, 0, 0).unwrap(),
                    duration_minutes: 60,
                }],
            },
            store,
        );
        second.rebuild(window_start(), 2).await.unwrap();

        let entry = second.read(10, &window(2)).await.unwrap().unwrap();
        let day_one_free = &entry.free_intervals_by_rule.get(&1).unwrap()[0];
        assert_eq!(
            day_one_free.start,
            Utc.with_ymd_and_hms(2024, 8, 10, 11, 0, 0).unwrap()
        );
    }
}
