//! External rule/booking source consumed by the cache builder.

use lectern_core::types::UserId;
use lectern_engine::interval::TimeInterval;
use lectern_engine::rule::RecurrenceRule;
use lectern_engine::slots::BookedInterval;

/// The collaborator that owns tutors, rules, and bookings (a relational
/// store in production, a fixture in tests). The cache builder only reads
/// through this interface; errors are opaque and abort the rebuild.
#[expect(
    async_fn_in_trait,
    reason = "implementations are used generically within a task, never spawned as trait objects"
)]
pub trait AvailabilitySource {
    /// Ids of tutors eligible for caching (e.g., activated accounts).
    ///
    /// ## Errors
    /// Returns an error when the source is unreachable.
    async fn activated_tutors(&self) -> anyhow::Result<Vec<UserId>>;

    /// Rules owned by the given tutors that are valid anywhere in `window`.
    ///
    /// ## Errors
    /// Returns an error when the source is unreachable.
    async fn rules_in_window(
        &self,
        tutors: &[UserId],
        window: &TimeInterval,
    ) -> anyhow::Result<Vec<RecurrenceRule>>;

    /// Non-canceled bookings against the given tutors' rules that overlap
    /// `window`.
    ///
    /// ## Errors
    /// Returns an error when the source is unreachable.
    async fn bookings_in_window(
        &self,
        tutors: &[UserId],
        window: &TimeInterval,
    ) -> anyhow::Result<Vec<BookedInterval>>;
}
