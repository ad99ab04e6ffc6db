//! Shared-store capability layer for the Lectern scheduling core.
//!
//! The availability cache and the session membership tracker are
//! process-wide shared state by nature: multiple server instances must
//! observe the same view. Rather than reaching for a global, both components
//! take a [`SharedStore`] as an explicit dependency. Production uses
//! [`remote::RedisStore`]; tests use [`memory::MemoryStore`].

use std::time::Duration;

pub mod error;
pub mod memory;
pub mod remote;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use remote::RedisStore;

/// Capability interface over a shared set-capable store with optional
/// per-key expiry.
///
/// Each operation is individually atomic; multi-key flows composed from
/// them are not, except [`SharedStore::set_many`] which must replace its
/// whole batch atomically, and [`SharedStore::clear_value_if_eq`] which
/// must compare and delete as one step.
#[expect(
    async_fn_in_trait,
    reason = "implementations are used generically within a task, never spawned as trait objects"
)]
pub trait SharedStore {
    /// Reads a plain value.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a plain value, with an optional TTL.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Writes a batch of values as a single atomic replace. A concurrent
    /// reader observes either none or all of the batch.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_many(&self, entries: &[(String, String)], ttl: Option<Duration>)
    -> StoreResult<()>;

    /// Deletes a key (plain value or set).
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Adds a member to the set at `key`, creating the set if absent.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_add(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Removes a member from the set at `key`.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<()>;

    /// O(1) membership check on the set at `key`.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// All members of the set at `key`. Ordering is unspecified.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Applies a TTL to an existing key.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Deletes `key` only if its current value equals `expected`, as a
    /// single atomic step. Returns whether the key was deleted.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    async fn clear_value_if_eq(&self, key: &str, expected: &str) -> StoreResult<bool>;
}
