//! Live call/session membership tracking.
//!
//! Pure state tracking against the shared store, read-your-writes on a
//! single store instance. This is a best-effort presence approximation for
//! call routing, not a linearizable ledger: individual operations are
//! atomic, multi-step flows are not, and joined state carries a TTL as a
//! safety net against missed leave events.

use std::time::Duration;

use lectern_core::constants::{DEFAULT_JOINED_TTL_SECS, SESSION_KEY_PREFIX};
use lectern_core::types::{SessionId, UserId};
use lectern_store::SharedStore;

use crate::error::ServiceResult;

pub struct SessionMembershipStore<S> {
    store: S,
    joined_ttl: Duration,
}

impl<S: SharedStore> SessionMembershipStore<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            joined_ttl: Duration::from_secs(DEFAULT_JOINED_TTL_SECS),
        }
    }

    /// Bounds how long joined state survives a missed leave event. Explicit
    /// leave handling is the primary path; expiry is exceptional cleanup.
    #[must_use]
    pub fn with_joined_ttl(mut self, joined_ttl: Duration) -> Self {
        self.joined_ttl = joined_ttl;
        self
    }

    /// Marks the user eligible to join the session.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn add_member(&self, session_id: SessionId, user_id: UserId) -> ServiceResult<()> {
        let member = user_id.to_string();
        self.store
            .set_add(&eligible_key(session_id), &member)
            .await?;
        self.store
            .set_add(&user_sessions_key(user_id), &session_id.to_string())
            .await?;
        Ok(())
    }

    /// Revokes eligibility. An ineligible user cannot remain joined, so any
    /// live membership in the session is dropped as well.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn remove_member(&self, session_id: SessionId, user_id: UserId) -> ServiceResult<()> {
        let member = user_id.to_string();
        self.store
            .set_remove(&eligible_key(session_id), &member)
            .await?;
        self.store
            .set_remove(&user_sessions_key(user_id), &session_id.to_string())
            .await?;
        self.evict_joined(session_id, user_id).await
    }

    /// Records the user as currently joined to the session and points their
    /// joined-session pointer at it. Both writes carry the joined TTL.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn join_member(&self, session_id: SessionId, user_id: UserId) -> ServiceResult<()> {
        let key = joined_key(session_id);
        self.store.set_add(&key, &user_id.to_string()).await?;
        self.store.expire(&key, self.joined_ttl).await?;
        self.store
            .set_value(
                &pointer_key(user_id),
                &session_id.to_string(),
                Some(self.joined_ttl),
            )
            .await?;
        Ok(())
    }

    /// Removes the user from the session's joined set. The joined-session
    /// pointer is cleared only if it still points at this session, so a
    /// leave arriving after the user joined elsewhere does not clobber the
    /// newer state.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn leave_member(&self, session_id: SessionId, user_id: UserId) -> ServiceResult<()> {
        self.evict_joined(session_id, user_id).await
    }

    /// Looks up the session the user is joined to and leaves it.
    ///
    /// The lookup and the mutation are two store operations; a concurrent
    /// `join_member` for the same user in between can make the leave target
    /// a stale session. Accepted: the conditional pointer clear inside
    /// `leave_member` keeps the pointer consistent, and this tracker only
    /// approximates live presence.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn leave_member_by_user_id(
        &self,
        user_id: UserId,
    ) -> ServiceResult<Option<SessionId>> {
        let Some(session_id) = self.get_joined_session_of_user(user_id).await? else {
            return Ok(None);
        };
        self.leave_member(session_id, user_id).await?;
        Ok(Some(session_id))
    }

    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn is_eligible_member(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> ServiceResult<bool> {
        Ok(self
            .store
            .set_contains(&eligible_key(session_id), &user_id.to_string())
            .await?)
    }

    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn is_joined_member(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> ServiceResult<bool> {
        Ok(self
            .store
            .set_contains(&joined_key(session_id), &user_id.to_string())
            .await?)
    }

    /// All sessions the user is eligible for, ascending.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn get_sessions_of_user(&self, user_id: UserId) -> ServiceResult<Vec<SessionId>> {
        let members = self.store.set_members(&user_sessions_key(user_id)).await?;
        let mut sessions: Vec<SessionId> = members
            .iter()
            .filter_map(|raw| parse_id(raw, "session"))
            .collect();
        sessions.sort_unstable();
        Ok(sessions)
    }

    /// The single session the user is currently joined to, if any.
    ///
    /// ## Errors
    /// Returns an error when the store is unreachable.
    pub async fn get_joined_session_of_user(
        &self,
        user_id: UserId,
    ) -> ServiceResult<Option<SessionId>> {
        let Some(raw) = self.store.get(&pointer_key(user_id)).await? else {
            return Ok(None);
        };
        Ok(parse_id(&raw, "joined session"))
    }

    async fn evict_joined(&self, session_id: SessionId, user_id: UserId) -> ServiceResult<()> {
        self.store
            .set_remove(&joined_key(session_id), &user_id.to_string())
            .await?;
        self.store
            .clear_value_if_eq(&pointer_key(user_id), &session_id.to_string())
            .await?;
        Ok(())
    }
}

fn eligible_key(session_id: SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}:eligible:{session_id}")
}

fn joined_key(session_id: SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}:joined:{session_id}")
}

fn user_sessions_key(user_id: UserId) -> String {
    format!("{SESSION_KEY_PREFIX}:of-user:{user_id}")
}

fn pointer_key(user_id: UserId) -> String {
    format!("{SESSION_KEY_PREFIX}:joined-of-user:{user_id}")
}

fn parse_id(raw: &str, what: &'static str) -> Option<i64> {
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(raw, what, "unparseable id in shared store, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_store::MemoryStore;

    fn tracker() -> SessionMembershipStore<MemoryStore> {
        SessionMembershipStore::new(MemoryStore::new()).with_joined_ttl(Duration::from_secs(60))
    }

    #[test_log::test(tokio::test)]
    async fn test_join_and_leave_by_user_id() {
        let tracker = tracker();

        tracker.add_member(1, 5).await.unwrap();
        assert!(tracker.is_eligible_member(1, 5).await.unwrap());
        assert!(!tracker.is_joined_member(1, 5).await.unwrap());

        tracker.join_member(1, 5).await.unwrap();
        assert!(tracker.is_joined_member(1, 5).await.unwrap());
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), Some(1));

        let left = tracker.leave_member_by_user_id(5).await.unwrap();
        assert_eq!(left, Some(1));
        assert!(!tracker.is_joined_member(1, 5).await.unwrap());
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), None);

        // Eligibility survives leaving.
        assert!(tracker.is_eligible_member(1, 5).await.unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_leave_without_join_is_a_no_op() {
        let tracker = tracker();
        assert_eq!(tracker.leave_member_by_user_id(5).await.unwrap(), None);
        tracker.leave_member(1, 5).await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_remove_member_evicts_joined_user() {
        let tracker = tracker();
        tracker.add_member(1, 5).await.unwrap();
        tracker.join_member(1, 5).await.unwrap();

        tracker.remove_member(1, 5).await.unwrap();
        assert!(!tracker.is_eligible_member(1, 5).await.unwrap());
        assert!(!tracker.is_joined_member(1, 5).await.unwrap());
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), None);
        assert!(tracker.get_sessions_of_user(5).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_rejoining_elsewhere_moves_the_pointer() {
        let tracker = tracker();
        tracker.add_member(1, 5).await.unwrap();
        tracker.add_member(2, 5).await.unwrap();

        tracker.join_member(1, 5).await.unwrap();
        tracker.join_member(2, 5).await.unwrap();
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), Some(2));

        // A late leave for the old session must not clobber the pointer.
        tracker.leave_member(1, 5).await.unwrap();
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), Some(2));
        assert!(tracker.is_joined_member(2, 5).await.unwrap());

        tracker.leave_member(2, 5).await.unwrap();
        assert_eq!(tracker.get_joined_session_of_user(5).await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_sessions_of_user_lists_eligible_sessions() {
        let tracker = tracker();
        tracker.add_member(3, 5).await.unwrap();
        tracker.add_member(1, 5).await.unwrap();
        tracker.add_member(1, 6).await.unwrap();

        assert_eq!(tracker.get_sessions_of_user(5).await.unwrap(), vec![1, 3]);
        assert_eq!(tracker.get_sessions_of_user(6).await.unwrap(), vec![1]);

        tracker.remove_member(3, 5).await.unwrap();
        assert_eq!(tracker.get_sessions_of_user(5).await.unwrap(), vec![1]);
    }

    #[test_log::test(tokio::test)]
    async fn test_two_users_in_one_session() {
        let tracker = tracker();
        tracker.add_member(1, 5).await.unwrap();
        tracker.add_member(1, 6).await.unwrap();
        tracker.join_member(1, 5).await.unwrap();
        tracker.join_member(1, 6).await.unwrap();

        tracker.leave_member(1, 5).await.unwrap();
        assert!(!tracker.is_joined_member(1, 5).await.unwrap());
        assert!(tracker.is_joined_member(1, 6).await.unwrap());
    }
}
