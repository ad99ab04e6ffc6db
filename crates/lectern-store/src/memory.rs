//! In-memory [`SharedStore`] fake for tests and local development.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::SharedStore;
use crate::error::StoreResult;

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// Process-local store with the same read-your-writes behavior as the real
/// one. TTLs are accepted and ignored: the fake never expires anything, so
/// tests exercise explicit cleanup paths rather than timing.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.values.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: &str, _ttl: Option<Duration>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        _ttl: Option<Duration>,
    ) -> StoreResult<()> {
        // Holding the lock across the whole batch is what makes the replace
        // atomic for concurrent readers of this fake.
        let mut inner = self.inner.lock().await;
        for (key, value) in entries {
            inner.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.values.remove(key);
        inner.sets.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(set) = inner.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sets
            .get(key)
            .is_some_and(|set| set.contains(member)))
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sets
            .get(key)
            .map_or_else(Vec::new, |set| set.iter().cloned().collect()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
        Ok(())
    }

    async fn clear_value_if_eq(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        if inner.values.get(key).is_some_and(|value| value == expected) {
            inner.values.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_value_roundtrip_and_delete() {
        let store = MemoryStore::new();
        store.set_value("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_set_operations() {
        let store = MemoryStore::new();
        store.set_add("s", "5").await.unwrap();
        store.set_add("s", "7").await.unwrap();
        store.set_add("s", "5").await.unwrap();

        assert!(store.set_contains("s", "5").await.unwrap());
        assert!(!store.set_contains("s", "9").await.unwrap());
        assert_eq!(store.set_members("s").await.unwrap(), vec!["5", "7"]);

        store.set_remove("s", "5").await.unwrap();
        assert!(!store.set_contains("s", "5").await.unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_clear_value_if_eq_requires_match() {
        let store = MemoryStore::new();
        store.set_value("pointer", "1", None).await.unwrap();

        assert!(!store.clear_value_if_eq("pointer", "2").await.unwrap());
        assert_eq!(store.get("pointer").await.unwrap().as_deref(), Some("1"));

        assert!(store.clear_value_if_eq("pointer", "1").await.unwrap());
        assert_eq!(store.get("pointer").await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_set_many_overwrites_batch() {
        let store = MemoryStore::new();
        store
            .set_many(
                &[("a".into(), "1".into()), ("b".into(), "2".into())],
                None,
            )
            .await
            .unwrap();
        store
            .set_many(&[("a".into(), "3".into())], None)
            .await
            .unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }
}
