use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex registry (spec.md §4.2). Keys are plain strings by
/// convention: `credit:<character_id>`, `combat:<sector_id>`,
/// `port:<sector_id>`, `knowledge:<character_id>`.
#[derive(Clone, Default)]
pub struct LockManager {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Released on drop; holds the underlying owned mutex guard so callers
/// never have to manage unlocking themselves.
pub struct LockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Waits until `key` is free, returns a scoped guard that releases on
    /// drop. No timeout is enforced at this layer (spec.md §4.2).
    pub async fn acquire(&self, key: &str) -> LockGuard {
        let mutex = self.entry(key);
        let guard = mutex.lock_owned().await;
        LockGuard { _guards: vec![guard] }
    }

    /// Acquires a set of keys in canonical (lexicographic) sort order to
    /// prevent deadlock, e.g. a credit transfer between two characters
    /// (spec.md §4.2, §5 "Deadlock avoidance").
    pub async fn with_keys(&self, keys: &[&str]) -> LockGuard {
        let mut sorted: Vec<&str> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            let mutex = self.entry(key);
            guards.push(mutex.lock_owned().await);
        }
        LockGuard { _guards: guards }
    }

    pub fn credit_key(character_id: &str) -> String {
        format!("credit:{character_id}")
    }

    pub fn combat_key(sector_id: i64) -> String {
        format!("combat:{sector_id}")
    }

    pub fn port_key(sector_id: i64) -> String {
        format!("port:{sector_id}")
    }

    pub fn knowledge_key(character_id: &str) -> String {
        format!("knowledge:{character_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_serializes_same_key() {
        let locks = LockManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let locks2 = locks.clone();
        let order2 = order.clone();
        let first = tokio::spawn(async move {
            let _guard = locks2.acquire("combat:1").await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            order2.lock().await.push(1);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;

        let locks3 = locks.clone();
        let order3 = order.clone();
        let second = tokio::spawn(async move {
            let _guard = locks3.acquire("combat:1").await;
            order3.lock().await.push(2);
        });

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*order.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn with_keys_sorts_to_avoid_deadlock() {
        let locks = LockManager::new();
        let a = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.with_keys(&["credit:y", "credit:x"]).await })
        };
        let b = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.with_keys(&["credit:x", "credit:y"]).await })
        };
        let (_g1, _g2) = tokio::join!(a, b);
        // If both ordered consistently there is no deadlock; reaching this
        // line within the test timeout proves it.
    }
}
