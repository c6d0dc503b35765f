// src/store.rs
//! Key→string store with TTL plus atomic create-if-absent, shared by the
//! answer cache, user state and inbound dedup markers. The trait is the seam
//! for an external shared store; the shipped backend is a process-local map
//! with identical method signatures. All mutations are single-key and atomic
//! under the inner lock; no multi-key transactions exist anywhere.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value if present and not expired.
    async fn get(&self, key: &str) -> Option<String>;
    /// Upserts the value with a fresh TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration);
    /// Atomic create-if-absent. Returns true when the key was created,
    /// false when a live entry already existed.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local TTL map. Not coherent across multiple process instances;
/// accepted degradation when no shared store is deployed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry. Scheduled on an interval at boot; safe to
    /// call from tests directly.
    pub fn prune(&self) {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("store mutex poisoned");
        map.retain(|_, entry| entry.live(now));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("store mutex poisoned");
        match map.get(key) {
            Some(entry) if entry.live(now) => Some(entry.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        let mut map = self.inner.lock().expect("store mutex poisoned");
        map.insert(key.to_string(), entry);
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("store mutex poisoned");
        if map.get(key).is_some_and(|entry| entry.live(now)) {
            return false;
        }
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_roundtrip_within_ttl() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::from_secs(60)).await;
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn create_if_absent_is_single_winner() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "1", Duration::from_secs(60)).await);
        assert!(!store.set_if_absent("k", "1", Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn create_if_absent_wins_again_after_expiry() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "1", Duration::from_millis(10)).await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.set_if_absent("k", "1", Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn prune_drops_only_expired_entries() {
        let store = MemoryStore::new();
        store.set("old", "v", Duration::from_millis(10)).await;
        store.set("new", "v", Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.prune();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new").await.as_deref(), Some("v"));
    }
}
