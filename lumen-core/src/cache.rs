//! Response cache used by the request executor.
//!
//! Entries are never swept: staleness is checked lazily on read and a stale
//! entry stays in memory until the same key is written again. Memory therefore
//! grows with the number of distinct keys ever stored, which is fine for the
//! bounded key spaces of a sensor dashboard (fixed sensor and range combinations).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::transport::Payload;

/// One cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key the entry was stored under.
    pub key: String,
    /// Decoded response body.
    pub data: Payload,
    /// Instant after which the entry is stale; `None` when the TTL is too
    /// large to represent, in which case the entry never expires.
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// An entry is stale once `now` is strictly past its expiry.
    #[must_use]
    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Storage for cached responses, shared between calls of one executor.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the value under `key` if present and fresh.
    async fn get(&self, key: &str) -> Option<Payload>;
    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    async fn put(&self, key: String, value: Payload, ttl: Duration);
    /// Number of entries held, stale ones included.
    async fn len(&self) -> usize;
    /// Whether the store holds no entries at all.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-memory [`CacheStore`] on a hash map.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect an entry regardless of freshness.
    pub async fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Payload> {
        let guard = self.inner.lock().await;
        let entry = guard.get(key)?;
        if entry.is_stale_at(Instant::now()) {
            // left in place; the next successful write replaces it
            return None;
        }
        Some(entry.data.clone())
    }

    async fn put(&self, key: String, value: Payload, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        let mut guard = self.inner.lock().await;
        guard.insert(
            key.clone(),
            CacheEntry {
                key,
                data: value,
                expires_at,
            },
        );
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
