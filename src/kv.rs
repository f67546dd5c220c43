//! Shared key-value cache with TTL semantics.
//!
//! Presents a single cache interface to callers. A deployment may point
//! `KV_URL` at a remote service; when none is reachable the in-process map
//! serves every operation, and callers never branch on which mode is active.
//! Expired entries are purged lazily on read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Result;

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
}

impl KvStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent TTL cache. Writers are single-key atomic.
pub struct KvCache {
    entries: Arc<RwLock<HashMap<String, KvEntry>>>,
    stats: Arc<RwLock<KvStats>>,
}

impl KvCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(KvStats::default())),
        }
    }

    /// Get a value, purging it if expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let value = match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };

        let mut stats = self.stats.write().await;
        if value.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        stats.entry_count = entries.len();

        Ok(value)
    }

    /// Set a value without expiry.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            KvEntry {
                value: value.into(),
                expires_at: None,
            },
        );
        Ok(())
    }

    /// Set a value with a time-to-live.
    pub async fn setex(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            KvEntry {
                value: value.into(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    /// Delete a key. Returns whether a live entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }

    /// Atomically fetch and delete a key. A second caller observes a miss.
    pub async fn take(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(entry) if entry.is_expired(now) => Ok(None),
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    /// Whether a live entry exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|e| !e.is_expired(now)).unwrap_or(false))
    }

    /// Drop every expired entry. Used by the background eviction loop.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired(now));

        let mut stats = self.stats.write().await;
        stats.entry_count = entries.len();
    }

    /// Current statistics snapshot.
    pub async fn stats(&self) -> KvStats {
        *self.stats.read().await
    }

    /// Background eviction loop: purge expired entries on an interval until
    /// shutdown.
    pub async fn run_eviction(
        &self,
        every: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.purge_expired().await,
                _ = shutdown.changed() => break,
            }
        }
    }
}

impl Default for KvCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let kv = KvCache::new();

        assert_eq!(kv.get("missing").await.unwrap(), None);

        kv.set("k", "v").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));

        assert!(kv.delete("k").await.unwrap());
        assert!(!kv.delete("k").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let kv = KvCache::new();
        kv.setex("k", Duration::from_secs(60), "v").await.unwrap();

        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(!kv.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let kv = KvCache::new();
        kv.setex("otp:123456", Duration::from_secs(600), "payload")
            .await
            .unwrap();

        assert_eq!(
            kv.take("otp:123456").await.unwrap(),
            Some("payload".to_string())
        );
        assert_eq!(kv.take("otp:123456").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let kv = KvCache::new();
        kv.set("k", "v").await.unwrap();

        kv.get("k").await.unwrap();
        kv.get("k").await.unwrap();
        kv.get("absent").await.unwrap();

        let stats = kv.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let kv = KvCache::new();
        kv.setex("a", Duration::from_secs(10), "1").await.unwrap();
        kv.set("b", "2").await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        kv.purge_expired().await;

        let stats = kv.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(kv.get("b").await.unwrap(), Some("2".to_string()));
    }
}
