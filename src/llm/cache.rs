//! In-memory response cache for remote model calls.
//!
//! Identical `(message, sender)` requests are served from the cache to
//! deduplicate repeat inspection costs. The cache is mutex-guarded with FIFO
//! eviction in insertion order.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::types::ModelVerdict;

/// Default cache capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Cache key over the exact (message, sender) byte pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey(String);

impl ResponseKey {
    pub fn new(message: &str, sender: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        hasher.update([0u8]);
        hasher.update(sender.as_bytes());
        let hash = hasher.finalize();
        Self(format!("{hash:x}"))
    }
}

#[derive(Debug, Default)]
struct ResponseCacheInner {
    map: HashMap<ResponseKey, ModelVerdict>,
    order: VecDeque<ResponseKey>,
    hits: u64,
    misses: u64,
}

/// FIFO-evicting response cache.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<ResponseCacheInner>,
    capacity: usize,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ResponseCacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a cached verdict.
    pub fn get(&self, message: &str, sender: &str) -> Option<ModelVerdict> {
        let key = ResponseKey::new(message, sender);
        let mut inner = self.inner.lock().expect("response cache poisoned");
        match inner.map.get(&key).cloned() {
            Some(verdict) => {
                inner.hits += 1;
                Some(verdict)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert a verdict, evicting the oldest entry when full.
    pub fn insert(&self, message: &str, sender: &str, verdict: ModelVerdict) {
        let key = ResponseKey::new(message, sender);
        let mut inner = self.inner.lock().expect("response cache poisoned");

        if inner.map.insert(key.clone(), verdict).is_none() {
            inner.order.push_back(key);
            while inner.map.len() > self.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.map.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("response cache poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) counters.
    pub fn counters(&self) -> (u64, u64) {
        let inner = self.inner.lock().expect("response cache poisoned");
        (inner.hits, inner.misses)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
