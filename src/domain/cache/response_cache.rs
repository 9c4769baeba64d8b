//! Insertion-ordered TTL cache for model responses

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Configuration for a response cache
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCacheConfig {
    /// Maximum number of live entries
    pub max_entries: usize,
    /// Time an entry stays valid after insertion
    pub ttl: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(300),
        }
    }
}

impl ResponseCacheConfig {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self { max_entries, ttl }
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Counters of two caches added together, such as a batch and its retry pass
    pub fn combined(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
        }
    }

    /// Share of lookups that hit, 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    sequence: u64,
}

/// Bounded cache with TTL expiry and oldest-insertion eviction.
///
/// Expired entries are dropped when they are looked up or when
/// [`purge_expired`](Self::purge_expired) runs. When a new key arrives at
/// capacity, the single entry inserted longest ago is evicted. Time comes
/// from `tokio::time::Instant`, so paused-clock tests control expiry.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    insertion_order: BTreeMap<u64, String>,
    next_sequence: u64,
    config: ResponseCacheConfig,
    hits: u64,
    misses: u64,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: ResponseCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: BTreeMap::new(),
            next_sequence: 0,
            config,
            hits: 0,
            misses: 0,
        }
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    /// Value for `key` if present and younger than the TTL
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                self.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove(key);
        }
        self.misses += 1;
        None
    }

    /// Store `value`, replacing any entry for `key` and evicting the oldest
    /// entry when a new key would exceed capacity
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        if self.config.max_entries == 0 {
            return;
        }

        let key = key.into();
        if self.remove(&key).is_none() {
            while self.entries.len() >= self.config.max_entries {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.insertion_order.insert(sequence, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                sequence,
            },
        );
    }

    /// Cached value for `key`, or the result of `compute` (cached when Ok)
    pub async fn get_or_compute<F, Fut, E>(&mut self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.insertion_order.remove(&entry.sequence);
        Some(entry.value)
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.config.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    pub fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }

    fn evict_oldest(&mut self) -> bool {
        match self.insertion_order.pop_first() {
            Some((_, key)) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}
