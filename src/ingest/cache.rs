//! # Source Cache
//! In-memory TTL cache for fetch results, bounded by entry count.
//!
//! - Entries are visible only while `now - inserted_at < ttl` (absolute TTL,
//!   reads never refresh an entry).
//! - On overflow the oldest *inserted* live entry is evicted first.
//! - Expired entries are purged lazily on `get`/`put`.
//!
//! Time comes from `tokio::time::Instant`, so tests can pause and advance
//! the clock instead of sleeping.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;

use crate::ingest::types::{CacheKey, FetchResult};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_MAXSIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: FetchResult,
    pub inserted_at: Instant,
}

/// Thread-safe; shared by all fetch tasks of a run behind an `Arc`.
#[derive(Debug)]
pub struct SourceCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    maxsize: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Slot>,
    /// Monotonic insertion counter; breaks ties between equal instants.
    next_seq: u64,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

impl SourceCache {
    pub fn new(ttl: Duration, maxsize: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            maxsize,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    /// Live entry for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut inner = self.lock();
        let live = match inner.entries.get(key) {
            None => return None,
            Some(slot) => self.is_live(&slot.entry, now),
        };
        if live {
            inner.entries.get(key).map(|slot| slot.entry.clone())
        } else {
            inner.entries.remove(key);
            None
        }
    }

    /// Insert or overwrite. Overwriting counts as a fresh insertion.
    pub fn put(&self, key: CacheKey, value: FetchResult) {
        if self.maxsize == 0 {
            return;
        }
        let now = Instant::now();
        let mut inner = self.lock();

        let ttl = self.ttl;
        inner
            .entries
            .retain(|_, slot| now.saturating_duration_since(slot.entry.inserted_at) < ttl);

        if !inner.entries.contains_key(&key) {
            while inner.entries.len() >= self.maxsize {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, slot)| (slot.entry.inserted_at, slot.seq))
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        inner.entries.remove(&k);
                        counter!("osint_cache_evictions_total").increment(1);
                    }
                    None => break,
                }
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Slot {
                entry: CacheEntry {
                    value,
                    inserted_at: now,
                },
                seq,
            },
        );
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .entries
            .values()
            .filter(|slot| self.is_live(&slot.entry, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_MAXSIZE)
    }
}
