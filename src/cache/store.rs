//! Cache Store Module
//!
//! The cache engine: a bounded key/value map with LRU eviction, per-entry
//! TTL deadlines, and event notifications. Every removal path (scheduled
//! expiration, lazy expiration on read, explicit delete, capacity eviction)
//! funnels through one internal routine so the map, the recency order, and
//! the pending-expiration table always move together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::cache::entry::{deadline_after, CacheItem, Entry};
use crate::cache::expiry::{Expirations, ScheduledExpiration};
use crate::cache::recency::RecencyList;
use crate::cache::stats::CacheStats;
use crate::error::{CacheError, Result};
use crate::events::{CacheEvent, EventSink};

// == Cache ==
/// Thread-safe LRU cache with per-key TTL expiration.
///
/// Cloning is cheap; clones share the same underlying store.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

pub(crate) struct CacheInner {
    state: Mutex<CacheState>,
    capacity: usize,
    sink: Arc<dyn EventSink>,
}

/// Mutable engine state. The entry map, the recency order, and the pending
/// expirations must stay consistent with each other, so all three sit behind
/// the one lock.
struct CacheState {
    entries: HashMap<String, Entry>,
    recency: RecencyList,
    expirations: Expirations,
    stats: CacheStats,
    generations: u64,
}

impl CacheState {
    /// Removes every trace of `key`: the entry, its recency slot, and its
    /// pending expiration. Safe to call for a key that is already gone; the
    /// second caller sees a no-op.
    fn remove(&mut self, key: &str) -> Option<(Entry, Option<ScheduledExpiration>)> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(key);
        let pending = self.expirations.cancel(key);
        Some((entry, pending))
    }

    /// Removes the least-recently-used entry.
    fn remove_lru(&mut self) -> Option<(String, Entry, Option<ScheduledExpiration>)> {
        let key = self.recency.peek_lru()?.clone();
        let (entry, pending) = self.remove(&key)?;
        Some((key, entry, pending))
    }

    fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }
}

impl Cache {
    // == Constructor ==
    /// Creates a cache bounded to `capacity` entries that publishes every
    /// mutation to `sink`.
    ///
    /// Fails with `InvalidCapacity` when `capacity` is less than one.
    pub fn new(capacity: usize, sink: Arc<dyn EventSink>) -> Result<Self> {
        if capacity < 1 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        Ok(Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    recency: RecencyList::new(),
                    expirations: Expirations::new(),
                    stats: CacheStats::new(),
                    generations: 0,
                }),
                capacity,
                sink,
            }),
        })
    }

    // == Set ==
    /// Stores `value` under `key` with an expiration deadline of `now + ttl`.
    ///
    /// Overwriting an existing key replaces its value, deadline, and
    /// generation, refreshes its recency, and reschedules its expiration.
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry. A zero `ttl` makes the entry immediately eligible for
    /// expiration. Values are opaque; any payload is accepted.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let key = key.into();
        let expires_at = deadline_after(ttl);
        let mut events = Vec::with_capacity(2);
        let mut cancelled = Vec::new();

        {
            let mut state = self.inner.state.lock();
            let generation = state.next_generation();

            let updated = if let Some(entry) = state.entries.get_mut(&key) {
                entry.value = value.clone();
                entry.expires_at = expires_at;
                entry.generation = generation;
                true
            } else {
                false
            };

            if updated {
                state.recency.touch(&key);
                events.push(CacheEvent::Updated {
                    key: key.clone(),
                    value,
                    expires_at,
                });
            } else {
                if state.entries.len() >= self.inner.capacity {
                    if let Some((victim_key, victim, pending)) = state.remove_lru() {
                        debug!(key = %victim_key, "capacity reached, evicting least recently used entry");
                        if let Some(pending) = pending {
                            cancelled.push(pending);
                        }
                        state.stats.record_eviction();
                        events.push(CacheEvent::Evicted {
                            key: victim_key,
                            value: victim.value,
                        });
                    }
                }

                state
                    .entries
                    .insert(key.clone(), Entry::new(value.clone(), expires_at, generation));
                state.recency.touch(&key);
                events.push(CacheEvent::Created {
                    key: key.clone(),
                    value,
                    expires_at,
                });
            }

            if let Some(displaced) =
                state
                    .expirations
                    .schedule(&key, generation, ttl, Arc::downgrade(&self.inner))
            {
                cancelled.push(displaced);
            }
        }

        // Timers and the sink are dealt with outside the critical section.
        for pending in cancelled {
            pending.abort();
        }
        self.inner.emit_all(events);
    }

    // == Get ==
    /// Returns the value stored under `key`, refreshing its recency.
    ///
    /// A key past its deadline is destroyed on the spot (lazy expiration)
    /// and reads as absent, whether or not its timer has fired yet.
    pub fn get(&self, key: &str) -> Option<Value> {
        enum Lookup {
            Miss,
            Expired,
            Hit(Value),
        }

        let mut cancelled = None;
        let mut expired = None;

        let found = {
            let mut state = self.inner.state.lock();
            let lookup = match state.entries.get(key) {
                None => Lookup::Miss,
                Some(entry) if entry.is_expired() => Lookup::Expired,
                Some(entry) => Lookup::Hit(entry.value.clone()),
            };

            match lookup {
                Lookup::Miss => {
                    state.stats.record_miss();
                    None
                }
                Lookup::Expired => {
                    debug!(key, "entry past its deadline, removing on read");
                    if let Some((_, pending)) = state.remove(key) {
                        cancelled = pending;
                    }
                    state.stats.record_expiration();
                    state.stats.record_miss();
                    expired = Some(CacheEvent::Expired {
                        key: key.to_string(),
                    });
                    None
                }
                Lookup::Hit(value) => {
                    state.recency.touch(key);
                    state.stats.record_hit();
                    Some(value)
                }
            }
        };

        if let Some(pending) = cancelled {
            pending.abort();
        }
        if let Some(event) = expired {
            self.inner.emit(event);
        }
        found
    }

    // == Delete ==
    /// Removes `key` if present, cancelling its pending expiration. Returns
    /// whether the key existed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            state.remove(key)
        };

        match removed {
            Some((_, pending)) => {
                if let Some(pending) = pending {
                    pending.abort();
                }
                self.inner.emit(CacheEvent::Deleted {
                    key: key.to_string(),
                });
                true
            }
            None => false,
        }
    }

    // == Items ==
    /// Snapshot of all live entries, most recently used first. Entries past
    /// their deadline are omitted. The snapshot is detached: mutating it has
    /// no effect on the cache.
    pub fn items(&self) -> Vec<CacheItem> {
        let state = self.inner.state.lock();
        state
            .recency
            .iter()
            .filter_map(|key| {
                let entry = state.entries.get(key)?;
                if entry.is_expired() {
                    return None;
                }
                Some(CacheItem {
                    key: key.clone(),
                    value: entry.value.clone(),
                    expires_at: entry.expires_at,
                })
            })
            .collect()
    }

    // == Stats ==
    /// Current performance counters plus the live entry count.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.entries.len();
        stats
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries this cache will hold.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    // == Shutdown ==
    /// Cancels every outstanding scheduled expiration. Call during process
    /// shutdown so no timer outlives the cache's consumers.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            state.expirations.drain()
        };
        debug!(count = drained.len(), "cancelling outstanding expirations");
        for pending in drained {
            pending.abort();
        }
    }
}

impl CacheInner {
    /// Scheduled-expiration entry point. Removes `key` only when the live
    /// entry still carries `generation`; a stale timer whose entry was
    /// replaced or already destroyed is a no-op.
    pub(crate) fn expire(inner: &Arc<CacheInner>, key: &str, generation: u64) {
        let mut expired = None;

        {
            let mut state = inner.state.lock();
            let live = state.entries.get(key).map(|entry| entry.generation);
            if live == Some(generation) {
                debug!(key, "entry reached its deadline, removing");
                state.remove(key);
                state.stats.record_expiration();
                expired = Some(CacheEvent::Expired {
                    key: key.to_string(),
                });
            } else {
                state.expirations.complete(key, generation);
            }
        }

        if let Some(event) = expired {
            inner.sink.notify(event);
        }
    }

    fn emit(&self, event: CacheEvent) {
        self.sink.notify(event);
    }

    fn emit_all(&self, events: Vec<CacheEvent>) {
        for event in events {
            self.sink.notify(event);
        }
    }
}
