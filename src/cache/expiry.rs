//! Scheduled Expiration Module
//!
//! Each live entry owns at most one timer task. The timer carries the
//! entry's generation; a firing timer only removes the entry when the
//! generation still matches, so a set, delete, or eviction that happened in
//! between turns a stale timer into a no-op.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::store::CacheInner;

// == Scheduled Expiration ==
/// Handle to one pending expiration timer.
#[derive(Debug)]
pub(crate) struct ScheduledExpiration {
    generation: u64,
    task: JoinHandle<()>,
}

impl ScheduledExpiration {
    /// Stops the timer. Harmless when the timer has already fired: the
    /// generation check in the firing path keeps the two racing outcomes
    /// from both mutating the same entry.
    pub(crate) fn abort(self) {
        self.task.abort();
    }
}

// == Expiration Table ==
/// Per-key table of pending expiration timers.
///
/// Lives inside the engine's state and is only ever mutated under the
/// engine's lock, which is what keeps "at most one live timer per key" true.
#[derive(Debug, Default)]
pub(crate) struct Expirations {
    pending: HashMap<String, ScheduledExpiration>,
}

impl Expirations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // == Schedule ==
    /// Spawns a timer that expires `key` after `ttl` and records it as the
    /// key's only pending expiration. Returns the timer it displaced, if
    /// any, for the caller to abort once the lock is released.
    #[must_use]
    pub(crate) fn schedule(
        &mut self,
        key: &str,
        generation: u64,
        ttl: Duration,
        cache: Weak<CacheInner>,
    ) -> Option<ScheduledExpiration> {
        let task = tokio::spawn(expiration_timer(cache, key.to_string(), generation, ttl));
        self.pending
            .insert(key.to_string(), ScheduledExpiration { generation, task })
    }

    // == Cancel ==
    /// Removes and returns the pending expiration for `key`, if any.
    #[must_use]
    pub(crate) fn cancel(&mut self, key: &str) -> Option<ScheduledExpiration> {
        self.pending.remove(key)
    }

    // == Complete ==
    /// Clears the record of a timer that has fired, provided it has not been
    /// superseded by a newer generation in the meantime.
    pub(crate) fn complete(&mut self, key: &str, generation: u64) {
        if self.pending.get(key).map(|pending| pending.generation) == Some(generation) {
            self.pending.remove(key);
        }
    }

    // == Drain ==
    /// Removes every pending expiration, returning the handles for the
    /// shutdown path to abort.
    #[must_use]
    pub(crate) fn drain(&mut self) -> Vec<ScheduledExpiration> {
        self.pending.drain().map(|(_, pending)| pending).collect()
    }

    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Timer body. Holds only a weak reference so outstanding timers never keep
/// a dropped cache alive.
async fn expiration_timer(cache: Weak<CacheInner>, key: String, generation: u64, ttl: Duration) {
    tokio::time::sleep(ttl).await;
    if let Some(inner) = cache.upgrade() {
        CacheInner::expire(&inner, &key, generation);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_schedule_displaces_previous_timer() {
        let mut expirations = Expirations::new();

        let displaced = expirations.schedule("a", 1, TTL, Weak::new());
        assert!(displaced.is_none());

        let displaced = expirations.schedule("a", 2, TTL, Weak::new());
        assert!(displaced.is_some());
        assert_eq!(expirations.len(), 1);

        displaced.unwrap().abort();
        for pending in expirations.drain() {
            pending.abort();
        }
    }

    #[tokio::test]
    async fn test_cancel_removes_timer() {
        let mut expirations = Expirations::new();
        let _ = expirations.schedule("a", 1, TTL, Weak::new());

        let cancelled = expirations.cancel("a");
        assert!(cancelled.is_some());
        assert_eq!(expirations.len(), 0);
        cancelled.unwrap().abort();

        assert!(expirations.cancel("a").is_none());
    }

    #[tokio::test]
    async fn test_complete_ignores_superseded_generation() {
        let mut expirations = Expirations::new();
        let _ = expirations.schedule("a", 1, TTL, Weak::new());
        if let Some(displaced) = expirations.schedule("a", 2, TTL, Weak::new()) {
            displaced.abort();
        }

        // A stale timer finishing must not clear the newer record.
        expirations.complete("a", 1);
        assert_eq!(expirations.len(), 1);

        expirations.complete("a", 2);
        assert_eq!(expirations.len(), 0);
    }

    #[tokio::test]
    async fn test_drain_empties_the_table() {
        let mut expirations = Expirations::new();
        let _ = expirations.schedule("a", 1, TTL, Weak::new());
        let _ = expirations.schedule("b", 2, TTL, Weak::new());

        let drained = expirations.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(expirations.len(), 0);
        for pending in drained {
            pending.abort();
        }
    }
}
