//! Cache Entry Module
//!
//! Defines individual cache entries and their expiration deadlines.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// == Cache Entry ==
/// One live cache entry.
///
/// The generation distinguishes this value+deadline instance from any later
/// one stored under the same key, so a timer scheduled for an earlier
/// instance can recognize that it is stale.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The stored value, opaque to the cache
    pub value: Value,
    /// Absolute expiration deadline
    pub expires_at: DateTime<Utc>,
    /// Instance counter for this key
    pub generation: u64,
}

impl Entry {
    pub(crate) fn new(value: Value, expires_at: DateTime<Utc>, generation: u64) -> Self {
        Self {
            value,
            expires_at,
            generation,
        }
    }

    /// An entry counts as expired once the current time reaches its
    /// deadline, deadline included.
    pub(crate) fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// == Item Snapshot ==
/// Owned snapshot of one entry, as handed out by the items listing.
#[derive(Debug, Clone, Serialize)]
pub struct CacheItem {
    pub key: String,
    pub value: Value,
    pub expires_at: DateTime<Utc>,
}

// == Utility Functions ==
/// Absolute deadline `ttl` from now, saturating instead of overflowing for
/// absurdly large durations.
pub(crate) fn deadline_after(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
