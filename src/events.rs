//! Cache mutation events and the sink consumers implement to receive them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// == Cache Event ==
/// Emitted by the cache engine after every state change.
///
/// The engine hands events to the sink only after releasing its internal
/// lock, so a slow consumer cannot stall unrelated cache operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A key was stored for the first time.
    Created {
        key: String,
        value: Value,
        expires_at: DateTime<Utc>,
    },
    /// An existing key was overwritten with a new value and deadline.
    Updated {
        key: String,
        value: Value,
        expires_at: DateTime<Utc>,
    },
    /// A key was removed by an explicit delete.
    Deleted { key: String },
    /// A key reached its deadline and was removed.
    Expired { key: String },
    /// A key was removed to make room for a new one.
    Evicted { key: String, value: Value },
}

impl CacheEvent {
    /// The key this event concerns.
    pub fn key(&self) -> &str {
        match self {
            CacheEvent::Created { key, .. }
            | CacheEvent::Updated { key, .. }
            | CacheEvent::Deleted { key }
            | CacheEvent::Expired { key }
            | CacheEvent::Evicted { key, .. } => key,
        }
    }

    /// Short name of the event kind, matching its wire tag.
    pub fn action(&self) -> &'static str {
        match self {
            CacheEvent::Created { .. } => "created",
            CacheEvent::Updated { .. } => "updated",
            CacheEvent::Deleted { .. } => "deleted",
            CacheEvent::Expired { .. } => "expired",
            CacheEvent::Evicted { .. } => "evicted",
        }
    }
}

// == Event Sink ==
/// Capability the engine uses to publish events.
///
/// `notify` is called synchronously at the point of state change;
/// implementations should hand the event off quickly rather than block.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: CacheEvent);
}

/// Sink that discards every event, for embedding the cache without any
/// consumer attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: CacheEvent) {}
}
