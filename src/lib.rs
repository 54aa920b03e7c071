//! cachecast - an in-memory LRU cache server with live event fan-out
//!
//! Provides a bounded key/value cache with per-entry TTL expiration and
//! broadcasts every cache mutation to WebSocket subscribers.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheItem, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, EventSink, NullSink};
