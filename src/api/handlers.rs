//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio::sync::broadcast;

use crate::api::ws::{EventBroadcaster, EVENT_CHANNEL_CAPACITY};
use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::events::CacheEvent;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, ListResponse, SetRequest, SetResponse,
    StatsResponse,
};

// == App State ==
/// Application state shared across all handlers.
///
/// The cache is internally synchronized, so handlers call it directly; the
/// broadcast sender hands each WebSocket client its own event receiver.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
    pub events: broadcast::Sender<CacheEvent>,
    /// TTL in seconds applied when a set request does not carry one
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(cache: Cache, events: broadcast::Sender<CacheEvent>, default_ttl: u64) -> Self {
        Self {
            cache,
            events,
            default_ttl,
        }
    }

    /// Builds the state from configuration, wiring the cache's event sink
    /// to the broadcast channel served at /ws.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let sink = Arc::new(EventBroadcaster::new(events.clone()));
        let cache = Cache::new(config.max_entries, sink)?;
        Ok(Self::new(cache, events, config.default_ttl))
    }
}

// == Handlers ==
/// Handler for GET /api/cache
///
/// Returns a snapshot of all live entries, most recently used first.
pub async fn list_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(ListResponse::new(state.cache.items()))
}

/// Handler for GET /api/cache/:key
///
/// Retrieves a value by key. A key past its deadline reads as absent.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /api/cache/:key
///
/// Stores a value under the key in the path, with an optional TTL in the
/// body.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<(StatusCode, Json<SetResponse>)> {
    if let Some(reason) = req.validate(&key) {
        return Err(CacheError::InvalidRequest(reason));
    }

    let ttl = Duration::from_secs(req.ttl.unwrap_or(state.default_ttl));
    state.cache.set(key.clone(), req.value, ttl);

    Ok((StatusCode::CREATED, Json(SetResponse::new(key))))
}

/// Handler for DELETE /api/cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key) {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from_stats(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
