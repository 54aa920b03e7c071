//! API Module
//!
//! HTTP handlers, routing, and the WebSocket event fan-out for the cache
//! server.
//!
//! # Endpoints
//! - `GET /api/cache` - Snapshot of all live entries
//! - `GET /api/cache/:key` - Retrieve a value by key
//! - `POST /api/cache/:key` - Create or update an entry
//! - `DELETE /api/cache/:key` - Delete a key
//! - `GET /ws` - Live stream of cache events
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;
pub mod ws;

pub use handlers::*;
pub use routes::create_router;
pub use ws::{EventBroadcaster, EVENT_CHANNEL_CAPACITY};
