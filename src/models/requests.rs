//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (POST /api/cache/:key)
///
/// # Fields
/// - `value`: The value to store; any JSON payload is accepted
/// - `ttl`: Optional TTL in seconds (uses the server default if not
///   specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Opaque value to store; the cache never inspects it
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request against the key taken from the request path.
    ///
    /// Returns an error message if validation fails, None if valid. Values
    /// are opaque and never validated.
    pub fn validate(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}
