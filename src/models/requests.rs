//! Request DTOs for the sample cache host
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cache::EntryOptions;

/// Request body for the SET operation (PUT /cache/:key)
///
/// # Fields
/// - `value`: The value to store, as UTF-8 text
/// - `absolute_expiration`: Optional RFC 3339 instant after which the entry is invalid
/// - `absolute_expiration_relative_to_now_secs`: Optional lifetime in seconds
/// - `sliding_expiration_secs`: Optional idle window in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: String,
    #[serde(default)]
    pub absolute_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub absolute_expiration_relative_to_now_secs: Option<u64>,
    #[serde(default)]
    pub sliding_expiration_secs: Option<u64>,
}

impl SetRequest {
    /// Converts the request's expiration fields into entry options.
    pub fn entry_options(&self) -> EntryOptions {
        EntryOptions {
            absolute_expiration: self.absolute_expiration,
            absolute_expiration_relative_to_now: self
                .absolute_expiration_relative_to_now_secs
                .map(Duration::from_secs),
            sliding_expiration: self.sliding_expiration_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value, "hello");
        assert_eq!(req.entry_options(), EntryOptions::default());
    }

    #[test]
    fn test_set_request_with_expirations() {
        let json = r#"{
            "value": "hello",
            "absolute_expiration": "2030-01-01T00:00:00Z",
            "absolute_expiration_relative_to_now_secs": 60,
            "sliding_expiration_secs": 5
        }"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        let options = req.entry_options();

        assert_eq!(
            options.absolute_expiration.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
        assert_eq!(
            options.absolute_expiration_relative_to_now,
            Some(Duration::from_secs(60))
        );
        assert_eq!(options.sliding_expiration, Some(Duration::from_secs(5)));
    }
}
