//! Message definitions for the hub
//!
//! A `Message` is created by the hub at publish time from an already
//! sanitized payload, handed to every subscribed channel, then dropped. The
//! hub keeps no history.
//!
//! - `topic`: topic name used for routing
//! - `payload`: sanitized text; escaping is the transport's job
//! - `timestamp`: milliseconds since UNIX epoch, set by the hub on publish

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
}

impl Message {
    /// Stamp a payload for `topic` with the current time.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
