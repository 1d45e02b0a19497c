//! Wire protocol
//!
//! JSON text frames tagged by `type`. Clients subscribe, unsubscribe,
//! publish to any topic, or send a `chat` line that goes to the chat topic.

use serde::{Deserialize, Serialize};

use crate::hub::Message;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },
    #[serde(rename = "publish")]
    Publish { topic: String, payload: String },
    #[serde(rename = "chat")]
    Chat { username: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "message")]
    Message {
        topic: String,
        payload: String,
        timestamp: i64,
    },
    #[serde(rename = "subscribed")]
    Subscribed { topic: String },
    #[serde(rename = "unsubscribed")]
    Unsubscribed { topic: String },
    /// Sent after the hub dropped this client from `topic` for falling behind.
    #[serde(rename = "evicted")]
    Evicted { topic: String },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<&Message> for ServerMessage {
    fn from(msg: &Message) -> Self {
        Self::Message {
            topic: msg.topic.clone(),
            payload: msg.payload.clone(),
            timestamp: msg.timestamp,
        }
    }
}
