//! Client representation
//!
//! `Client` models one connected WebSocket session. It owns the sending side
//! of a bounded per-connection queue; the transport drains the other side
//! into the socket. The hub reaches a client only through the `Channel`
//! trait and only through a weak reference.
//!
//! When the hub evicts the client from a topic because its queue stayed
//! full, the topic is parked in `Evictions`. The queue is full at that
//! moment, so the writer picks the notice up once it has drained a frame.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::error;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::hub::{Channel, ChannelId, Message};
use crate::transport::message::ServerMessage;
use crate::utils::DeliveryFailure;

/// Topics a client was evicted from and has not been told about yet.
#[derive(Debug, Default)]
pub struct Evictions {
    topics: Mutex<Vec<String>>,
}

impl Evictions {
    pub fn push(&self, topic: &str) {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(topic.to_string());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.topics.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ChannelId,
    pub sender: Sender<WsMessage>,
    evictions: Arc<Evictions>,
}

impl Client {
    /// Create a new client around the sending half of its outbound queue.
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            evictions: Arc::default(),
        }
    }

    /// Shared with the writer task, which does not hold the client itself.
    pub fn evictions(&self) -> Arc<Evictions> {
        Arc::clone(&self.evictions)
    }

    /// Queue a protocol frame for this client without waiting.
    pub fn send(&self, msg: &ServerMessage) -> Result<(), DeliveryFailure> {
        let frame = encode(msg).map_err(|e| {
            error!(client = %self.id, "failed to serialize frame: {e}");
            DeliveryFailure::Encode
        })?;

        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Backpressure,
            TrySendError::Closed(_) => DeliveryFailure::Disconnected,
        })
    }
}

/// Serialize a protocol frame as a WebSocket text message.
pub fn encode(msg: &ServerMessage) -> Result<WsMessage, serde_json::Error> {
    serde_json::to_string(msg).map(WsMessage::text)
}

impl Channel for Client {
    fn id(&self) -> &ChannelId {
        &self.id
    }

    fn deliver(&self, message: &Message) -> Result<(), DeliveryFailure> {
        self.send(&ServerMessage::from(message))
    }

    fn evicted(&self, topic: &str) {
        self.evictions.push(topic);
    }
}
