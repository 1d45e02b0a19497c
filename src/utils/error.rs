//! The `error` module defines the error types shared across `chathub`.
//!
//! `HubError` is returned to callers of the hub. `DeliveryFailure` is
//! per-channel and never reaches a publisher: the hub logs it, counts it and
//! decides whether the subscription survives.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("invalid topic {0:?}: topic names must not be empty")]
    InvalidTopic(String),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The channel's outbound queue is full; the message was dropped.
    #[error("outbound queue full, message dropped")]
    Backpressure,

    /// The owning connection is gone.
    #[error("channel disconnected")]
    Disconnected,

    /// The message could not be turned into a frame; it was dropped.
    #[error("message could not be encoded, message dropped")]
    Encode,
}

/// Failures of the command-line client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed server frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("connection closed before the server answered")]
    Closed,
}
