//! The `transport` module is the hub's external collaborator: it speaks
//! WebSocket and JSON to clients, escapes user text, and calls the hub's
//! `subscribe` / `unsubscribe` / `publish` explicitly.

pub mod client;
pub mod message;
pub mod sanitize;
pub mod websocket;

pub use client::wait_for_subscribed;
pub use message::{ClientMessage, ServerMessage};
pub use websocket::{serve, start_websocket_server};
