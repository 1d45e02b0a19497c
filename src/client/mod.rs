//! The `client` module defines the representation of a connected session.
//!
//! `Client` is the transport's implementation of the hub's `Channel`: an id
//! plus a bounded queue feeding one WebSocket.

pub mod pubsub_client;
pub use pubsub_client::Client;
