//! # chathub
//!
//! `chathub` is an in-memory live chat relay. Clients connect over
//! WebSocket, send chat lines, and every line is HTML-escaped and broadcast
//! to all subscribers of a topic.
//!
//! ## Core Modules
//!
//! - `hub`: topic map, subscriptions and fan-out. Knows nothing about sockets.
//! - `client`: a connected session, the hub's `Channel` implementation.
//! - `config`: layered settings (defaults, `config/default.toml`, env).
//! - `transport`: WebSocket server, JSON protocol and HTML escaping.
//! - `utils`: error types and logging.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;
