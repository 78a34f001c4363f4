#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Drift Signal Server
//!
//! A lightweight, in-memory WebSocket matchmaking and signaling server for
//! anonymous one-to-one video chat.
//!
//! Pairs searching users by interest overlap, relays the opaque WebRTC
//! handshake between the two paired peers, and tears pairings down on skip
//! or disconnect. No database, no message history; just run the binary and
//! connect via WebSocket.

/// Bearer-token verification (in-memory backed)
pub mod auth;

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Matchmaking, pairing, and relay orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
