// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler and token validation (entry point)
// - connection: per-connection send/receive loop
// - sending: message serialization and sending functions
// - routes: HTTP route setup (ws, health, metrics)

mod connection;
mod handler;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use routes::{create_router, metrics_handler};
