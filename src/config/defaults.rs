//! Default value functions for configuration fields.
//!
//! All functions referenced by `#[serde(default = ...)]` attributes live
//! here so defaults stay in one place.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    5001
}

// =============================================================================
// Matchmaking Defaults
// =============================================================================

pub fn default_searching_message() -> String {
    "Searching for someone to talk to...".to_string()
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_require_auth() -> bool {
    false
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB; SDP offers are a few KB at most
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
