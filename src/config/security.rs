//! Security and authentication configuration types.

use super::defaults::{
    default_cors_origins, default_max_connections_per_ip, default_max_message_size,
    default_require_auth,
};
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Require a valid bearer token on every WebSocket connection
    #[serde(default = "default_require_auth")]
    pub require_websocket_auth: bool,
    /// Require a bearer token on the metrics endpoint
    #[serde(default = "default_require_auth")]
    pub require_metrics_auth: bool,
    /// Authentication token for the metrics endpoint (if required)
    #[serde(default)]
    pub metrics_auth_token: Option<String>,
    /// Maximum WebSocket message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum concurrent connections per IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Static bearer tokens accepted when `require_websocket_auth` is true.
    /// When that flag is false this list is ignored and every connection is
    /// admitted with a guest identity.
    #[serde(default)]
    pub auth_tokens: Vec<AuthTokenEntry>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            require_websocket_auth: default_require_auth(),
            require_metrics_auth: default_require_auth(),
            metrics_auth_token: None,
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
            auth_tokens: Vec::new(),
        }
    }
}

/// One accepted bearer token and the identity it maps to.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthTokenEntry {
    /// The token value presented by the client at connection time
    pub token: String,
    /// Stable user identifier attached to admitted sessions
    pub user_id: String,
    /// Optional email for observability
    #[serde(default)]
    pub email: Option<String>,
}
