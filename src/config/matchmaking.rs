//! Matchmaking behavior configuration.

use super::defaults::default_searching_message;
use serde::{Deserialize, Serialize};

/// Matchmaking configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchmakingConfig {
    /// Informational text sent with the `waiting` event when a session is
    /// enqueued without an immediate match.
    #[serde(default = "default_searching_message")]
    pub searching_message: String,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            searching_message: default_searching_message(),
        }
    }
}
