//! Configuration module.
//!
//! Layered configuration in the usual order: compiled defaults, JSON config
//! files, then `DRIFT_SIGNAL__`-prefixed environment overrides with `__` as
//! the nesting separator.
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`matchmaking`]: Matchmaking behavior settings
//! - [`security`]: Security and authentication settings
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod matchmaking;
pub mod security;
pub mod types;
pub mod validation;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use matchmaking::MatchmakingConfig;

pub use security::{AuthTokenEntry, SecurityConfig};

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 5001);
        assert_eq!(config.security.cors_origins, "*");
        assert!(!config.security.require_websocket_auth);
        assert!(!config.security.require_metrics_auth);
        assert_eq!(config.security.max_message_size, 65536);
        assert_eq!(config.security.max_connections_per_ip, 10);
        assert!(config.security.auth_tokens.is_empty());

        assert_eq!(
            config.matchmaking.searching_message,
            "Searching for someone to talk to..."
        );

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, config.port);
        assert_eq!(back.security.cors_origins, config.security.cors_origins);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"port": 9100, "security": {"require_websocket_auth": true}}"#,
        )
        .unwrap();
        assert_eq!(config.port, 9100);
        assert!(config.security.require_websocket_auth);
        assert_eq!(config.security.max_message_size, 65536);
        assert_eq!(
            config.matchmaking.searching_message,
            "Searching for someone to talk to..."
        );
    }

    #[test]
    fn test_auth_token_entries_deserialize() {
        let config: Config = serde_json::from_str(
            r#"{"security": {"auth_tokens": [
                {"token": "tok-1", "user_id": "uid-1", "email": "one@example.com"},
                {"token": "tok-2", "user_id": "uid-2"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(config.security.auth_tokens.len(), 2);
        assert_eq!(config.security.auth_tokens[0].user_id, "uid-1");
        assert_eq!(config.security.auth_tokens[1].email, None);
    }
}
