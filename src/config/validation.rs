//! Configuration validation functions.

use super::Config;

/// Validate security-sensitive configuration before startup.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode();

    if config.security.require_metrics_auth {
        let token_present = config
            .security
            .metrics_auth_token
            .as_ref()
            .is_some_and(|t| !t.is_empty());

        if !token_present {
            anyhow::bail!(
                "\nCRITICAL: Metrics authentication is enabled but no token is configured!\n\
                 ===================================================================\n\
                 Configure a shared bearer token:\n\
                 export DRIFT_SIGNAL__SECURITY__METRICS_AUTH_TOKEN=\"$(openssl rand -hex 32)\"\n\
                 \n\
                 To disable metrics auth (NOT recommended), set:\n\
                 export DRIFT_SIGNAL__SECURITY__REQUIRE_METRICS_AUTH=false\n\
                 ===================================================================\n"
            );
        }

        if let Some(token) = &config.security.metrics_auth_token {
            if token.len() < 16 {
                eprintln!(
                    "\nWARNING: Metrics auth token is very short ({} chars).\n\
                     Recommended: At least 32 characters.\n\
                     Generate a strong token: openssl rand -hex 32\n",
                    token.len()
                );
            }
        }
    } else if is_prod {
        eprintln!(
            "\nSECURITY WARNING: Metrics authentication disabled in production!\n\
             The /metrics endpoint is publicly accessible.\n"
        );
    }

    if config.security.require_websocket_auth && config.security.auth_tokens.is_empty() {
        eprintln!(
            "\nWARNING: WebSocket auth is required but security.auth_tokens is empty;\n\
             every connection attempt will be rejected.\n"
        );
    }

    if is_prod && !config.security.require_websocket_auth {
        anyhow::bail!(
            "\nCRITICAL: WebSocket authentication is disabled in production!\n\
             ===================================================================\n\
             Anonymous matchmaking still requires a verified identity token per\n\
             connection. Enable auth and configure accepted tokens:\n\
             export DRIFT_SIGNAL__SECURITY__REQUIRE_WEBSOCKET_AUTH=true\n\
             ===================================================================\n"
        );
    }

    if is_prod && config.security.cors_origins.trim() == "*" {
        eprintln!(
            "\nSECURITY WARNING: Permissive CORS (\"*\") in production.\n\
             Set DRIFT_SIGNAL__SECURITY__CORS_ORIGINS to the frontend origin(s).\n"
        );
    }

    Ok(())
}

/// Production mode is signalled by `ENVIRONMENT=production` or
/// `DRIFT_SIGNAL_ENV=production`.
#[must_use]
pub fn is_production_mode() -> bool {
    let matches_production =
        |value: String| value.trim().eq_ignore_ascii_case("production") || value.trim() == "prod";

    std::env::var("ENVIRONMENT")
        .map(matches_production)
        .unwrap_or(false)
        || std::env::var("DRIFT_SIGNAL_ENV")
            .map(matches_production)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(validate_config_security(&config).is_ok());
    }

    #[test]
    fn test_metrics_auth_without_token_fails() {
        let mut config = Config::default();
        config.security.require_metrics_auth = true;
        config.security.metrics_auth_token = None;
        assert!(validate_config_security(&config).is_err());

        config.security.metrics_auth_token = Some(String::new());
        assert!(validate_config_security(&config).is_err());

        config.security.metrics_auth_token = Some("a-sufficiently-long-token-value".to_string());
        assert!(validate_config_security(&config).is_ok());
    }
}
