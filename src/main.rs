#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use drift_signal_server::auth::{IdentityVerifier, StaticTokenVerifier};
use drift_signal_server::config;
use drift_signal_server::logging;
use drift_signal_server::server::{ServerConfig, SignalServer};
use drift_signal_server::websocket;
use std::net::SocketAddr;
use std::sync::Arc;

/// Drift Signal -- lightweight WebSocket matchmaking and signaling server for 1:1 video chat
#[derive(Parser, Debug)]
#[command(name = "drift-signal-server")]
#[command(about = "A lightweight, in-memory WebSocket matchmaking and signaling server")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already validates but only logs to stderr; capture the
    // result here for --validate-config exit codes and hard startup failure.
    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!(
                    "  WebSocket auth required: {}",
                    cfg.security.require_websocket_auth
                );
                println!("  Configured tokens: {}", cfg.security.auth_tokens.len());
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                println!("  CORS origins: {}", cfg.security.cors_origins);
                println!(
                    "  Max connections per IP: {}",
                    cfg.security.max_connections_per_ip
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Drift Signal server");

    let server_config = ServerConfig {
        searching_message: cfg.matchmaking.searching_message.clone(),
        max_message_size: cfg.security.max_message_size,
        max_connections_per_ip: cfg.security.max_connections_per_ip,
        require_metrics_auth: cfg.security.require_metrics_auth,
        metrics_auth_token: cfg.security.metrics_auth_token.clone(),
    };

    let verifier: Arc<dyn IdentityVerifier> = if cfg.security.require_websocket_auth {
        tracing::info!(
            token_count = cfg.security.auth_tokens.len(),
            "WebSocket auth enabled"
        );
        Arc::new(StaticTokenVerifier::new(cfg.security.auth_tokens.clone()))
    } else {
        tracing::warn!("WebSocket auth disabled; admitting all connections as guests");
        Arc::new(StaticTokenVerifier::disabled())
    };

    let server = SignalServer::new(server_config, verifier);

    let app = websocket::create_router(&cfg.security.cors_origins).with_state(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started - WebSocket: /ws, Health: /health, Metrics: /metrics"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
