use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handler::websocket_handler;
use crate::server::SignalServer;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<SignalServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Health check endpoint. Reports process liveness only; it carries no
/// matchmaking state.
async fn health_handler(State(server): State<Arc<SignalServer>>) -> Response {
    if server.health_check() {
        Json(HealthStatus {
            status: "up",
            timestamp: chrono::Utc::now(),
        })
        .into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    token: Option<String>,
}

/// Metrics endpoint: JSON snapshot of the server counters, optionally behind
/// a shared bearer token.
pub async fn metrics_handler(
    State(server): State<Arc<SignalServer>>,
    Query(query): Query<MetricsQuery>,
    headers: HeaderMap,
) -> Response {
    if server.config().require_metrics_auth {
        let expected = server.config().metrics_auth_token.as_deref();
        let presented = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .or(query.token.as_deref());

        let authorized = matches!(
            (expected, presented),
            (Some(e), Some(p)) if crate::auth::tokens_match(e, p)
        );
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    Json(server.metrics().snapshot()).into_response()
}
