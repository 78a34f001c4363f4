use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;
use crate::server::SignalServer;

/// Query parameters accepted on the WebSocket endpoint. Browsers cannot set
/// headers on a WebSocket handshake, so the token may ride in the URL.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket entry point. The bearer token is validated before the upgrade
/// completes: a refused connection never creates session state.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<SignalServer>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers).or(query.token.as_deref());

    let identity = match server.verifier().verify(token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(client_addr = %addr, error = %err, "Connection refused");
            server.metrics().increment_auth_rejections();
            return (StatusCode::UNAUTHORIZED, format!("Authentication error: {err}"))
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, server, addr, identity))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok-123"),
        );
        assert_eq!(bearer_token(&headers), Some("tok-123"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
