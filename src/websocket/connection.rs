use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::sending::{send_immediate_server_message, send_server_message};
use crate::auth::Identity;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::{RegisterSessionError, SignalServer};

/// Outbound queue depth per connection. Signaling traffic is a handful of
/// frames per pairing, so a small buffer absorbs any relay burst.
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<SignalServer>,
    addr: SocketAddr,
    identity: Identity,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(OUTBOUND_QUEUE_CAPACITY);

    let session_id = match server.admit(identity, tx, addr) {
        Ok(session_id) => {
            tracing::info!(%session_id, client_addr = %addr, "WebSocket connection established");
            session_id
        }
        Err(err @ RegisterSessionError::IpLimitExceeded { .. }) => {
            let error_message = ServerMessage::Error {
                message: err.to_string(),
            };
            if let Err(send_err) = send_immediate_server_message(&mut sender, &error_message).await
            {
                tracing::debug!(
                    client_addr = %addr,
                    error = %send_err,
                    "Failed to send IP limit error frame"
                );
            }
            let _ = futures_util::SinkExt::close(&mut sender).await;
            return;
        }
    };

    // Outgoing: drain the session's queue onto the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_server_message(&mut sender, &message, &session_id)
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Incoming: parse frames and dispatch to the server.
    let server_clone = server.clone();
    let receive_task = tokio::spawn(async move {
        let max_size = server_clone.config().max_message_size;

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%session_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if text.len() > max_size {
                        tracing::warn!(
                            %session_id,
                            size = text.len(),
                            max = max_size,
                            "Message exceeds size limit"
                        );
                        server_clone.metrics().increment_oversized_frames();
                        server_clone.send_error_to_session(
                            &session_id,
                            format!(
                                "Message too large ({} bytes, max {} bytes)",
                                text.len(),
                                max_size
                            ),
                        );
                        continue;
                    }

                    let client_message: ClientMessage = match serde_json::from_str(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!(
                                %session_id,
                                error = %err,
                                "Rejected malformed client frame"
                            );
                            server_clone.metrics().increment_malformed_frames();
                            server_clone.send_error_to_session(
                                &session_id,
                                "Malformed message".to_string(),
                            );
                            continue;
                        }
                    };

                    server_clone.handle_client_message(&session_id, client_message);
                }
                Message::Close(_) => {
                    tracing::info!(%session_id, "WebSocket connection closed");
                    break;
                }
                // Binary frames carry no meaning in this protocol; ping/pong
                // is handled by axum.
                _ => {}
            }
        }

        // Cleanup when the receive side ends.
        server_clone.disconnect(&session_id);
    });

    tokio::select! {
        _ = send_task => {
            tracing::debug!(%session_id, "Send task completed");
        }
        _ = receive_task => {
            tracing::debug!(%session_id, "Receive task completed");
        }
    }

    // Ensure cleanup; disconnect is idempotent.
    server.disconnect(&session_id);
}
