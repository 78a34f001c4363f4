use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::protocol::{ServerMessage, SessionId};

/// Serialize and send one server message as a text frame. Returns `Err` when
/// the connection is gone so the send task can wind down.
pub(super) async fn send_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    session_id: &SessionId,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(%session_id, "Failed to serialize message: {}", e);
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::warn!(%session_id, "Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}

/// Send one message on a socket that has no session yet (pre-admission
/// rejections).
pub(super) async fn send_immediate_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            r#"{"type":"error","data":{"message":"Internal error"}}"#.to_string()
        }
    };

    sender.send(Message::Text(payload.into())).await
}
