use serde::{Deserialize, Serialize};

use super::types::{RoomId, UserId};

/// Message types sent from client to server.
///
/// SDP and ICE payloads are opaque to the server: they are relayed verbatim
/// to the current peer and never inspected, so they are carried as raw JSON
/// values rather than typed structures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter matchmaking with the given interest tags (may be empty).
    /// Idempotent while already searching.
    FindMatch { interests: Vec<String> },
    /// Leave the current pairing and let the peer know. The client is
    /// expected to follow up with a fresh `FindMatch`.
    Skip,
    /// WebRTC session offer for the current peer.
    Offer { offer: serde_json::Value },
    /// WebRTC session answer for the current peer.
    Answer { answer: serde_json::Value },
    /// ICE candidate for the current peer.
    #[serde(rename = "ice-candidate")]
    IceCandidate { candidate: serde_json::Value },
    /// Text chat line for the current peer.
    SendMessage { text: String },
}

/// Payload for the MatchFound server message.
///
/// Field names are camelCase on the wire for client compatibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchFoundPayload {
    /// Shared label for the pairing, identical on both sides.
    pub room_id: RoomId,
    /// The peer's user id (not its session id).
    pub peer_uid: UserId,
    /// Interest tags both sides declared, ordered from the recipient's
    /// perspective.
    pub common_interests: Vec<String>,
    /// Exactly one side of every pairing receives `true` and must originate
    /// the WebRTC offer.
    pub is_initiator: bool,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// No candidate available yet; the session is enqueued.
    Waiting { message: String },
    /// A pairing was established.
    MatchFound(MatchFoundPayload),
    /// Relayed WebRTC offer from the peer.
    Offer { offer: serde_json::Value },
    /// Relayed WebRTC answer from the peer.
    Answer { answer: serde_json::Value },
    /// Relayed ICE candidate from the peer.
    #[serde(rename = "ice-candidate")]
    IceCandidate { candidate: serde_json::Value },
    /// Relayed chat line from the peer.
    ReceiveMessage { text: String },
    /// The peer skipped or its connection dropped; the pairing is gone.
    PeerDisconnected,
    /// Non-fatal protocol or limit violation on this connection.
    Error { message: String },
}
