use uuid::Uuid;

/// Unique identifier for one admitted WebSocket connection.
pub type SessionId = Uuid;

/// Stable identity from the identity provider. Not guaranteed unique across
/// concurrent sessions (the same user may reconnect in a second tab).
pub type UserId = String;

/// Logical channel label shared by two paired sessions. Derived from the two
/// session ids at pairing time; carries no state of its own.
pub type RoomId = String;

/// Derive the room label for a pairing. The initiator's session id comes
/// first so both sides receive the same label in the match notification.
pub fn room_id_for(initiator: &SessionId, responder: &SessionId) -> RoomId {
    format!("room_{initiator}_{responder}")
}

/// Intersection of two interest lists, case-sensitive exact match, ordered
/// from `own`'s perspective.
pub fn common_interests(own: &[String], other: &[String]) -> Vec<String> {
    own.iter()
        .filter(|interest| other.contains(interest))
        .cloned()
        .collect()
}
