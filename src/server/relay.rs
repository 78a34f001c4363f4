//! Signaling relay: forwards opaque handshake and chat frames between the
//! two sides of a pairing.

use tracing::debug;

use super::SignalServer;
use crate::protocol::{ClientMessage, ServerMessage, SessionId};
use std::sync::Arc;

impl SignalServer {
    /// Forward a relayable frame to the sender's current peer.
    ///
    /// Payloads pass through verbatim; the server never inspects SDP or ICE
    /// contents. A sender with no peer is an expected race (skip/disconnect
    /// in flight), so the frame is dropped silently rather than surfaced as
    /// an error.
    pub(super) fn relay_to_peer(&self, session_id: &SessionId, message: ClientMessage) {
        let Some(peer) = self.matchmaker.peer_of(*session_id) else {
            debug!(%session_id, "Relay frame from unpaired session; dropping");
            self.metrics.increment_unpaired_relay_drops();
            return;
        };

        let outbound = match message {
            ClientMessage::Offer { offer } => ServerMessage::Offer { offer },
            ClientMessage::Answer { answer } => ServerMessage::Answer { answer },
            ClientMessage::IceCandidate { candidate } => ServerMessage::IceCandidate { candidate },
            ClientMessage::SendMessage { text } => {
                self.metrics.increment_chat_messages_relayed();
                ServerMessage::ReceiveMessage { text }
            }
            // FindMatch and Skip are dispatched before reaching the relay.
            other => {
                debug!(%session_id, ?other, "Non-relayable message reached the relay; dropping");
                return;
            }
        };

        self.metrics.increment_frames_relayed();
        self.registry.send(&peer, Arc::new(outbound));
    }
}
