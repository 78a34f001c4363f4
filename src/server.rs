//! Server orchestration: wires the session registry, matchmaking queue, and
//! signaling relay together behind one shared handle.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::auth::{Identity, IdentityVerifier};
use crate::metrics::ServerMetrics;
use crate::protocol::{ClientMessage, ServerMessage, SessionId};

mod matchmaker;
mod registry;
mod relay;

pub use matchmaker::{Delivery, Matchmaker, SessionState, TerminateReason};
use registry::SessionRegistry;

/// Runtime server configuration, derived from the loaded [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Informational text for the `waiting` event.
    pub searching_message: String,
    /// Maximum inbound WebSocket text frame size in bytes.
    pub max_message_size: usize,
    /// Maximum concurrent connections per IP address.
    pub max_connections_per_ip: usize,
    /// Require a bearer token on the metrics endpoint.
    pub require_metrics_auth: bool,
    /// Token accepted by the metrics endpoint when auth is required.
    pub metrics_auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            searching_message: "Searching for someone to talk to...".to_string(),
            max_message_size: 65536,
            max_connections_per_ip: 10,
            require_metrics_auth: false,
            metrics_auth_token: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegisterSessionError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// The matchmaking and signaling server.
pub struct SignalServer {
    config: ServerConfig,
    registry: SessionRegistry,
    matchmaker: Matchmaker,
    metrics: Arc<ServerMetrics>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl SignalServer {
    pub fn new(config: ServerConfig, verifier: Arc<dyn IdentityVerifier>) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let registry = SessionRegistry::new(config.max_connections_per_ip, metrics.clone());
        let matchmaker = Matchmaker::new(config.searching_message.clone(), metrics.clone());

        Arc::new(Self {
            config,
            registry,
            matchmaker,
            metrics,
            verifier,
        })
    }

    /// Admit a validated connection: create its session record and return
    /// the minted session id. Fails when the client's IP is over its
    /// connection budget, in which case no session state is created.
    pub fn admit(
        &self,
        identity: Identity,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<SessionId, RegisterSessionError> {
        self.registry.register(identity, sender, client_addr)
    }

    /// Dispatch one inbound event from an admitted session.
    pub fn handle_client_message(&self, session_id: &SessionId, message: ClientMessage) {
        match message {
            ClientMessage::FindMatch { interests } => self.handle_find_match(session_id, interests),
            ClientMessage::Skip => self.handle_skip(session_id),
            relayable => self.relay_to_peer(session_id, relayable),
        }
    }

    /// Connection teardown: unwind matchmaking state, notify the peer, and
    /// remove the session. Safe to call multiple times.
    pub fn disconnect(&self, session_id: &SessionId) {
        if !self.registry.contains(session_id) {
            return;
        }

        info!(%session_id, "Session disconnected");
        // Unregister before unwinding matchmaking state. A racing
        // `handle_find_match` re-checks registration after it enqueues: once
        // the session is out of the registry it either reaps its own entry or
        // the terminate below does, so no entry can outlive the session.
        self.registry.unregister(session_id);
        let deliveries = self
            .matchmaker
            .terminate(*session_id, TerminateReason::Disconnect);
        self.deliver(deliveries);
    }

    /// Process liveness for the health endpoint. All state is in-memory, so
    /// a responsive process is a healthy one.
    pub fn health_check(&self) -> bool {
        true
    }

    /// Send a non-fatal error frame to one session.
    pub fn send_error_to_session(&self, session_id: &SessionId, message: String) {
        self.registry
            .send(session_id, Arc::new(ServerMessage::Error { message }));
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    pub fn verifier(&self) -> &Arc<dyn IdentityVerifier> {
        &self.verifier
    }

    /// Derived matchmaking state of a session.
    pub fn session_state(&self, session_id: &SessionId) -> SessionState {
        self.matchmaker.state_of(*session_id)
    }

    /// Current peer of a session, if paired.
    pub fn peer_of(&self, session_id: &SessionId) -> Option<SessionId> {
        self.matchmaker.peer_of(*session_id)
    }

    pub fn connected_sessions(&self) -> usize {
        self.registry.len()
    }

    pub fn waiting_depth(&self) -> usize {
        self.matchmaker.waiting_depth()
    }

    pub fn pairing_count(&self) -> usize {
        self.matchmaker.pairing_count()
    }

    fn handle_find_match(&self, session_id: &SessionId, interests: Vec<String>) {
        // Identity lives in the registry, not on the transport object, so the
        // matchmaker receives it explicitly.
        let Some(identity) = self.registry.identity(session_id) else {
            debug!(%session_id, "find_match from unknown session; ignoring");
            return;
        };

        debug!(
            %session_id,
            user_id = %identity.user_id,
            ?interests,
            "Session searching for a match"
        );
        let deliveries = self
            .matchmaker
            .request_match(*session_id, &identity.user_id, interests);
        self.deliver(deliveries);

        // A disconnect can fully complete between the identity lookup above
        // and the queue insertion; its cleanup has already run by then, so
        // reap the fresh entry here or it would wait forever. A paired peer
        // is notified through the normal teardown path.
        if !self.registry.contains(session_id) {
            let deliveries = self
                .matchmaker
                .terminate(*session_id, TerminateReason::Disconnect);
            self.deliver(deliveries);
        }
    }

    fn handle_skip(&self, session_id: &SessionId) {
        debug!(%session_id, "Session skipped its pairing");
        let deliveries = self.matchmaker.terminate(*session_id, TerminateReason::Skip);
        self.deliver(deliveries);
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.registry.send(&delivery.to, Arc::new(delivery.message));
        }
    }
}
