//! Session registry: admitted connections, their identities, and per-IP
//! accounting.
//!
//! The registry owns transport-facing state only (sender handle, identity,
//! address). Matchmaking state lives in the matchmaker so the two never
//! contend on the same lock.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::RegisterSessionError;
use crate::auth::Identity;
use crate::metrics::ServerMetrics;
use crate::protocol::{ServerMessage, SessionId};

#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    pub identity: Identity,
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub client_addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

pub(crate) struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
    connections_per_ip: DashMap<IpAddr, usize>,
    max_connections_per_ip: usize,
    metrics: Arc<ServerMetrics>,
}

impl SessionRegistry {
    pub fn new(max_connections_per_ip: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            sessions: DashMap::new(),
            connections_per_ip: DashMap::new(),
            max_connections_per_ip,
            metrics,
        }
    }

    /// Admit a validated connection and mint its session id.
    pub fn register(
        &self,
        identity: Identity,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<SessionId, RegisterSessionError> {
        let ip = client_addr.ip();
        if let Err(current) = self.try_reserve_ip_slot(ip) {
            warn!(
                %ip,
                current,
                max = self.max_connections_per_ip,
                "IP connection limit exceeded"
            );
            self.metrics.increment_ip_limit_rejections();
            return Err(RegisterSessionError::IpLimitExceeded {
                current,
                limit: self.max_connections_per_ip,
            });
        }

        let session_id = Uuid::new_v4();
        let handle = SessionHandle {
            identity,
            sender,
            client_addr,
            connected_at: Utc::now(),
        };

        info!(
            %session_id,
            user_id = %handle.identity.user_id,
            %client_addr,
            "Session registered"
        );
        self.sessions.insert(session_id, handle);
        self.metrics.increment_connections();

        Ok(session_id)
    }

    /// Remove a session. Idempotent: unknown ids are a no-op.
    pub fn unregister(&self, session_id: &SessionId) {
        let Some((_, handle)) = self.sessions.remove(session_id) else {
            return;
        };

        self.release_ip_slot(handle.client_addr.ip());
        self.metrics.decrement_connections();
        info!(
            %session_id,
            user_id = %handle.identity.user_id,
            session_secs = (Utc::now() - handle.connected_at).num_seconds(),
            "Session unregistered"
        );
    }

    /// Identity of an admitted session, if it is still connected.
    pub fn identity(&self, session_id: &SessionId) -> Option<Identity> {
        self.sessions
            .get(session_id)
            .map(|handle| handle.identity.clone())
    }

    /// Fire-and-forget delivery. A closed or saturated per-connection channel
    /// drops the message; the peer's own disconnect path cleans up state
    /// independently, so no retry is ever attempted.
    pub fn send(&self, session_id: &SessionId, message: Arc<ServerMessage>) {
        let Some(handle) = self.sessions.get(session_id) else {
            debug!(%session_id, "Dropping message for unknown session");
            self.metrics.increment_messages_dropped();
            return;
        };

        match handle.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%session_id, "Outbound channel full; dropping message");
                self.metrics.increment_messages_dropped();
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%session_id, "Outbound channel closed; dropping message");
                self.metrics.increment_messages_dropped();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<(), usize> {
        let mut entry = self.connections_per_ip.entry(ip).or_insert(0);
        if *entry >= self.max_connections_per_ip {
            return Err(*entry);
        }
        *entry += 1;
        Ok(())
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Some(mut entry) = self.connections_per_ip.get_mut(&ip) {
            *entry = entry.saturating_sub(1);
            if *entry == 0 {
                drop(entry);
                self.connections_per_ip.remove_if(&ip, |_, count| *count == 0);
            }
        }
    }
}
