use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the in-memory matchmaking and relay pipeline.
///
/// Everything here is monotonic or a simple gauge; relaxed ordering is
/// sufficient because no counter participates in cross-thread control flow.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub auth_rejections: AtomicU64,
    pub ip_limit_rejections: AtomicU64,

    // Matchmaking metrics
    pub sessions_waiting: AtomicU64,
    pub active_pairings: AtomicU64,
    pub matches_made: AtomicU64,
    pub interest_matches: AtomicU64,
    pub fallback_matches: AtomicU64,
    pub skips: AtomicU64,

    // Relay metrics
    pub frames_relayed: AtomicU64,
    pub chat_messages_relayed: AtomicU64,
    pub unpaired_relay_drops: AtomicU64,

    // Delivery and protocol hygiene metrics
    pub messages_dropped: AtomicU64,
    pub oversized_frames_rejected: AtomicU64,
    pub malformed_frames_rejected: AtomicU64,
}

/// Point-in-time view of [`ServerMetrics`] rendered by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub auth_rejections: u64,
    pub ip_limit_rejections: u64,
    pub sessions_waiting: u64,
    pub active_pairings: u64,
    pub matches_made: u64,
    pub interest_matches: u64,
    pub fallback_matches: u64,
    pub skips: u64,
    pub frames_relayed: u64,
    pub chat_messages_relayed: u64,
    pub unpaired_relay_drops: u64,
    pub messages_dropped: u64,
    pub oversized_frames_rejected: u64,
    pub malformed_frames_rejected: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_connections(&self) {
        self.disconnections.fetch_add(1, Ordering::Relaxed);
        let mut current = self.active_connections.load(Ordering::Relaxed);
        while current > 0 {
            match self.active_connections.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn increment_auth_rejections(&self) {
        self.auth_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ip_limit_rejections(&self) {
        self.ip_limit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_sessions_waiting(&self, depth: u64) {
        self.sessions_waiting.store(depth, Ordering::Relaxed);
    }

    pub fn set_active_pairings(&self, pairings: u64) {
        self.active_pairings.store(pairings, Ordering::Relaxed);
    }

    pub fn record_match(&self, interest_based: bool) {
        self.matches_made.fetch_add(1, Ordering::Relaxed);
        if interest_based {
            self.interest_matches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fallback_matches.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_skips(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chat_messages_relayed(&self) {
        self.chat_messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unpaired_relay_drops(&self) {
        self.unpaired_relay_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_oversized_frames(&self) {
        self.oversized_frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_frames(&self) {
        self.malformed_frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            disconnections: self.disconnections.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            ip_limit_rejections: self.ip_limit_rejections.load(Ordering::Relaxed),
            sessions_waiting: self.sessions_waiting.load(Ordering::Relaxed),
            active_pairings: self.active_pairings.load(Ordering::Relaxed),
            matches_made: self.matches_made.load(Ordering::Relaxed),
            interest_matches: self.interest_matches.load(Ordering::Relaxed),
            fallback_matches: self.fallback_matches.load(Ordering::Relaxed),
            skips: self.skips.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            chat_messages_relayed: self.chat_messages_relayed.load(Ordering::Relaxed),
            unpaired_relay_drops: self.unpaired_relay_drops.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            oversized_frames_rejected: self.oversized_frames_rejected.load(Ordering::Relaxed),
            malformed_frames_rejected: self.malformed_frames_rejected.load(Ordering::Relaxed),
        }
    }
}
