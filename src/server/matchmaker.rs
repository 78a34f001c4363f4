//! Matchmaking queue and pairing table.
//!
//! All matchmaking state lives behind one mutex so the scan-then-mutate
//! sequence of a match request is atomic: no concurrent request or
//! termination can observe the queue between candidate selection and the
//! pair/enqueue decision. Every operation is in-memory and bounded, so the
//! coarse lock is held only for microseconds and never across an `await`.
//!
//! Operations return the messages to deliver instead of sending them, so
//! delivery (which may touch per-connection channels) happens outside the
//! lock.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::metrics::ServerMetrics;
use crate::protocol::{
    common_interests, room_id_for, MatchFoundPayload, ServerMessage, SessionId, UserId,
};

/// Where a session currently stands in the matchmaking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Waiting,
    Paired,
}

/// Why a session is being torn down. Skip and disconnect are identical at
/// the state level; the reason only feeds logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReason {
    Skip,
    Disconnect,
}

/// A message the matchmaker wants delivered to a session. Delivery is
/// fire-and-forget and happens after the matchmaking lock is released.
#[derive(Debug)]
pub struct Delivery {
    pub to: SessionId,
    pub message: ServerMessage,
}

/// One session waiting in the queue, in insertion order.
#[derive(Debug, Clone)]
struct Waiter {
    session_id: SessionId,
    user_id: UserId,
    interests: Vec<String>,
    enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MatchState {
    /// Sessions in `Waiting` state, insertion order preserved.
    waiting: VecDeque<Waiter>,
    /// Symmetric pairing table: if `a -> b` exists then `b -> a` exists.
    pairs: HashMap<SessionId, SessionId>,
}

/// The matchmaking queue, pairing table, and pairing algorithm.
pub struct Matchmaker {
    state: Mutex<MatchState>,
    searching_message: String,
    metrics: Arc<ServerMetrics>,
}

impl Matchmaker {
    pub fn new(searching_message: String, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            state: Mutex::new(MatchState::default()),
            searching_message,
            metrics,
        }
    }

    /// Handle a match request from `session_id` owned by `user_id`.
    ///
    /// Selection policy: first waiting session (insertion order) with a
    /// different user and at least one shared interest; otherwise the first
    /// waiting session with a different user regardless of interests;
    /// otherwise enqueue. First-match, not best-match.
    ///
    /// Duplicate requests from a session that is already waiting are ignored,
    /// as are requests from a session that is still paired (the client must
    /// skip first).
    pub fn request_match(
        &self,
        session_id: SessionId,
        user_id: &UserId,
        interests: Vec<String>,
    ) -> Vec<Delivery> {
        let mut state = self.lock_state();

        if state.waiting.iter().any(|w| w.session_id == session_id) {
            debug!(%session_id, "Duplicate match request while already searching; ignoring");
            return Vec::new();
        }
        if state.pairs.contains_key(&session_id) {
            debug!(%session_id, "Match request while still paired; ignoring");
            return Vec::new();
        }

        let requester = Waiter {
            session_id,
            user_id: user_id.clone(),
            interests,
            enqueued_at: Utc::now(),
        };

        // Interest-overlap first, then any non-self waiter. Both scans run in
        // insertion order and stop at the first hit.
        let interest_hit = state.waiting.iter().position(|candidate| {
            candidate.user_id != requester.user_id
                && candidate
                    .interests
                    .iter()
                    .any(|interest| requester.interests.contains(interest))
        });
        let fallback_hit = if interest_hit.is_none() {
            state
                .waiting
                .iter()
                .position(|candidate| candidate.user_id != requester.user_id)
        } else {
            None
        };

        let deliveries = match interest_hit.or(fallback_hit) {
            // The scan position is in bounds by construction, but the queue
            // API returns Option anyway so handle it without panicking.
            Some(index) => match state.waiting.remove(index) {
                Some(candidate) => {
                    self.metrics.record_match(interest_hit.is_some());
                    self.pair(&mut state, requester, candidate)
                }
                None => {
                    warn!(%session_id, index, "Waiting queue candidate vanished; enqueuing instead");
                    self.enqueue(&mut state, requester)
                }
            },
            None => self.enqueue(&mut state, requester),
        };

        self.refresh_gauges(&state);
        deliveries
    }

    /// Tear down whatever matchmaking state `session_id` holds: its queue
    /// slot, its pairing (notifying the peer exactly once), and its record.
    /// Idempotent; unknown sessions are a no-op.
    pub fn terminate(&self, session_id: SessionId, reason: TerminateReason) -> Vec<Delivery> {
        let mut state = self.lock_state();

        state.waiting.retain(|w| w.session_id != session_id);

        let mut deliveries = Vec::new();
        if let Some(peer) = state.pairs.remove(&session_id) {
            let reverse = state.pairs.remove(&peer);
            debug_assert_eq!(
                reverse,
                Some(session_id),
                "pairing table must be symmetric"
            );
            if reverse != Some(session_id) {
                warn!(%session_id, %peer, "One-sided pairing entry found during teardown");
            }
            info!(%session_id, %peer, ?reason, "Pairing dissolved");
            deliveries.push(Delivery {
                to: peer,
                message: ServerMessage::PeerDisconnected,
            });
        }

        if reason == TerminateReason::Skip {
            self.metrics.increment_skips();
        }

        self.refresh_gauges(&state);
        deliveries
    }

    /// Current peer for relay routing, if the session is paired.
    ///
    /// A one-sided table entry is a programming defect; it trips an assertion
    /// in development and is self-healed here by treating it as "no peer."
    pub fn peer_of(&self, session_id: SessionId) -> Option<SessionId> {
        let mut state = self.lock_state();
        let peer = *state.pairs.get(&session_id)?;

        let reverse = state.pairs.get(&peer).copied();
        debug_assert_eq!(reverse, Some(session_id), "pairing table must be symmetric");
        if reverse != Some(session_id) {
            warn!(%session_id, %peer, "One-sided pairing entry; dropping it");
            state.pairs.remove(&session_id);
            return None;
        }

        Some(peer)
    }

    /// Derived state of a session, for diagnostics and tests.
    pub fn state_of(&self, session_id: SessionId) -> SessionState {
        let state = self.lock_state();
        if state.pairs.contains_key(&session_id) {
            SessionState::Paired
        } else if state.waiting.iter().any(|w| w.session_id == session_id) {
            SessionState::Waiting
        } else {
            SessionState::Idle
        }
    }

    /// Number of sessions currently searching.
    pub fn waiting_depth(&self) -> usize {
        self.lock_state().waiting.len()
    }

    /// Number of active pairings (each pairing counted once).
    pub fn pairing_count(&self) -> usize {
        self.lock_state().pairs.len() / 2
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MatchState> {
        match self.state.lock() {
            Ok(guard) => guard,
            // No code path panics while holding the lock; if one ever does,
            // the state is still consistent because every mutation completes
            // before the guard drops.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn enqueue(&self, state: &mut MatchState, requester: Waiter) -> Vec<Delivery> {
        let session_id = requester.session_id;
        debug!(
            %session_id,
            user_id = %requester.user_id,
            interests = ?requester.interests,
            enqueued_at = %requester.enqueued_at,
            depth = state.waiting.len() + 1,
            "No candidate available; enqueued"
        );
        state.waiting.push_back(requester);

        vec![Delivery {
            to: session_id,
            message: ServerMessage::Waiting {
                message: self.searching_message.clone(),
            },
        }]
    }

    /// Record the pairing and build both match notifications. The requester
    /// triggered the pairing and is therefore the initiator; exactly one side
    /// of every pairing carries `is_initiator = true`.
    fn pair(&self, state: &mut MatchState, requester: Waiter, candidate: Waiter) -> Vec<Delivery> {
        let room_id = room_id_for(&requester.session_id, &candidate.session_id);
        info!(
            initiator = %requester.session_id,
            responder = %candidate.session_id,
            %room_id,
            "Matched sessions"
        );

        state
            .pairs
            .insert(requester.session_id, candidate.session_id);
        state
            .pairs
            .insert(candidate.session_id, requester.session_id);

        vec![
            Delivery {
                to: requester.session_id,
                message: ServerMessage::MatchFound(MatchFoundPayload {
                    room_id: room_id.clone(),
                    peer_uid: candidate.user_id.clone(),
                    common_interests: common_interests(&requester.interests, &candidate.interests),
                    is_initiator: true,
                }),
            },
            Delivery {
                to: candidate.session_id,
                message: ServerMessage::MatchFound(MatchFoundPayload {
                    room_id,
                    peer_uid: requester.user_id,
                    common_interests: common_interests(&candidate.interests, &requester.interests),
                    is_initiator: false,
                }),
            },
        ]
    }

    fn refresh_gauges(&self, state: &MatchState) {
        self.metrics
            .set_sessions_waiting(state.waiting.len() as u64);
        self.metrics
            .set_active_pairings((state.pairs.len() / 2) as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn matchmaker() -> Matchmaker {
        Matchmaker::new(
            "Searching for someone to talk to...".to_string(),
            Arc::new(ServerMetrics::new()),
        )
    }

    fn interests(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| (*t).to_string()).collect()
    }

    fn match_payload(deliveries: &[Delivery], to: SessionId) -> MatchFoundPayload {
        deliveries
            .iter()
            .find_map(|d| match (&d.message, d.to) {
                (ServerMessage::MatchFound(payload), recipient) if recipient == to => {
                    Some(payload.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("no MatchFound delivered to {to}"))
    }

    #[test]
    fn test_first_request_enqueues_with_waiting_signal() {
        let mm = matchmaker();
        let a = Uuid::new_v4();

        let deliveries = mm.request_match(a, &"user-a".to_string(), interests(&["music"]));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, a);
        assert!(matches!(
            deliveries[0].message,
            ServerMessage::Waiting { .. }
        ));
        assert_eq!(mm.state_of(a), SessionState::Waiting);
        assert_eq!(mm.waiting_depth(), 1);
    }

    #[test]
    fn test_duplicate_request_is_idempotent() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let user = "user-a".to_string();

        mm.request_match(a, &user, interests(&["music"]));
        let second = mm.request_match(a, &user, interests(&["film"]));
        assert!(second.is_empty());
        assert_eq!(mm.waiting_depth(), 1);
    }

    #[test]
    fn test_pairing_by_shared_interest() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["music", "rust"]));
        let deliveries = mm.request_match(b, &"user-b".to_string(), interests(&["rust"]));

        let to_b = match_payload(&deliveries, b);
        let to_a = match_payload(&deliveries, a);
        assert_eq!(to_b.peer_uid, "user-a");
        assert_eq!(to_a.peer_uid, "user-b");
        assert_eq!(to_b.common_interests, vec!["rust"]);
        assert_eq!(to_a.common_interests, vec!["rust"]);
        assert_eq!(to_a.room_id, to_b.room_id);

        assert_eq!(mm.state_of(a), SessionState::Paired);
        assert_eq!(mm.state_of(b), SessionState::Paired);
        assert_eq!(mm.waiting_depth(), 0);
        assert_eq!(mm.pairing_count(), 1);
        assert_eq!(mm.peer_of(a), Some(b));
        assert_eq!(mm.peer_of(b), Some(a));
    }

    #[test]
    fn test_exactly_one_initiator_per_pairing() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["x"]));
        let deliveries = mm.request_match(b, &"user-b".to_string(), interests(&["x"]));

        let to_a = match_payload(&deliveries, a);
        let to_b = match_payload(&deliveries, b);
        // The requester that triggered the pairing originates the offer.
        assert!(to_b.is_initiator);
        assert!(!to_a.is_initiator);
    }

    #[test]
    fn test_interest_match_beats_queue_order() {
        let mm = matchmaker();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let newcomer = Uuid::new_v4();

        // Both waiters belong to the same user (two tabs), so they cannot
        // pair with each other and coexist in the queue.
        let shared_user = "user-w".to_string();
        mm.request_match(w1, &shared_user, interests(&["a"]));
        mm.request_match(w2, &shared_user, interests(&["b"]));
        assert_eq!(mm.waiting_depth(), 2);

        let deliveries = mm.request_match(newcomer, &"user-n".to_string(), interests(&["b"]));
        let payload = match_payload(&deliveries, newcomer);
        assert_eq!(mm.peer_of(newcomer), Some(w2));
        assert_eq!(payload.common_interests, vec!["b"]);

        // W1 arrived first but shares no interest; it keeps waiting.
        assert_eq!(mm.state_of(w1), SessionState::Waiting);
    }

    #[test]
    fn test_fallback_pairs_without_common_interest() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), Vec::new());
        let deliveries = mm.request_match(b, &"user-b".to_string(), interests(&["x"]));

        let to_b = match_payload(&deliveries, b);
        assert!(to_b.common_interests.is_empty());
        assert_eq!(mm.peer_of(b), Some(a));
    }

    #[test]
    fn test_same_user_never_pairs_with_itself() {
        let mm = matchmaker();
        let first_tab = Uuid::new_v4();
        let second_tab = Uuid::new_v4();
        let user = "user-a".to_string();

        mm.request_match(first_tab, &user, interests(&["music"]));
        let deliveries = mm.request_match(second_tab, &user, interests(&["music"]));

        assert_eq!(deliveries.len(), 1);
        assert!(matches!(
            deliveries[0].message,
            ServerMessage::Waiting { .. }
        ));
        assert_eq!(mm.waiting_depth(), 2);
        assert_eq!(mm.pairing_count(), 0);
    }

    #[test]
    fn test_scan_vs_fallback_trace() {
        // A([a]), B([b]), C([a]) request in order. A waits; B shares nothing
        // with A but falls back to it (forward progress beats strict interest
        // matching); C then waits alone.
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let first = mm.request_match(a, &"user-a".to_string(), interests(&["a"]));
        assert!(matches!(first[0].message, ServerMessage::Waiting { .. }));

        let second = mm.request_match(b, &"user-b".to_string(), interests(&["b"]));
        let to_b = match_payload(&second, b);
        assert!(to_b.common_interests.is_empty());
        assert_eq!(mm.peer_of(b), Some(a));

        let third = mm.request_match(c, &"user-c".to_string(), interests(&["a"]));
        assert!(matches!(third[0].message, ServerMessage::Waiting { .. }));
        assert_eq!(mm.state_of(c), SessionState::Waiting);
        assert_eq!(mm.waiting_depth(), 1);
    }

    #[test]
    fn test_terminate_waiting_session_clears_queue() {
        let mm = matchmaker();
        let a = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["x"]));
        let deliveries = mm.terminate(a, TerminateReason::Disconnect);
        assert!(deliveries.is_empty());
        assert_eq!(mm.waiting_depth(), 0);
        assert_eq!(mm.state_of(a), SessionState::Idle);
    }

    #[test]
    fn test_terminate_paired_session_notifies_peer_once() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["x"]));
        mm.request_match(b, &"user-b".to_string(), interests(&["x"]));

        let deliveries = mm.terminate(a, TerminateReason::Skip);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, b);
        assert!(matches!(
            deliveries[0].message,
            ServerMessage::PeerDisconnected
        ));

        // Peer drops back to Idle; no auto-requeue.
        assert_eq!(mm.state_of(b), SessionState::Idle);
        assert_eq!(mm.pairing_count(), 0);
        assert_eq!(mm.peer_of(a), None);
        assert_eq!(mm.peer_of(b), None);

        // Termination is idempotent.
        assert!(mm.terminate(a, TerminateReason::Disconnect).is_empty());
    }

    #[test]
    fn test_terminate_unknown_session_is_noop() {
        let mm = matchmaker();
        assert!(mm
            .terminate(Uuid::new_v4(), TerminateReason::Disconnect)
            .is_empty());
    }

    #[test]
    fn test_request_while_paired_is_ignored() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["x"]));
        mm.request_match(b, &"user-b".to_string(), interests(&["x"]));
        mm.request_match(c, &"user-c".to_string(), interests(&["x"]));
        assert_eq!(mm.state_of(c), SessionState::Waiting);

        // B is paired with A; a stray find_match must not steal C.
        let deliveries = mm.request_match(b, &"user-b".to_string(), interests(&["x"]));
        assert!(deliveries.is_empty());
        assert_eq!(mm.peer_of(b), Some(a));
        assert_eq!(mm.state_of(c), SessionState::Waiting);
    }

    #[test]
    fn test_skip_then_search_again_pairs_with_next_waiter() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        mm.request_match(a, &"user-a".to_string(), interests(&["x"]));
        mm.request_match(b, &"user-b".to_string(), interests(&["x"]));
        mm.request_match(c, &"user-c".to_string(), interests(&["x"]));

        mm.terminate(b, TerminateReason::Skip);
        let deliveries = mm.request_match(b, &"user-b".to_string(), interests(&["x"]));
        let payload = match_payload(&deliveries, b);
        assert_eq!(payload.peer_uid, "user-c");
        assert_eq!(mm.peer_of(b), Some(c));

        // A was left idle by the skip and stays idle until it searches again.
        assert_eq!(mm.state_of(a), SessionState::Idle);
    }

    #[test]
    fn test_common_interests_ordered_per_recipient() {
        let mm = matchmaker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        mm.request_match(
            a,
            &"user-a".to_string(),
            interests(&["film", "music", "rust"]),
        );
        let deliveries = mm.request_match(
            b,
            &"user-b".to_string(),
            interests(&["rust", "hiking", "film"]),
        );

        assert_eq!(
            match_payload(&deliveries, b).common_interests,
            vec!["rust", "film"]
        );
        assert_eq!(
            match_payload(&deliveries, a).common_interests,
            vec!["film", "rust"]
        );
    }
}
