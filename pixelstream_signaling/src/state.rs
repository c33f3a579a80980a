//! Session state tracking
//!
//! The state is owned and mutated by the session task only. Observers see it
//! as [`SessionSnapshot`] values published after every handled event.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one signaling session in logs and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// State of the connection to the signaling server
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Progress of offer/answer negotiation. This client is always the answerer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    /// No peer connection yet
    #[default]
    Idle,
    /// Config applied, peer connection exists, waiting for an offer
    AwaitingRemoteDescription,
    /// Offer being applied and answer being generated
    AwaitingLocalOfferOrAnswer,
    /// Answer set locally and sent
    LocalDescriptionSet,
}

/// Point-in-time view of a session
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub connection: ConnectionState,
    pub negotiation: NegotiationState,
    pub local_candidate_count: u64,
    pub remote_candidate_count: u64,
    pub has_remote_description: bool,
    pub has_local_description: bool,
    /// Offers answered after the first one
    pub renegotiation_count: u32,
    pub subscribed_streamer: Option<String>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}

/// Mutable state of one session
#[derive(Debug, Default, Clone)]
pub(crate) struct SessionState {
    pub connection: ConnectionState,
    pub negotiation: NegotiationState,
    pub local_candidate_count: u64,
    pub remote_candidate_count: u64,
    pub has_remote_description: bool,
    pub has_local_description: bool,
    pub renegotiation_count: u32,
    pub subscribed_streamer: Option<String>,
}

impl SessionState {
    /// Back to a freshly created session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record that an offer is about to be answered
    pub fn begin_answer(&mut self) {
        if self.negotiation == NegotiationState::LocalDescriptionSet {
            self.renegotiation_count += 1;
        }
        self.negotiation = NegotiationState::AwaitingLocalOfferOrAnswer;
    }

    pub fn snapshot(&self, session_id: SessionId) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Some(session_id),
            connection: self.connection,
            negotiation: self.negotiation,
            local_candidate_count: self.local_candidate_count,
            remote_candidate_count: self.remote_candidate_count,
            has_remote_description: self.has_remote_description,
            has_local_description: self.has_local_description,
            renegotiation_count: self.renegotiation_count,
            subscribed_streamer: self.subscribed_streamer.clone(),
        }
    }
}
