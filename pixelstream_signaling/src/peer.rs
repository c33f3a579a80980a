//! Peer connection capability
//!
//! The session never talks to a WebRTC engine directly. Integrations
//! implement [`PeerConnectionFactory`] and [`PeerConnection`] on top of
//! whatever engine they use, and report engine-side events through the
//! [`PeerEvents`] handle passed at creation time.

use crate::error::SignalingError;
use crate::event::{AnswerOutcome, Input, PeerEvent};
use async_trait::async_trait;
use pixelstream_protocol::{IceCandidate, IceServer, SessionDescription};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// ICE connection state as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Negotiation operations of one peer connection
///
/// Methods take `&self` so that answer generation can run off the session
/// task while the session keeps its own handle.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), SignalingError>;

    async fn create_answer(&self) -> Result<SessionDescription, SignalingError>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), SignalingError>;

    async fn add_remote_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalingError>;

    /// Release engine resources. Called when the session resets.
    async fn close(&self) -> Result<(), SignalingError> {
        Ok(())
    }
}

/// Creates peer connections once the server has sent its configuration
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create_peer_connection(
        &self,
        ice_servers: &[IceServer],
        events: PeerEvents,
    ) -> Result<Arc<dyn PeerConnection>, SignalingError>;
}

/// Handle through which the engine reports local candidates and state changes
///
/// Events from a peer connection that was closed or replaced are ignored by
/// the session.
#[derive(Clone)]
pub struct PeerEvents {
    epoch: u64,
    generation: u64,
    inbox: mpsc::UnboundedSender<Input>,
}

impl PeerEvents {
    pub(crate) fn new(epoch: u64, generation: u64, inbox: mpsc::UnboundedSender<Input>) -> Self {
        Self {
            epoch,
            generation,
            inbox,
        }
    }

    /// A local ICE candidate was gathered. Call in discovery order.
    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.post(PeerEvent::LocalCandidate(candidate));
    }

    pub fn connection_state(&self, state: PeerConnectionState) {
        self.post(PeerEvent::ConnectionState(state));
    }

    fn post(&self, event: PeerEvent) {
        let input = Input::Peer {
            epoch: self.epoch,
            generation: self.generation,
            event,
        };
        if self.inbox.send(input).is_err() {
            trace!("session is gone, dropping peer event");
        }
    }
}

/// Apply a remote offer and produce the local answer
pub(crate) async fn answer_offer(peer: &dyn PeerConnection, offer: SessionDescription) -> AnswerOutcome {
    if let Err(err) = peer.set_remote_description(offer).await {
        return AnswerOutcome {
            remote_applied: false,
            answer: Err(err),
        };
    }

    AnswerOutcome {
        remote_applied: true,
        answer: create_local_answer(peer).await,
    }
}

async fn create_local_answer(peer: &dyn PeerConnection) -> Result<SessionDescription, SignalingError> {
    let answer = peer.create_answer().await?;
    peer.set_local_description(answer.clone()).await?;
    Ok(answer)
}
