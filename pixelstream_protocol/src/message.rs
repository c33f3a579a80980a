//! Typed signaling messages

use crate::types::{IceCandidate, IceServer, SessionDescription};

/// A message received over the signaling channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMessage {
    /// Peer connection configuration dictated by the server
    Config { ice_servers: Vec<IceServer> },

    /// Remote SDP. When sent by this client it always goes out as an answer.
    SessionDescription(SessionDescription),

    /// ICE candidate, in either direction
    IceCandidate(IceCandidate),

    /// Number of players connected to the server
    PlayerCount { count: u32 },

    /// Streamers available for subscription
    StreamerList { ids: Vec<String> },
}

impl SignalingMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Config { .. } => "config",
            SignalingMessage::SessionDescription(_) => "sdp",
            SignalingMessage::IceCandidate(_) => "iceCandidate",
            SignalingMessage::PlayerCount { .. } => "playerCount",
            SignalingMessage::StreamerList { .. } => "streamerList",
        }
    }

    /// Whether this message takes part in offer/answer negotiation
    pub fn is_negotiation(&self) -> bool {
        matches!(
            self,
            SignalingMessage::Config { .. }
                | SignalingMessage::SessionDescription(_)
                | SignalingMessage::IceCandidate(_)
        )
    }
}

impl From<SessionDescription> for SignalingMessage {
    fn from(description: SessionDescription) -> Self {
        SignalingMessage::SessionDescription(description)
    }
}

impl From<IceCandidate> for SignalingMessage {
    fn from(candidate: IceCandidate) -> Self {
        SignalingMessage::IceCandidate(candidate)
    }
}

/// Control requests this client sends to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// Ask for the current streamer list
    ListStreamers,

    /// Subscribe to a streamer, which makes it send an offer
    Subscribe { streamer_id: String },
}

impl ClientRequest {
    pub fn subscribe(streamer_id: impl Into<String>) -> Self {
        ClientRequest::Subscribe {
            streamer_id: streamer_id.into(),
        }
    }
}
