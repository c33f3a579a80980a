//! Error types for the signaling session

use pixelstream_protocol::{DecodeError, SdpKind};
use thiserror::Error;

/// Errors reported by a signaling session
///
/// None of these are fatal: the offending frame or request is dropped, the
/// error is delivered to the registered observer and the session keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Frame with a missing or unrecognized `type`
    #[error("Unknown message type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnknownMessageType(Option<String>),

    /// Frame of a known type with missing or wrong-shaped fields
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Connecting to the signaling server failed or timed out
    #[error("Transport unreachable: {0}")]
    TransportUnreachable(String),

    /// Tried to send without an open transport
    #[error("Not connected")]
    NotConnected,

    /// The transport went away
    #[error("Transport disconnected{}", .0.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    TransportDisconnected(Option<String>),

    /// Error reported by an open transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// SDP or candidate received before a `config` message
    #[error("Peer connection not ready")]
    PeerConnectionNotReady,

    /// A non-offer description was received; this client only answers
    #[error("Negotiation role violation: received {0}, only offers are answered")]
    NegotiationRoleViolation(SdpKind),

    /// The peer connection engine rejected an operation
    #[error("Peer connection error: {0}")]
    PeerConnection(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SignalingError {
    /// Check if this error came from decoding a frame
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SignalingError::UnknownMessageType(_) | SignalingError::MalformedPayload(_)
        )
    }

    /// Check if this error concerns the connection to the signaling server
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            SignalingError::TransportUnreachable(_)
                | SignalingError::NotConnected
                | SignalingError::TransportDisconnected(_)
                | SignalingError::Transport(_)
        )
    }

    /// Check if this error only flags unexpected but harmless peer behaviour
    pub fn is_advisory(&self) -> bool {
        matches!(self, SignalingError::NegotiationRoleViolation(_))
    }
}

impl From<DecodeError> for SignalingError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownMessageType(kind) => SignalingError::UnknownMessageType(kind),
            DecodeError::MalformedPayload(reason) => SignalingError::MalformedPayload(reason),
        }
    }
}
