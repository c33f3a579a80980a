//! Events flowing into and out of the session task

use crate::error::SignalingError;
use crate::peer::PeerConnectionState;
use crate::transport::Connection;
use pixelstream_protocol::{ClientRequest, IceCandidate, IceServer, SessionDescription};
use tokio::sync::mpsc;

/// Notifications delivered to the registered observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport to the signaling server is open
    Connected,

    /// Transport is gone and the session was reset
    Disconnected { reason: Option<String> },

    /// Peer connection created from the server's configuration
    Config { ice_servers: Vec<IceServer> },

    /// Description received from the remote party
    RemoteDescription(SessionDescription),

    /// Answer set locally and sent to the remote party
    LocalDescription(SessionDescription),

    /// Remote candidate applied to the peer connection
    RemoteCandidate(IceCandidate),

    /// Local candidate discovered and forwarded
    LocalCandidate(IceCandidate),

    /// Connection state reported by the peer connection engine
    PeerConnectionState(PeerConnectionState),

    PlayerCount(u32),

    StreamerList(Vec<String>),

    /// Subscription request sent for this streamer
    Subscribed(String),

    /// Something went wrong; the session keeps running
    Error(SignalingError),
}

/// Requests from the session handle
pub(crate) enum Command {
    Connect(String),
    Close,
    Send(SignalingOutput),
    Observe(mpsc::UnboundedSender<SessionEvent>),
    Shutdown,
}

/// Frames the handle can ask the session to write
pub(crate) enum SignalingOutput {
    Description(SessionDescription),
    Candidate(IceCandidate),
    Request(ClientRequest),
}

/// Events reported by an open transport
#[derive(Debug)]
pub(crate) enum TransportEvent {
    Message(String),
    Disconnected(Option<String>),
    Error(String),
}

/// Events reported by the peer connection engine
#[derive(Debug)]
pub(crate) enum PeerEvent {
    LocalCandidate(IceCandidate),
    ConnectionState(PeerConnectionState),
}

/// Result of applying an offer and producing an answer
pub(crate) struct AnswerOutcome {
    pub remote_applied: bool,
    pub answer: Result<SessionDescription, SignalingError>,
}

/// Everything the session task consumes, in arrival order
///
/// Asynchronous completions carry the epoch they were started in; the task
/// drops them if the session was closed or reset since. Peer events also
/// carry the generation of the peer connection that raised them, so a peer
/// replaced by a later `config` cannot report into the session.
pub(crate) enum Input {
    Command(Command),
    Connected {
        epoch: u64,
        result: Result<Box<dyn Connection>, SignalingError>,
    },
    Transport {
        epoch: u64,
        event: TransportEvent,
    },
    Peer {
        epoch: u64,
        generation: u64,
        event: PeerEvent,
    },
    AnswerReady {
        epoch: u64,
        outcome: AnswerOutcome,
    },
}
