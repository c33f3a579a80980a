//! Signaling message schema for Pixel Streaming style WebRTC sessions
//!
//! The signaling server and the client exchange JSON text frames over a
//! WebSocket. Every frame is an object whose `type` field selects the message:
//!
//! | type | fields | direction |
//! |---|---|---|
//! | `listStreamers` | | client → server |
//! | `subscribe` | `streamerId` | client → server |
//! | `config` | `peerConnectionOptions: { iceServers }` | server → client |
//! | `offer` | `sdp` | server → client |
//! | `answer` | `sdp` | client → server |
//! | `iceCandidate` | `candidate: { candidate, sdpMid, sdpMLineIndex }` | both |
//! | `playerCount` | `count` | server → client |
//! | `streamerList` | `ids` | server → client |
//!
//! The typed messages live in this crate unconditionally. The JSON codec is
//! behind the `json` feature:
//!
//! ```json
//! {"type":"offer","sdp":"v=0\r\n..."}
//! {"type":"iceCandidate","candidate":{"candidate":"candidate:1 1 UDP ...","sdpMid":"0","sdpMLineIndex":0}}
//! ```

#![forbid(unsafe_code)]

pub mod data_channel;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod message;
pub mod types;

pub use data_channel::{ToClientMessage, ToClientMessageType};
pub use error::{DataChannelError, DecodeError};
#[cfg(feature = "json")]
pub use json::{decode, encode};
pub use message::{ClientRequest, SignalingMessage};
pub use types::{IceCandidate, IceServer, PeerConnectionOptions, SdpKind, SessionDescription};
