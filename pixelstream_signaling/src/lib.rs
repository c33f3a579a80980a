//! Answer-only WebRTC signaling session for Pixel Streaming style servers
//!
//! A [`SignalingSession`] owns one connection to a signaling server and
//! drives offer/answer negotiation against an abstract peer connection
//! engine. The WebRTC engine itself is supplied by the application through
//! [`PeerConnectionFactory`] and [`PeerConnection`].
//!
//! # Protocol
//!
//! After the transport opens:
//!
//! 1. the server sends `config` with the ICE servers to use; the session
//!    creates the peer connection from it,
//! 2. the client sends `listStreamers`, the server replies with
//!    `streamerList`, and the client sends `subscribe` for one streamer
//!    (see [`SessionConfig::auto_subscribe`]),
//! 3. the streamer sends an `offer`; the session applies it, generates an
//!    answer and sends it back tagged `answer`,
//! 4. both sides trickle `iceCandidate` messages.
//!
//! SDP or candidates that arrive before `config` are dropped and reported as
//! [`SignalingError::PeerConnectionNotReady`]. Descriptions other than offers
//! are reported as [`SignalingError::NegotiationRoleViolation`] and never
//! answered.
//!
//! # Example
//!
//! ```ignore
//! let session = SignalingSession::with_websocket(Arc::new(MyEngine::new()), SessionConfig::default())?;
//! let mut events = session.events();
//! session.connect("ws://127.0.0.1:80");
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::PlayerCount(count) => println!("{count} players"),
//!         SessionEvent::Error(err) => eprintln!("signaling: {err}"),
//!         _ => {}
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod event;
mod handler;
pub mod peer;
pub mod session;
pub mod state;
pub mod transport;
pub mod websocket;

pub use config::SessionConfig;
pub use error::SignalingError;
pub use event::SessionEvent;
pub use peer::{PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvents};
pub use pixelstream_protocol as protocol;
pub use session::SignalingSession;
pub use state::{ConnectionState, NegotiationState, SessionId, SessionSnapshot};
pub use transport::{Connection, Connector, TransportEvents};
pub use websocket::WebSocketConnector;
