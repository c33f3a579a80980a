//! Payload types carried by signaling messages

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// ICE server descriptor handed to the peer connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// STUN/TURN URLs; a single string on the wire is accepted as one entry
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,

    /// TURN username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// TURN credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// Server without credentials, e.g. a public STUN server
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}

/// Contents of the `peerConnectionOptions` field of a `config` message
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConnectionOptions {
    /// Servers may send `{}` when no ICE servers are configured
    #[serde(rename = "iceServers", default)]
    pub ice_servers: Vec<IceServer>,
}

/// Kind of a session description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SdpKind {
    Offer,
    Answer,
    ProvisionalAnswer,
    Rollback,
    /// A kind this client does not understand, kept verbatim
    Unknown(String),
}

impl SdpKind {
    /// Parse a wire kind name. Never fails: unrecognized names become [`SdpKind::Unknown`].
    pub fn parse(kind: &str) -> Self {
        match kind {
            "offer" => SdpKind::Offer,
            "answer" => SdpKind::Answer,
            "prAnswer" | "pranswer" => SdpKind::ProvisionalAnswer,
            "rollback" => SdpKind::Rollback,
            other => SdpKind::Unknown(other.to_string()),
        }
    }

    /// Wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
            SdpKind::ProvisionalAnswer => "prAnswer",
            SdpKind::Rollback => "rollback",
            SdpKind::Unknown(kind) => kind,
        }
    }
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SdpKind {
    fn from(kind: &str) -> Self {
        SdpKind::parse(kind)
    }
}

impl Serialize for SdpKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SdpKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kind = String::deserialize(deserializer)?;
        Ok(SdpKind::parse(&kind))
    }
}

/// An SDP blob together with its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(kind: SdpKind, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }

    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpKind::Offer, sdp)
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpKind::Answer, sdp)
    }
}

/// A network path descriptor exchanged during connectivity establishment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    #[serde(rename = "sdpMid")]
    pub sdp_mid: String,

    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: u32,

    pub candidate: String,
}

impl IceCandidate {
    pub fn new(sdp_mid: impl Into<String>, sdp_m_line_index: u32, candidate: impl Into<String>) -> Self {
        Self {
            sdp_mid: sdp_mid.into(),
            sdp_m_line_index,
            candidate: candidate.into(),
        }
    }
}
