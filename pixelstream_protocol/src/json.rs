//! JSON codec for signaling frames

use crate::error::DecodeError;
use crate::message::{ClientRequest, SignalingMessage};
use crate::types::{IceCandidate, IceServer, PeerConnectionOptions, SdpKind, SessionDescription};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Deserialize)]
struct ConfigPayload {
    #[serde(rename = "peerConnectionOptions")]
    options: PeerConnectionOptions,
}

#[derive(Deserialize)]
struct SdpPayload {
    sdp: String,
}

#[derive(Deserialize)]
struct RollbackPayload {
    #[serde(default)]
    sdp: String,
}

#[derive(Deserialize)]
struct CandidatePayload {
    candidate: IceCandidate,
}

#[derive(Deserialize)]
struct PlayerCountPayload {
    count: u32,
}

#[derive(Deserialize)]
struct StreamerListPayload {
    ids: Vec<String>,
}

/// Borrowed view of everything this client writes to the wire
#[derive(Serialize)]
#[serde(tag = "type")]
enum Outgoing<'a> {
    #[serde(rename = "config")]
    Config {
        #[serde(rename = "peerConnectionOptions")]
        options: OptionsRef<'a>,
    },
    #[serde(rename = "answer")]
    Answer { sdp: &'a str },
    #[serde(rename = "iceCandidate")]
    IceCandidate { candidate: &'a IceCandidate },
    #[serde(rename = "playerCount")]
    PlayerCount { count: u32 },
    #[serde(rename = "streamerList")]
    StreamerList { ids: &'a [String] },
    #[serde(rename = "listStreamers")]
    ListStreamers,
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(rename = "streamerId")]
        streamer_id: &'a str,
    },
}

#[derive(Serialize)]
struct OptionsRef<'a> {
    #[serde(rename = "iceServers")]
    ice_servers: &'a [IceServer],
}

impl<'a> From<&'a SignalingMessage> for Outgoing<'a> {
    fn from(message: &'a SignalingMessage) -> Self {
        match message {
            SignalingMessage::Config { ice_servers } => Outgoing::Config {
                options: OptionsRef { ice_servers },
            },
            // This client only ever answers
            SignalingMessage::SessionDescription(description) => Outgoing::Answer {
                sdp: &description.sdp,
            },
            SignalingMessage::IceCandidate(candidate) => Outgoing::IceCandidate { candidate },
            SignalingMessage::PlayerCount { count } => Outgoing::PlayerCount { count: *count },
            SignalingMessage::StreamerList { ids } => Outgoing::StreamerList { ids },
        }
    }
}

impl<'a> From<&'a ClientRequest> for Outgoing<'a> {
    fn from(request: &'a ClientRequest) -> Self {
        match request {
            ClientRequest::ListStreamers => Outgoing::ListStreamers,
            ClientRequest::Subscribe { streamer_id } => Outgoing::Subscribe { streamer_id },
        }
    }
}

fn write_json(f: &mut fmt::Formatter<'_>, frame: Outgoing<'_>) -> fmt::Result {
    let json = serde_json::to_string(&frame).map_err(|_| fmt::Error)?;
    f.write_str(&json)
}

impl fmt::Display for SignalingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_json(f, self.into())
    }
}

impl fmt::Display for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_json(f, self.into())
    }
}

impl FromStr for SignalingMessage {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

fn payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::MalformedPayload(e.to_string()))
}

/// Decode one text frame received from the signaling server
pub fn decode(text: &str) -> Result<SignalingMessage, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let kind = match value.get("type").and_then(serde_json::Value::as_str) {
        Some(kind) => kind.to_string(),
        None => return Err(DecodeError::UnknownMessageType(None)),
    };

    let message = match kind.as_str() {
        "config" => {
            let config: ConfigPayload = payload(value)?;
            SignalingMessage::Config {
                ice_servers: config.options.ice_servers,
            }
        }
        "offer" | "answer" | "prAnswer" | "pranswer" => {
            let sdp: SdpPayload = payload(value)?;
            SignalingMessage::SessionDescription(SessionDescription::new(SdpKind::parse(&kind), sdp.sdp))
        }
        "rollback" => {
            let sdp: RollbackPayload = payload(value)?;
            SignalingMessage::SessionDescription(SessionDescription::new(SdpKind::Rollback, sdp.sdp))
        }
        "iceCandidate" => {
            let candidate: CandidatePayload = payload(value)?;
            SignalingMessage::IceCandidate(candidate.candidate)
        }
        "playerCount" => {
            let count: PlayerCountPayload = payload(value)?;
            SignalingMessage::PlayerCount { count: count.count }
        }
        "streamerList" => {
            let list: StreamerListPayload = payload(value)?;
            SignalingMessage::StreamerList { ids: list.ids }
        }
        _ => return Err(DecodeError::UnknownMessageType(Some(kind))),
    };

    Ok(message)
}

/// Encode a message for the wire. SDP is always tagged `answer`.
pub fn encode(message: &SignalingMessage) -> String {
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_decode_config() {
        let text = r#"{"type":"config","peerConnectionOptions":{"iceServers":[
            {"urls":["stun:stun.l.google.com:19302"]},
            {"urls":"turn:turn.example.com:3478","username":"user","credential":"secret"}
        ]}}"#;

        let ice_servers = match decode(text).unwrap() {
            SignalingMessage::Config { ice_servers } => ice_servers,
            other => panic!("expected config, got {other:?}"),
        };
        assert_eq!(ice_servers.len(), 2);
        assert_eq!(ice_servers[0], IceServer::new("stun:stun.l.google.com:19302"));
        assert_eq!(ice_servers[1].urls, vec!["turn:turn.example.com:3478"]);
        assert_eq!(ice_servers[1].username.as_deref(), Some("user"));
        assert_eq!(ice_servers[1].credential.as_deref(), Some("secret"));
    }

    #[test]
    fn test_decode_config_without_ice_servers() {
        let message = decode(r#"{"type":"config","peerConnectionOptions":{}}"#).unwrap();
        assert_eq!(message, SignalingMessage::Config { ice_servers: vec![] });
    }

    #[test]
    fn test_decode_offer() {
        let message: SignalingMessage = r#"{"type":"offer","sdp":"v=0\r\n","sfu":false}"#.parse().unwrap();
        assert_eq!(
            message,
            SignalingMessage::SessionDescription(SessionDescription::offer("v=0\r\n"))
        );
    }

    #[test]
    fn test_decode_other_sdp_kinds() {
        let answer = decode(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(answer, SignalingMessage::SessionDescription(SessionDescription::answer("v=0")));

        let pranswer = decode(r#"{"type":"pranswer","sdp":"v=0"}"#).unwrap();
        assert_eq!(
            pranswer,
            SignalingMessage::SessionDescription(SessionDescription::new(SdpKind::ProvisionalAnswer, "v=0"))
        );

        let rollback = decode(r#"{"type":"rollback"}"#).unwrap();
        assert_eq!(
            rollback,
            SignalingMessage::SessionDescription(SessionDescription::new(SdpKind::Rollback, ""))
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            decode(r#"{"type":"bogus"}"#),
            Err(DecodeError::UnknownMessageType(Some("bogus".to_string())))
        );
        assert_eq!(decode(r#"{"sdp":"v=0"}"#), Err(DecodeError::UnknownMessageType(None)));
        assert_eq!(decode(r#"{"type":5}"#), Err(DecodeError::UnknownMessageType(None)));
        assert_eq!(decode("[1,2]"), Err(DecodeError::UnknownMessageType(None)));
    }

    #[test]
    fn test_client_requests_are_not_server_messages() {
        assert!(matches!(
            decode(r#"{"type":"listStreamers"}"#),
            Err(DecodeError::UnknownMessageType(Some(kind))) if kind == "listStreamers"
        ));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert!(matches!(decode(r#"{"type":"offer"}"#), Err(DecodeError::MalformedPayload(_))));
        assert!(matches!(decode(r#"{"type":"config"}"#), Err(DecodeError::MalformedPayload(_))));
        assert!(matches!(
            decode(r#"{"type":"iceCandidate","candidate":{"candidate":"c"}}"#),
            Err(DecodeError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode(r#"{"type":"playerCount","count":"three"}"#),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(decode("not json"), Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_encode_sdp_is_always_answer() {
        let offer = SignalingMessage::SessionDescription(SessionDescription::offer("v=0"));
        assert_eq!(as_value(&encode(&offer)), json!({"type": "answer", "sdp": "v=0"}));
    }

    #[test]
    fn test_encode_candidate_wire_shape() {
        let message = SignalingMessage::IceCandidate(IceCandidate::new("0", 0, "candidate:1 1 UDP 2122 10.0.0.2 50000 typ host"));
        assert_eq!(
            as_value(&encode(&message)),
            json!({
                "type": "iceCandidate",
                "candidate": {
                    "sdpMid": "0",
                    "sdpMLineIndex": 0,
                    "candidate": "candidate:1 1 UDP 2122 10.0.0.2 50000 typ host"
                }
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let messages = vec![
            SignalingMessage::Config {
                ice_servers: vec![
                    IceServer::new("stun:stun.example.com"),
                    IceServer {
                        urls: vec!["turn:a.example.com".to_string(), "turns:b.example.com".to_string()],
                        username: Some("u".to_string()),
                        credential: Some("c".to_string()),
                    },
                ],
            },
            SignalingMessage::SessionDescription(SessionDescription::answer("v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n")),
            SignalingMessage::IceCandidate(IceCandidate::new("video", 1, "candidate:2")),
            SignalingMessage::PlayerCount { count: 3 },
            SignalingMessage::StreamerList {
                ids: vec!["DefaultStreamer".to_string(), "Second".to_string()],
            },
        ];

        for message in messages {
            assert_eq!(decode(&encode(&message)).unwrap(), message);
        }
    }

    #[test]
    fn test_client_requests() {
        assert_eq!(
            as_value(&ClientRequest::ListStreamers.to_string()),
            json!({"type": "listStreamers"})
        );
        assert_eq!(
            as_value(&ClientRequest::subscribe("DefaultStreamer").to_string()),
            json!({"type": "subscribe", "streamerId": "DefaultStreamer"})
        );
    }
}
