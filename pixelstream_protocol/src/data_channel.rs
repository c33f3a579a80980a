//! Classification of messages the streamer sends over the data channel
//!
//! Each payload starts with a single type byte. The only payload this client
//! interprets is the encoder's average QP, sent as UTF-16LE text, which the
//! demo shows as a stream quality indicator.

use crate::error::DataChannelError;

/// Leading type byte of a streamer-to-client data channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ToClientMessageType {
    QualityControlOwnership = 0,
    Response = 1,
    Command = 2,
    FreezeFrame = 3,
    UnfreezeFrame = 4,
    VideoEncoderAvgQp = 5,
    LatencyTest = 6,
    InitialSettings = 7,
    FileExtension = 8,
    FileMimeType = 9,
    FileContents = 10,
}

impl TryFrom<u8> for ToClientMessageType {
    type Error = DataChannelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ToClientMessageType::*;
        Ok(match value {
            0 => QualityControlOwnership,
            1 => Response,
            2 => Command,
            3 => FreezeFrame,
            4 => UnfreezeFrame,
            5 => VideoEncoderAvgQp,
            6 => LatencyTest,
            7 => InitialSettings,
            8 => FileExtension,
            9 => FileMimeType,
            10 => FileContents,
            other => return Err(DataChannelError::UnknownType(other)),
        })
    }
}

/// A classified streamer-to-client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToClientMessage {
    /// Average QP reported by the streamer's video encoder
    VideoEncoderAvgQp(String),

    /// Any message type this client does not implement; payload excludes the type byte
    Unhandled {
        kind: ToClientMessageType,
        payload: Vec<u8>,
    },
}

impl ToClientMessage {
    /// Classify a raw data channel payload
    pub fn parse(data: &[u8]) -> Result<Self, DataChannelError> {
        let (&type_byte, payload) = data.split_first().ok_or(DataChannelError::Empty)?;
        let kind = ToClientMessageType::try_from(type_byte)?;

        match kind {
            ToClientMessageType::VideoEncoderAvgQp => Ok(ToClientMessage::VideoEncoderAvgQp(utf16le(payload)?)),
            kind => Ok(ToClientMessage::Unhandled {
                kind,
                payload: payload.to_vec(),
            }),
        }
    }

    pub fn kind(&self) -> ToClientMessageType {
        match self {
            ToClientMessage::VideoEncoderAvgQp(_) => ToClientMessageType::VideoEncoderAvgQp,
            ToClientMessage::Unhandled { kind, .. } => *kind,
        }
    }
}

fn utf16le(bytes: &[u8]) -> Result<String, DataChannelError> {
    if bytes.len() % 2 != 0 {
        return Err(DataChannelError::InvalidText);
    }
    let units = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| DataChannelError::InvalidText)
}
