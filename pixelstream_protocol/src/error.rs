//! Error types for the signaling protocol

use thiserror::Error;

/// Errors that can occur while decoding a signaling frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The `type` discriminant is missing or names no server message
    #[error("Unknown message type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnknownMessageType(Option<String>),

    /// The payload of a known message type is missing fields or has the wrong shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors from classifying a data channel payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataChannelError {
    /// Zero-length payload, no type byte
    #[error("Empty data channel payload")]
    Empty,

    /// The leading type byte is not a known message type
    #[error("Unknown data channel message type: {0}")]
    UnknownType(u8),

    /// A text payload was not valid UTF-16LE
    #[error("Invalid UTF-16 text in data channel payload")]
    InvalidText,
}
