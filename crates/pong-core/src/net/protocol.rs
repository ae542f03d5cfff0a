use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::bus::ActionEnvelope;

/// Maximum frame size in bytes, including the topic prefix.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Action topic discriminator, sent as the first byte of every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Topic {
    #[default]
    World = 0x01,
}

impl Topic {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::World),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::World => "world",
        }
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownTopic(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
    Invalid(ValidationError),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownTopic(b) => write!(f, "unknown topic: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
            Self::Invalid(e) => write!(f, "invalid action: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode an action envelope with a 1-byte topic prefix.
pub fn encode_envelope(envelope: &ActionEnvelope) -> Result<Vec<u8>, ProtocolError> {
    envelope
        .action
        .validate()
        .map_err(ProtocolError::Invalid)?;
    let payload = rmp_serde::to_vec_named(envelope)
        .map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(envelope.topic as u8);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Extract the topic byte from raw wire data.
pub fn decode_topic(data: &[u8]) -> Result<Topic, ProtocolError> {
    let first = *data.first().ok_or(ProtocolError::EmptyMessage)?;
    Topic::from_byte(first).ok_or(ProtocolError::UnknownTopic(first))
}

/// Decode and validate a frame. Malformed input is an error, never a panic.
pub fn decode_envelope(data: &[u8]) -> Result<ActionEnvelope, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let topic = decode_topic(data)?;
    let mut envelope: ActionEnvelope = rmp_serde::from_slice(&data[1..])
        .map_err(|e| ProtocolError::DeserializeError(e.to_string()))?;
    envelope.topic = topic;
    envelope
        .action
        .validate()
        .map_err(ProtocolError::Invalid)?;
    Ok(envelope)
}
