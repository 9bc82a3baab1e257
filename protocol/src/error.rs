use crate::packet_type::PacketType;
use thiserror::Error;

/// Failures produced while turning packets into frames and back
#[derive(Error, Debug)]
pub enum CodecError {
    /// The body handed to the compressor was empty, which would put an
    /// empty frame body on the wire
    #[error("attempted to send empty packet body (type tag {0})")]
    EmptySerialization(u8),

    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to deserialize {packet_type} payload: {source}")]
    Deserialize {
        packet_type: PacketType,
        #[source]
        source: serde_json::Error,
    },

    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
