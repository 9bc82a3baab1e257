//! Wire framing for packets
//!
//! Every datagram carries exactly one frame:
//!
//! ```text
//! +-----+---------------------------------+
//! | tag | gzip(json(payload))             |
//! +-----+---------------------------------+
//!   1B    rest of the datagram
//! ```
//!
//! There is no length prefix or version field; datagram boundaries delimit
//! frames and the gzip trailer's CRC is the only integrity check.

use crate::error::{CodecError, Result};
use crate::packet_type::PacketType;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};

/// Upper bound on a decompressed payload. A 4 KiB datagram cannot
/// legitimately expand past this.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// A frame split into its tag and decompressed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub tag: u8,
    pub payload: Vec<u8>,
}

impl DecodedFrame {
    /// The packet type for this tag, if it is one we know
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_tag(self.tag)
    }
}

/// Serializes `payload` as JSON and frames it under `packet_type`
pub fn encode<T: Serialize>(packet_type: PacketType, payload: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload).map_err(CodecError::Serialize)?;
    encode_body(packet_type.tag(), &body)
}

/// Compresses an already serialized body at maximum level and prepends the tag
pub fn encode_body(tag: u8, body: &[u8]) -> Result<Vec<u8>> {
    if body.is_empty() {
        return Err(CodecError::EmptySerialization(tag));
    }

    let mut frame = Vec::with_capacity(body.len() / 2 + 32);
    frame.push(tag);

    let mut encoder = GzEncoder::new(frame, Compression::best());
    encoder.write_all(body)?;
    let frame = encoder.finish()?;

    if frame.len() <= 1 {
        return Err(CodecError::EmptySerialization(tag));
    }

    Ok(frame)
}

/// Splits a frame into its tag and decompressed payload
///
/// The payload shape is not checked here.
pub fn decode(frame: &[u8]) -> Result<DecodedFrame> {
    let (&tag, compressed) = frame
        .split_first()
        .ok_or_else(|| CodecError::CorruptFrame("empty datagram".to_string()))?;

    if compressed.is_empty() {
        return Err(CodecError::CorruptFrame(format!(
            "frame with tag {} has no body",
            tag
        )));
    }

    let mut payload = Vec::new();
    let mut decoder = GzDecoder::new(compressed);
    (&mut decoder)
        .take(MAX_PAYLOAD_SIZE as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(|e| CodecError::CorruptFrame(format!("tag {}: {}", tag, e)))?;

    if payload.is_empty() {
        return Err(CodecError::CorruptFrame(format!(
            "tag {}: body decompressed to zero bytes",
            tag
        )));
    }
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::CorruptFrame(format!(
            "tag {}: payload exceeds {} bytes",
            tag, MAX_PAYLOAD_SIZE
        )));
    }

    // A frame holds exactly one gzip member
    let trailing = decoder.into_inner().len();
    if trailing > 0 {
        return Err(CodecError::CorruptFrame(format!(
            "tag {}: {} trailing bytes after compressed body",
            tag, trailing
        )));
    }

    Ok(DecodedFrame { tag, payload })
}
