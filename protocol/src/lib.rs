//! # Remote Client Protocol
//!
//! Packet definitions and wire framing shared by everything that talks to a
//! game server over UDP.
//!
//! ## Frame Layout
//! A frame is a one-byte [`PacketType`] tag followed by the gzip-compressed
//! JSON encoding of the packet payload. One frame travels in one datagram;
//! there is no length prefix, sequence number or acknowledgement. Delivery
//! is fire-and-forget.
//!
//! ## Module Organization
//!
//! ### Packet Types (`packet_type`)
//! The closed set of one-byte tags understood by this protocol.
//!
//! ### Packets (`packets`)
//! Payload structures for every packet type and the [`NetPacket`] enum that
//! ties a payload to its tag.
//!
//! ### Codec (`codec`)
//! Compression and framing. Encoding never emits an empty body and decoding
//! rejects anything that does not decompress cleanly.
//!
//! ## Usage Example
//!
//! ```rust
//! use protocol::{codec, NetPacket, PacketType};
//!
//! let frame = NetPacket::disconnect_request("client-1").encode()?;
//! assert_eq!(frame[0], PacketType::PlayerDisconnectionRequest.tag());
//!
//! let decoded = codec::decode(&frame)?;
//! let packet = NetPacket::from_payload(PacketType::PlayerDisconnectionRequest, &decoded.payload)?;
//! assert_eq!(packet, NetPacket::disconnect_request("client-1"));
//! # Ok::<(), protocol::CodecError>(())
//! ```

pub mod codec;
pub mod error;
pub mod packet_type;
pub mod packets;

pub use codec::DecodedFrame;
pub use error::CodecError;
pub use packet_type::PacketType;
pub use packets::*;

/// Port used when a server address does not name one
pub const DEFAULT_PORT: u16 = 6669;

/// Size of the receive buffer; one frame must fit in one datagram of at
/// most this many bytes
pub const RECV_BUFFER_SIZE: usize = 4096;
