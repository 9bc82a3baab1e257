use crate::codec;
use crate::error::{CodecError, Result};
use crate::packet_type::PacketType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Opaque saved-game state carried inside the connection request
pub type PlayerState = serde_json::Value;

// Payloads sent by the server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GenerateMapPacket {
    pub region_type: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpdateServerInfoPacket {
    pub seed: i64,
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AddPlayerPacket {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hero_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MovePlayerPacket {
    pub player_id: String,
    pub start_x: f64,
    pub start_y: f64,
    pub dest_x: f64,
    pub dest_y: f64,
}

// Connection management
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlayerConnectionRequestPacket {
    pub id: String,
    pub player_state: PlayerState,
}

/// Shared by disconnect requests (client to server) and disconnect
/// notifications (server to client)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlayerDisconnectRequestPacket {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PingPacket {
    pub ts: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PongPacket {
    pub id: String,
    pub ts: u64,
}

/// A packet type together with its payload
///
/// Only the payload travels in the frame body; the variant is carried by
/// the one-byte tag in front of it.
#[derive(Debug, Clone, PartialEq)]
pub enum NetPacket {
    GenerateMap(GenerateMapPacket),
    UpdateServerInfo(UpdateServerInfoPacket),
    AddPlayer(AddPlayerPacket),
    MovePlayer(MovePlayerPacket),
    PlayerConnectionRequest(PlayerConnectionRequestPacket),
    PlayerDisconnectionRequest(PlayerDisconnectRequestPacket),
    PlayerDisconnectionNotification(PlayerDisconnectRequestPacket),
    Ping(PingPacket),
    Pong(PongPacket),
}

impl NetPacket {
    pub fn connection_request(id: &str, player_state: PlayerState) -> Self {
        NetPacket::PlayerConnectionRequest(PlayerConnectionRequestPacket {
            id: id.to_string(),
            player_state,
        })
    }

    pub fn disconnect_request(id: &str) -> Self {
        NetPacket::PlayerDisconnectionRequest(PlayerDisconnectRequestPacket { id: id.to_string() })
    }

    pub fn ping() -> Self {
        NetPacket::Ping(PingPacket { ts: get_timestamp() })
    }

    pub fn pong(id: &str) -> Self {
        NetPacket::Pong(PongPacket {
            id: id.to_string(),
            ts: get_timestamp(),
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            NetPacket::GenerateMap(_) => PacketType::GenerateMap,
            NetPacket::UpdateServerInfo(_) => PacketType::UpdateServerInfo,
            NetPacket::AddPlayer(_) => PacketType::AddPlayer,
            NetPacket::MovePlayer(_) => PacketType::MovePlayer,
            NetPacket::PlayerConnectionRequest(_) => PacketType::PlayerConnectionRequest,
            NetPacket::PlayerDisconnectionRequest(_) => PacketType::PlayerDisconnectionRequest,
            NetPacket::PlayerDisconnectionNotification(_) => {
                PacketType::PlayerDisconnectionNotification
            }
            NetPacket::Ping(_) => PacketType::Ping,
            NetPacket::Pong(_) => PacketType::Pong,
        }
    }

    /// Serializes the payload and wraps it in a compressed frame
    pub fn encode(&self) -> Result<Vec<u8>> {
        let packet_type = self.packet_type();
        match self {
            NetPacket::GenerateMap(p) => codec::encode(packet_type, p),
            NetPacket::UpdateServerInfo(p) => codec::encode(packet_type, p),
            NetPacket::AddPlayer(p) => codec::encode(packet_type, p),
            NetPacket::MovePlayer(p) => codec::encode(packet_type, p),
            NetPacket::PlayerConnectionRequest(p) => codec::encode(packet_type, p),
            NetPacket::PlayerDisconnectionRequest(p) => codec::encode(packet_type, p),
            NetPacket::PlayerDisconnectionNotification(p) => codec::encode(packet_type, p),
            NetPacket::Ping(p) => codec::encode(packet_type, p),
            NetPacket::Pong(p) => codec::encode(packet_type, p),
        }
    }

    /// Rebuilds a packet from an already decompressed payload
    pub fn from_payload(packet_type: PacketType, payload: &[u8]) -> Result<Self> {
        match packet_type {
            PacketType::GenerateMap => parse(packet_type, payload).map(NetPacket::GenerateMap),
            PacketType::UpdateServerInfo => {
                parse(packet_type, payload).map(NetPacket::UpdateServerInfo)
            }
            PacketType::AddPlayer => parse(packet_type, payload).map(NetPacket::AddPlayer),
            PacketType::MovePlayer => parse(packet_type, payload).map(NetPacket::MovePlayer),
            PacketType::PlayerConnectionRequest => {
                parse(packet_type, payload).map(NetPacket::PlayerConnectionRequest)
            }
            PacketType::PlayerDisconnectionRequest => {
                parse(packet_type, payload).map(NetPacket::PlayerDisconnectionRequest)
            }
            PacketType::PlayerDisconnectionNotification => {
                parse(packet_type, payload).map(NetPacket::PlayerDisconnectionNotification)
            }
            PacketType::Ping => parse(packet_type, payload).map(NetPacket::Ping),
            PacketType::Pong => parse(packet_type, payload).map(NetPacket::Pong),
        }
    }

    /// Decodes a whole frame, rejecting unknown tags as corrupt
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let decoded = codec::decode(frame)?;
        let packet_type = PacketType::from_tag(decoded.tag).ok_or_else(|| {
            CodecError::CorruptFrame(format!("unknown packet type {}", decoded.tag))
        })?;
        Self::from_payload(packet_type, &decoded.payload)
    }
}

/// Deserializes a payload into exactly the shape registered for its type
pub fn parse<T: DeserializeOwned>(packet_type: PacketType, payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|source| CodecError::Deserialize {
        packet_type,
        source,
    })
}

// Current Unix time in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
