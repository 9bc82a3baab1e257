//! Routing table for inbound packets
//!
//! Each known tag maps to a decoder that turns the decompressed payload into
//! a typed [`NetPacket`] and to the [`Action`] the receive loop takes with it.
//! Tags missing from the table are treated as unknown and dropped.

use protocol::packets::parse;
use protocol::{CodecError, NetPacket, PacketType, PingPacket};
use std::collections::HashMap;

pub type Decoder = fn(&[u8]) -> Result<NetPacket, CodecError>;

/// What the receive loop does with a successfully decoded packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Hand the packet to the client listener
    Forward,
    /// Answer with a pong over the same socket
    ReplyPong,
    /// Log the packet and go no further
    LogOnly,
}

#[derive(Clone, Copy)]
pub struct Route {
    pub decode: Decoder,
    pub action: Action,
}

/// Decoder and action per packet type
pub struct DispatchTable {
    routes: HashMap<u8, Route>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Routes for packets a server sends to a remote client
    pub fn client_default() -> Self {
        let mut table = Self::empty();

        table.register(
            PacketType::GenerateMap,
            |payload| parse(PacketType::GenerateMap, payload).map(NetPacket::GenerateMap),
            Action::Forward,
        );
        table.register(
            PacketType::MovePlayer,
            |payload| parse(PacketType::MovePlayer, payload).map(NetPacket::MovePlayer),
            Action::Forward,
        );
        table.register(
            PacketType::UpdateServerInfo,
            |payload| parse(PacketType::UpdateServerInfo, payload).map(NetPacket::UpdateServerInfo),
            Action::Forward,
        );
        table.register(
            PacketType::AddPlayer,
            |payload| parse(PacketType::AddPlayer, payload).map(NetPacket::AddPlayer),
            Action::Forward,
        );
        table.register(PacketType::Ping, decode_ping, Action::ReplyPong);
        table.register(
            PacketType::PlayerDisconnectionNotification,
            |payload| {
                parse(PacketType::PlayerDisconnectionNotification, payload)
                    .map(NetPacket::PlayerDisconnectionNotification)
            },
            Action::LogOnly,
        );

        table
    }

    /// Adds or replaces the route for `packet_type`
    pub fn register(&mut self, packet_type: PacketType, decode: Decoder, action: Action) {
        self.routes.insert(packet_type.tag(), Route { decode, action });
    }

    pub fn lookup(&self, tag: u8) -> Option<&Route> {
        self.routes.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Pings are answered whatever their body holds; a numeric `ts` is kept
fn decode_ping(payload: &[u8]) -> Result<NetPacket, CodecError> {
    let ts = serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|body| body.get("ts").and_then(|ts| ts.as_u64()))
        .unwrap_or(0);
    Ok(NetPacket::Ping(PingPacket { ts }))
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::client_default()
    }
}
