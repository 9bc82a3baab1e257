use std::fmt;

/// One-byte discriminator written in front of every frame
///
/// Tag 0 is never assigned and tags 10-255 are reserved for future packet
/// types. Receivers treat any tag outside this set as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    GenerateMap = 1,
    UpdateServerInfo = 2,
    AddPlayer = 3,
    MovePlayer = 4,
    PlayerConnectionRequest = 5,
    PlayerDisconnectionRequest = 6,
    PlayerDisconnectionNotification = 7,
    Ping = 8,
    Pong = 9,
}

impl PacketType {
    pub const ALL: [PacketType; 9] = [
        PacketType::GenerateMap,
        PacketType::UpdateServerInfo,
        PacketType::AddPlayer,
        PacketType::MovePlayer,
        PacketType::PlayerConnectionRequest,
        PacketType::PlayerDisconnectionRequest,
        PacketType::PlayerDisconnectionNotification,
        PacketType::Ping,
        PacketType::Pong,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Maps a wire tag back to a known packet type
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|packet_type| packet_type.tag() == tag)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::from_tag(tag).ok_or(tag)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::GenerateMap => "GenerateMap",
            PacketType::UpdateServerInfo => "UpdateServerInfo",
            PacketType::AddPlayer => "AddPlayer",
            PacketType::MovePlayer => "MovePlayer",
            PacketType::PlayerConnectionRequest => "PlayerConnectionRequest",
            PacketType::PlayerDisconnectionRequest => "PlayerDisconnectionRequest",
            PacketType::PlayerDisconnectionNotification => "PlayerDisconnectionNotification",
            PacketType::Ping => "Ping",
            PacketType::Pong => "Pong",
        };
        f.write_str(name)
    }
}
