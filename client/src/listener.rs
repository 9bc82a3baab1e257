use log::info;
use protocol::NetPacket;
use std::error::Error;

pub type ListenerError = Box<dyn Error + Send + Sync>;

/// Sink for packets the receive loop hands to the game
///
/// Called synchronously from the receive task, so an implementation that
/// blocks stalls every datagram behind it. Hand work off to a channel if it
/// is anything but quick.
pub trait ClientListener: Send + Sync {
    fn on_packet_received(&self, packet: NetPacket) -> Result<(), ListenerError>;
}

impl<F> ClientListener for F
where
    F: Fn(NetPacket) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_packet_received(&self, packet: NetPacket) -> Result<(), ListenerError> {
        self(packet)
    }
}

/// Listener that only logs what arrives
#[derive(Debug, Default)]
pub struct LoggingListener;

impl ClientListener for LoggingListener {
    fn on_packet_received(&self, packet: NetPacket) -> Result<(), ListenerError> {
        match &packet {
            NetPacket::GenerateMap(p) => info!("Generate map for region {}", p.region_type),
            NetPacket::UpdateServerInfo(p) => {
                info!("Server info: seed {} for player {}", p.seed, p.player_id)
            }
            NetPacket::AddPlayer(p) => {
                info!("Player {} ({}, {}) joined at ({}, {})", p.name, p.hero_type, p.id, p.x, p.y)
            }
            NetPacket::MovePlayer(p) => info!(
                "Player {} moving ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                p.player_id, p.start_x, p.start_y, p.dest_x, p.dest_y
            ),
            other => info!("Received {} packet", other.packet_type()),
        }
        Ok(())
    }
}
