//! Socket plumbing shared by the foreground connection and its receive task

use crate::config::ConnectionConfig;
use crate::dispatch::{Action, DispatchTable};
use crate::error::SendError;
use crate::listener::ClientListener;
use log::{debug, error, info, warn};
use protocol::{codec, NetPacket, PacketType};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// The single outbound path for a connected socket
///
/// Foreground sends and pong replies from the receive task both go through
/// here, so datagram writes never interleave.
#[derive(Clone)]
pub struct PacketSender {
    socket: Arc<UdpSocket>,
    write_lock: Arc<Mutex<()>>,
}

impl PacketSender {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self {
            socket,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn send_packet(&self, packet: &NetPacket) -> Result<(), SendError> {
        let frame = packet.encode()?;
        self.send_frame(&frame).await
    }

    /// Writes an already encoded frame as one datagram
    pub async fn send_frame(&self, frame: &[u8]) -> Result<(), SendError> {
        let _guard = self.write_lock.lock().await;
        self.socket.send(frame).await?;
        Ok(())
    }
}

/// What happened to one inbound datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatagramOutcome {
    Forwarded(PacketType),
    ListenerFailed(PacketType),
    NoListener(PacketType),
    PongSent,
    PongFailed,
    Logged(PacketType),
    Corrupt,
    UnknownType(u8),
    Malformed(PacketType),
}

/// Decodes inbound datagrams and applies the dispatch table to them
pub struct PacketHandler {
    id: String,
    table: DispatchTable,
    listener: Option<Arc<dyn ClientListener>>,
    sender: PacketSender,
}

impl PacketHandler {
    pub fn new(
        id: String,
        table: DispatchTable,
        listener: Option<Arc<dyn ClientListener>>,
        sender: PacketSender,
    ) -> Self {
        Self {
            id,
            table,
            listener,
            sender,
        }
    }

    pub async fn handle_datagram(&self, data: &[u8]) -> DatagramOutcome {
        let frame = match codec::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping datagram: {}", e);
                return DatagramOutcome::Corrupt;
            }
        };

        let route = match self.table.lookup(frame.tag) {
            Some(route) => route,
            None => {
                warn!("Unknown packet type {}", frame.tag);
                return DatagramOutcome::UnknownType(frame.tag);
            }
        };

        let packet = match (route.decode)(&frame.payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Error unmarshalling packet: {}", e);
                return match frame.packet_type() {
                    Some(packet_type) => DatagramOutcome::Malformed(packet_type),
                    None => DatagramOutcome::UnknownType(frame.tag),
                };
            }
        };

        let packet_type = packet.packet_type();
        match route.action {
            Action::Forward => self.forward(packet),
            Action::ReplyPong => match self.sender.send_packet(&NetPacket::pong(&self.id)).await {
                Ok(()) => {
                    debug!("Answered server ping");
                    DatagramOutcome::PongSent
                }
                Err(e) => {
                    error!("Error responding to server ping: {}", e);
                    DatagramOutcome::PongFailed
                }
            },
            Action::LogOnly => {
                match &packet {
                    NetPacket::PlayerDisconnectionNotification(p) => {
                        info!("Received disconnect: {}", p.id)
                    }
                    other => info!("Received {} packet", other.packet_type()),
                }
                DatagramOutcome::Logged(packet_type)
            }
        }
    }

    /// Hands a packet to the listener; failures are logged, not returned
    fn forward(&self, packet: NetPacket) -> DatagramOutcome {
        let packet_type = packet.packet_type();
        let Some(listener) = &self.listener else {
            warn!("No client listener installed, dropping {} packet", packet_type);
            return DatagramOutcome::NoListener(packet_type);
        };

        match listener.on_packet_received(packet) {
            Ok(()) => DatagramOutcome::Forwarded(packet_type),
            Err(e) => {
                error!("Error processing packet {}: {}", packet_type, e);
                DatagramOutcome::ListenerFailed(packet_type)
            }
        }
    }
}

/// Spawns the task that reads and dispatches datagrams until the
/// connection goes inactive or shutdown is signalled
pub fn spawn_receive_loop(
    socket: Arc<UdpSocket>,
    handler: PacketHandler,
    active: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
    config: &ConnectionConfig,
) -> JoinHandle<()> {
    let buffer_size = config.recv_buffer_size;
    let backoff = config.read_error_backoff;

    tokio::spawn(async move {
        let mut buffer = vec![0u8; buffer_size];

        while active.load(Ordering::Acquire) {
            let result = tokio::select! {
                changed = shutdown.changed() => {
                    // Sender dropped or shutdown flagged; either way we are done
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                result = socket.recv(&mut buffer) => result,
            };

            let len = match result {
                Ok(len) => len,
                Err(e) => {
                    error!("Socket error: {}", e);
                    sleep(backoff).await;
                    continue;
                }
            };

            if len == 0 {
                continue;
            }

            handler.handle_datagram(&buffer[..len]).await;
        }

        debug!("Receive loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenerError;
    use protocol::{
        AddPlayerPacket, GenerateMapPacket, PingPacket, PlayerDisconnectRequestPacket,
    };
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingListener {
        packets: StdMutex<Vec<NetPacket>>,
        fail: bool,
    }

    impl ClientListener for RecordingListener {
        fn on_packet_received(&self, packet: NetPacket) -> Result<(), ListenerError> {
            self.packets.lock().unwrap().push(packet);
            if self.fail {
                return Err("listener rejected packet".into());
            }
            Ok(())
        }
    }

    /// Returns a connected client socket and the peer playing the server
    async fn socket_pair() -> (Arc<UdpSocket>, UdpSocket) {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(server.local_addr().unwrap()).await.unwrap();
        server.connect(client.local_addr().unwrap()).await.unwrap();
        (Arc::new(client), server)
    }

    async fn handler_with(
        listener: Option<Arc<dyn ClientListener>>,
    ) -> (PacketHandler, UdpSocket) {
        let (client, server) = socket_pair().await;
        let handler = PacketHandler::new(
            "client-id".to_string(),
            DispatchTable::client_default(),
            listener,
            PacketSender::new(client),
        );
        (handler, server)
    }

    #[tokio::test]
    async fn test_forwarded_packet_reaches_listener() {
        let listener = Arc::new(RecordingListener::default());
        let (handler, _server) = handler_with(Some(listener.clone())).await;

        let packet = NetPacket::GenerateMap(GenerateMapPacket { region_type: 3 });
        let outcome = handler.handle_datagram(&packet.encode().unwrap()).await;

        assert_eq!(outcome, DatagramOutcome::Forwarded(PacketType::GenerateMap));
        assert_eq!(listener.packets.lock().unwrap().as_slice(), &[packet]);
    }

    #[tokio::test]
    async fn test_ping_is_answered_not_forwarded() {
        let listener = Arc::new(RecordingListener::default());
        let (handler, server) = handler_with(Some(listener.clone())).await;

        let ping = NetPacket::Ping(PingPacket { ts: 1 });
        let outcome = handler.handle_datagram(&ping.encode().unwrap()).await;
        assert_eq!(outcome, DatagramOutcome::PongSent);

        let mut buf = [0u8; 4096];
        let len = timeout(Duration::from_secs(1), server.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        match NetPacket::decode(&buf[..len]).unwrap() {
            NetPacket::Pong(pong) => assert_eq!(pong.id, "client-id"),
            other => panic!("Expected pong, got {:?}", other),
        }

        assert!(listener.packets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_notification_is_only_logged() {
        let listener = Arc::new(RecordingListener::default());
        let (handler, _server) = handler_with(Some(listener.clone())).await;

        let packet = NetPacket::PlayerDisconnectionNotification(PlayerDisconnectRequestPacket {
            id: "other".to_string(),
        });
        let outcome = handler.handle_datagram(&packet.encode().unwrap()).await;

        assert_eq!(
            outcome,
            DatagramOutcome::Logged(PacketType::PlayerDisconnectionNotification)
        );
        assert!(listener.packets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_input_is_dropped() {
        let listener = Arc::new(RecordingListener::default());
        let (handler, _server) = handler_with(Some(listener.clone())).await;

        assert_eq!(
            handler.handle_datagram(&[1, 2, 3, 4]).await,
            DatagramOutcome::Corrupt
        );
        assert_eq!(
            handler
                .handle_datagram(&codec::encode_body(250, b"{}").unwrap())
                .await,
            DatagramOutcome::UnknownType(250)
        );
        assert_eq!(
            handler
                .handle_datagram(&NetPacket::pong("x").encode().unwrap())
                .await,
            DatagramOutcome::UnknownType(PacketType::Pong.tag())
        );
        assert_eq!(
            handler
                .handle_datagram(&codec::encode_body(PacketType::AddPlayer.tag(), b"[1,2]").unwrap())
                .await,
            DatagramOutcome::Malformed(PacketType::AddPlayer)
        );

        assert!(listener.packets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listener_failure_is_swallowed() {
        let listener = Arc::new(RecordingListener {
            fail: true,
            ..RecordingListener::default()
        });
        let (handler, _server) = handler_with(Some(listener.clone())).await;

        let packet = NetPacket::AddPlayer(AddPlayerPacket {
            id: "p".to_string(),
            name: "Kashya".to_string(),
            x: 0,
            y: 0,
            hero_type: "Barbarian".to_string(),
        });
        let outcome = handler.handle_datagram(&packet.encode().unwrap()).await;

        assert_eq!(outcome, DatagramOutcome::ListenerFailed(PacketType::AddPlayer));
        assert_eq!(listener.packets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_forward_without_listener() {
        let (handler, _server) = handler_with(None).await;
        let packet = NetPacket::GenerateMap(GenerateMapPacket { region_type: 1 });

        assert_eq!(
            handler.handle_datagram(&packet.encode().unwrap()).await,
            DatagramOutcome::NoListener(PacketType::GenerateMap)
        );
    }

    #[tokio::test]
    async fn test_receive_loop_stops_on_shutdown() {
        let (client, _server) = socket_pair().await;
        let handler = PacketHandler::new(
            "client-id".to_string(),
            DispatchTable::client_default(),
            None,
            PacketSender::new(client.clone()),
        );
        let active = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_receive_loop(
            client,
            handler,
            active.clone(),
            shutdown_rx,
            &ConnectionConfig::default(),
        );

        // Let the task block in recv before signalling
        sleep(Duration::from_millis(20)).await;
        active.store(false, Ordering::Release);
        shutdown_tx.send(true).unwrap();

        timeout(Duration::from_secs(1), handle)
            .await
            .expect("receive loop did not stop")
            .unwrap();
    }
}
