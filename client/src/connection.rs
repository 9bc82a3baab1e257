//! Client side of a LAN game session over UDP

use crate::config::ConnectionConfig;
use crate::dispatch::DispatchTable;
use crate::error::{ConnectError, SendError};
use crate::listener::{ClientListener, ListenerError};
use crate::network::{spawn_receive_loop, PacketHandler, PacketSender};
use crate::state::load_player_state;
use log::{error, info, warn};
use protocol::{NetPacket, PlayerState};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How a client reaches the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Local,
    LanServer,
    LanClient,
}

/// Lifecycle of a connection; `Closed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Inert,
    Open,
    Closed,
}

/// A client's UDP session with a remote game server
///
/// Created inert with a fresh id. [`open`](Self::open) connects the socket,
/// starts the background receive task and announces the client;
/// [`close`](Self::close) says goodbye and stops the task. A closed
/// connection cannot be reopened.
pub struct RemoteClientConnection {
    id: String,
    config: ConnectionConfig,
    listener: Option<Arc<dyn ClientListener>>,
    active: Arc<AtomicBool>,
    lifecycle: Lifecycle,
    sender: Option<PacketSender>,
    shutdown: Option<watch::Sender<bool>>,
    receiver: Option<JoinHandle<()>>,
}

impl RemoteClientConnection {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), config)
    }

    pub fn with_id(id: String, config: ConnectionConfig) -> Self {
        Self {
            id,
            config,
            listener: None,
            active: Arc::new(AtomicBool::new(false)),
            lifecycle: Lifecycle::Inert,
            sender: None,
            shutdown: None,
            receiver: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection_type(&self) -> ConnectionType {
        ConnectionType::LanClient
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Address of the server once the socket is connected
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.sender.as_ref().and_then(|sender| sender.peer_addr().ok())
    }

    /// Local end of the socket once connected
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sender.as_ref().and_then(|sender| sender.local_addr().ok())
    }

    /// Installs the sink for forwarded packets
    ///
    /// The receive task picks the listener up when it starts, so this has
    /// to happen before `open`.
    pub fn set_client_listener(&mut self, listener: Arc<dyn ClientListener>) {
        if self.lifecycle == Lifecycle::Open {
            warn!("Client listener set after open; the running receive loop keeps the old one");
        }
        self.listener = Some(listener);
    }

    /// Passes a packet straight to the installed listener
    pub fn send_packet_to_client(&self, packet: NetPacket) -> Result<(), ListenerError> {
        match &self.listener {
            Some(listener) => listener.on_packet_received(packet),
            None => Err("no client listener installed".into()),
        }
    }

    /// Connects to `address` and sends the connection request
    ///
    /// Port 6669 (or the configured default) is used when `address` names
    /// none. If the connection request cannot be sent the error is returned
    /// but the connection stays open and keeps receiving.
    pub async fn open(&mut self, address: &str, player_state: PlayerState) -> Result<(), ConnectError> {
        match self.lifecycle {
            Lifecycle::Open => return Err(ConnectError::AlreadyOpen),
            Lifecycle::Closed => return Err(ConnectError::Closed),
            Lifecycle::Inert => {}
        }

        let address = self.config.normalize_address(address);
        let socket = Self::connect_socket(&address).await?;
        let socket = Arc::new(socket);
        let sender = PacketSender::new(Arc::clone(&socket));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handler = PacketHandler::new(
            self.id.clone(),
            DispatchTable::client_default(),
            self.listener.clone(),
            sender.clone(),
        );

        self.active.store(true, Ordering::Release);
        self.lifecycle = Lifecycle::Open;
        self.receiver = Some(spawn_receive_loop(
            socket,
            handler,
            Arc::clone(&self.active),
            shutdown_rx,
            &self.config,
        ));
        self.shutdown = Some(shutdown_tx);
        self.sender = Some(sender);

        if let Some(peer) = self.peer_addr() {
            info!("Connected to server at {}", peer);
        }

        let request = NetPacket::connection_request(&self.id, player_state);
        if let Err(e) = self.send_packet_to_server(&request).await {
            error!("Error sending connection request to server: {}", e);
            return Err(ConnectError::ConnectionRequest(e));
        }

        Ok(())
    }

    /// Loads the player state from a save file, then opens
    pub async fn open_with_save_file(
        &mut self,
        address: &str,
        save_file: impl AsRef<Path>,
    ) -> Result<(), ConnectError> {
        let player_state = load_player_state(save_file)?;
        self.open(address, player_state).await
    }

    /// Resolves `address` and connects a fresh socket to the first result
    ///
    /// The socket only leaves this function fully connected; on any error it
    /// is dropped here.
    async fn connect_socket(address: &str) -> Result<UdpSocket, ConnectError> {
        let remote = lookup_host(address)
            .await
            .map_err(|source| ConnectError::Resolve {
                address: address.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| ConnectError::NoAddress(address.to_string()))?;

        let local = match remote.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };

        let socket = UdpSocket::bind(local).await.map_err(ConnectError::Bind)?;
        socket.connect(remote).await.map_err(ConnectError::Bind)?;
        Ok(socket)
    }

    /// Encodes and sends one packet to the server
    pub async fn send_packet_to_server(&self, packet: &NetPacket) -> Result<(), SendError> {
        let sender = self.sender.as_ref().ok_or(SendError::NotConnected)?;
        sender.send_packet(packet).await
    }

    /// Marks the connection inactive and tells the server we are leaving
    ///
    /// The flag is cleared before anything else, and the receive task is
    /// woken so it exits even while blocked on a read. Closing twice is a
    /// no-op.
    pub async fn close(&mut self) -> Result<(), SendError> {
        self.active.store(false, Ordering::Release);

        match self.lifecycle {
            Lifecycle::Closed => return Ok(()),
            Lifecycle::Inert => {
                self.lifecycle = Lifecycle::Closed;
                return Err(SendError::NotConnected);
            }
            Lifecycle::Open => {}
        }
        self.lifecycle = Lifecycle::Closed;

        if let Some(shutdown) = self.shutdown.take() {
            // The receiver is gone only if the task already finished
            let _ = shutdown.send(true);
        }

        let sender = self.sender.take().ok_or(SendError::NotConnected)?;
        sender
            .send_packet(&NetPacket::disconnect_request(&self.id))
            .await
    }

    /// Waits for the receive task to finish; only meaningful after `close`
    pub async fn join_receiver(&mut self) {
        if let Some(handle) = self.receiver.take() {
            if let Err(e) = handle.await {
                error!("Receive loop panicked: {}", e);
            }
        }
    }
}

impl Default for RemoteClientConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RemoteClientConnection {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::GenerateMapPacket;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    #[test]
    fn test_new_connection_is_inert() {
        let connection = RemoteClientConnection::new();
        assert!(!connection.is_active());
        assert!(connection.peer_addr().is_none());
        assert_eq!(connection.connection_type(), ConnectionType::LanClient);
        assert!(Uuid::parse_str(connection.id()).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = RemoteClientConnection::new();
        let b = RemoteClientConnection::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_send_packet_to_client_without_listener() {
        let connection = RemoteClientConnection::new();
        assert!(connection.send_packet_to_client(NetPacket::ping()).is_err());
    }

    #[test]
    fn test_send_packet_to_client_with_listener() {
        let mut connection = RemoteClientConnection::new();
        connection.set_client_listener(Arc::new(|_packet: NetPacket| -> Result<(), ListenerError> {
            Ok(())
        }));
        assert!(connection.send_packet_to_client(NetPacket::ping()).is_ok());
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let connection = RemoteClientConnection::new();
        let result = connection
            .send_packet_to_server(&NetPacket::disconnect_request("x"))
            .await;
        assert!(matches!(result, Err(SendError::NotConnected)));
    }

    #[tokio::test]
    async fn test_unresolvable_address_leaves_connection_inactive() {
        let mut connection = RemoteClientConnection::new();
        let result = connection.open("256.256.256.256:1", json!({})).await;

        assert!(matches!(result, Err(ConnectError::Resolve { .. })));
        assert!(!connection.is_active());
        assert!(connection.peer_addr().is_none());
    }

    #[tokio::test]
    async fn test_closed_connection_cannot_reopen() {
        let mut connection = RemoteClientConnection::new();
        assert!(matches!(connection.close().await, Err(SendError::NotConnected)));
        assert!(matches!(connection.close().await, Ok(())));

        let result = connection.open("127.0.0.1:1", json!({})).await;
        assert!(matches!(result, Err(ConnectError::Closed)));
        assert!(!connection.is_active());
    }

    #[test]
    fn test_missing_save_file_fails_open() {
        let mut connection = RemoteClientConnection::new();
        let dir = tempfile::tempdir().unwrap();
        let result = tokio_test::block_on(
            connection.open_with_save_file("127.0.0.1", dir.path().join("none.json")),
        );

        assert!(matches!(result, Err(ConnectError::StateLoad(_))));
        assert!(!connection.is_active());
    }

    #[tokio::test]
    async fn test_failed_connection_request_keeps_connection_open() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let mut connection = RemoteClientConnection::new();
        connection.set_client_listener(Arc::new(
            move |packet: NetPacket| -> Result<(), ListenerError> {
                sink.lock().unwrap().push(packet);
                Ok(())
            },
        ));

        // Hex ids barely compress, so the frame ends up well past the
        // largest possible UDP datagram
        let filler: String = (0..8000)
            .map(|_| Uuid::new_v4().simple().to_string())
            .collect();
        let result = connection
            .open(
                &server.local_addr().unwrap().to_string(),
                json!({ "filler": filler }),
            )
            .await;

        assert!(matches!(
            result,
            Err(ConnectError::ConnectionRequest(SendError::Io(_)))
        ));
        assert!(connection.is_active());

        let client_port = connection.local_addr().unwrap().port();
        let packet = NetPacket::GenerateMap(GenerateMapPacket { region_type: 3 });
        server
            .send_to(
                &packet.encode().unwrap(),
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), client_port),
            )
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while received.lock().unwrap().is_empty() && Instant::now() < deadline {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(received.lock().unwrap().as_slice(), &[packet]);

        connection.close().await.unwrap();
    }
}
