//! # Remote Game Client Connection
//!
//! Client-side transport for talking to a remote game server over UDP. A
//! [`RemoteClientConnection`] owns one socket, announces itself to the
//! server, answers pings, and forwards game packets to a
//! [`ClientListener`] supplied by the game.
//!
//! ## Architecture Overview
//!
//! Two flows of control exist per connection:
//!
//! ### Foreground
//! The game calls `open`, `send_packet_to_server` and `close`. Every call
//! that writes to the socket returns its error directly; nothing is retried.
//!
//! ### Receive Task
//! `open` spawns one tokio task that reads datagrams into a 4 KiB buffer,
//! decodes them and routes them through the [`DispatchTable`]. Nothing a
//! peer sends can stop this task: corrupt frames, unknown types, malformed
//! payloads and listener failures are logged and the datagram dropped.
//! `close` clears the active flag and wakes the task so it exits promptly.
//!
//! Writes from both sides go through one mutex-guarded [`PacketSender`].
//!
//! ## Module Organization
//!
//! - `config`: connection tunables and server address normalisation
//! - `connection`: the session lifecycle
//! - `dispatch`: per-type decoder and action table
//! - `error`: connect, send and save-file errors
//! - `listener`: the packet sink trait
//! - `network`: the send path and the receive loop
//! - `state`: loading the player state sent on connect
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::{LoggingListener, RemoteClientConnection};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connection = RemoteClientConnection::new();
//!     connection.set_client_listener(Arc::new(LoggingListener));
//!
//!     // Port 6669 is assumed when none is given
//!     connection.open("127.0.0.1", serde_json::json!({ "hero": "Druid" })).await?;
//!
//!     // ... run the game ...
//!
//!     connection.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod network;
pub mod state;

pub use config::ConnectionConfig;
pub use connection::{ConnectionType, RemoteClientConnection};
pub use dispatch::{Action, DispatchTable};
pub use error::{ConnectError, SendError, StateError};
pub use listener::{ClientListener, ListenerError, LoggingListener};
pub use network::{DatagramOutcome, PacketSender};
