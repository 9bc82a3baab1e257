use protocol::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that keep a connection from opening
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} did not resolve to any address")]
    NoAddress(String),

    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),

    #[error("connection is already open")]
    AlreadyOpen,

    #[error("connection was closed and cannot be reopened")]
    Closed,

    #[error(transparent)]
    StateLoad(#[from] StateError),

    /// The socket is up and the receive loop is running, but the server
    /// never got our connection request
    #[error("failed to send connection request: {0}")]
    ConnectionRequest(#[source] SendError),
}

/// Failures while putting a packet on the wire
#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection is not open")]
    NotConnected,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("socket write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("failed to read save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse save file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
