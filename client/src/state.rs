//! Loading the saved player state sent with the connection request
//!
//! The state is opaque to the connection: whatever JSON the save file holds
//! is forwarded to the server untouched.

use crate::error::StateError;
use log::debug;
use protocol::PlayerState;
use std::fs;
use std::path::Path;

pub fn load_player_state(path: impl AsRef<Path>) -> Result<PlayerState, StateError> {
    let path = path.as_ref();
    let contents = fs::read(path).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let state = serde_json::from_slice(&contents).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded player state from {}", path.display());
    Ok(state)
}
