use protocol::{DEFAULT_PORT, RECV_BUFFER_SIZE};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Tunables for a remote connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Port appended to server addresses that do not name one
    pub default_port: u16,
    /// Largest datagram the receive loop will read
    pub recv_buffer_size: usize,
    /// Pause after a failed socket read before trying again
    pub read_error_backoff: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            recv_buffer_size: RECV_BUFFER_SIZE,
            read_error_backoff: Duration::from_millis(10),
        }
    }
}

impl ConnectionConfig {
    /// Appends the default port to `address` when it has none
    ///
    /// Accepts `host`, `host:port`, bare IPv4/IPv6 addresses and
    /// bracketed IPv6 with or without a port.
    pub fn normalize_address(&self, address: &str) -> String {
        let address = address.trim();

        if address.parse::<SocketAddr>().is_ok() {
            return address.to_string();
        }
        if let Ok(ip) = address.parse::<IpAddr>() {
            return SocketAddr::new(ip, self.default_port).to_string();
        }
        if address.starts_with('[') && address.ends_with(']') {
            return format!("{}:{}", address, self.default_port);
        }
        if !address.contains(':') {
            return format!("{}:{}", address, self.default_port);
        }

        address.to_string()
    }
}
