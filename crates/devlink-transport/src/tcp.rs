use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::LinkStream;

/// TCP transport.
///
/// Connects to a device exposing its link on a TCP port, typically a
/// serial-to-network bridge or a device with native networking.
pub struct TcpLink;

impl TcpLink {
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Connect to `addr` (`host:port`), blocking.
    pub fn connect(addr: &str) -> Result<LinkStream> {
        Self::connect_with_timeout(addr, Self::DEFAULT_CONNECT_TIMEOUT)
    }

    /// Connect to `addr` with an explicit connect timeout.
    pub fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<LinkStream> {
        let mut resolved = addr
            .to_socket_addrs()
            .map_err(|err| TransportError::InvalidAddress {
                addr: addr.to_string(),
                reason: err.to_string(),
            })?;
        let socket_addr = resolved.next().ok_or_else(|| TransportError::InvalidAddress {
            addr: addr.to_string(),
            reason: "no addresses resolved".to_string(),
        })?;

        let stream = TcpStream::connect_timeout(&socket_addr, timeout).map_err(|err| {
            TransportError::Connect {
                addr: addr.to_string(),
                source: err,
            }
        })?;

        // Frames are small; waiting for coalescing only adds latency.
        stream.set_nodelay(true)?;

        debug!(%addr, "connected to device over tcp");
        Ok(LinkStream::from_tcp(stream))
    }
}
