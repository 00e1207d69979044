use std::time::Duration;

use devlink_mux::Mux;
use devlink_transport::TcpLink;

use crate::device::Device;
use crate::error::Result;

/// Connect to a device listening on `addr` (`host:port`).
pub fn connect(addr: &str) -> Result<Device> {
    connect_with_timeout(addr, TcpLink::DEFAULT_CONNECT_TIMEOUT)
}

/// Connect with an explicit connect timeout.
pub fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Device> {
    let link = TcpLink::connect_with_timeout(addr, timeout)?;
    let reader = link.try_clone()?;
    let writer = link.try_clone()?;
    // The original handle stays with the session so `close` can shut the
    // socket down and unblock the reader thread.
    Device::from_parts(Mux::new(reader, writer), Some(link))
}
