use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use devlink_mux::{PacketReceiver, PacketSender};
use tracing::debug;

use crate::error::{DeviceError, Result};

/// CONTROL request: acquire the device lock.
pub const REQUEST_LOCK: u8 = 0x01;
/// CONTROL request: release the device lock.
pub const REQUEST_UNLOCK: u8 = 0x02;
/// CONTROL request: halt the running program.
pub const REQUEST_STOP: u8 = 0x03;

/// CONTROL response status: request succeeded.
pub const STATUS_OK: u8 = 0x00;
/// CONTROL response status: the lock is held elsewhere.
pub const STATUS_LOCKED: u8 = 0x01;
/// CONTROL response status: no lock was held.
pub const STATUS_NOT_LOCKED: u8 = 0x02;
/// CONTROL response status: failure, followed by a UTF-8 message.
pub const STATUS_ERROR: u8 = 0xFF;

/// Device lock/unlock/stop over the control channel.
///
/// Responses carry no correlation IDs; they are matched to requests purely by
/// arrival order. An internal gate therefore keeps at most one request in
/// flight, and the intended usage is lock → operation → unlock.
pub struct Controller {
    tx: PacketSender,
    rx: PacketReceiver,
    state: Mutex<ControllerState>,
}

struct ControllerState {
    locked: bool,
}

impl Controller {
    pub(crate) fn new(tx: PacketSender, rx: PacketReceiver) -> Self {
        Self {
            tx,
            rx,
            state: Mutex::new(ControllerState { locked: false }),
        }
    }

    /// Serializes requests and guards the local lock flag.
    fn gate(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the device lock for this session.
    ///
    /// Fails with [`DeviceError::LockConflict`] if the device reports the
    /// lock already held.
    pub fn lock(&self) -> Result<()> {
        let mut state = self.gate();
        self.tx.send(&[REQUEST_LOCK])?;
        let response = self.rx.recv()?;
        match response.first() {
            Some(&STATUS_OK) => {
                debug!("device lock acquired");
                state.locked = true;
                Ok(())
            }
            Some(&STATUS_LOCKED) => Err(DeviceError::LockConflict),
            Some(&STATUS_ERROR) => Err(remote_error(&response[1..])),
            status => Err(unexpected_status("lock", status)),
        }
    }

    /// Release the device lock held by this session.
    ///
    /// Fails with [`DeviceError::NotLocked`] if this session holds no lock;
    /// nothing is sent to the device in that case.
    pub fn unlock(&self) -> Result<()> {
        let mut state = self.gate();
        if !state.locked {
            return Err(DeviceError::NotLocked);
        }
        self.tx.send(&[REQUEST_UNLOCK])?;
        let response = self.rx.recv()?;
        match response.first() {
            Some(&STATUS_OK) => {
                debug!("device lock released");
                state.locked = false;
                Ok(())
            }
            Some(&STATUS_NOT_LOCKED) => {
                // The device disagrees with our bookkeeping, e.g. after it
                // reclaimed the lock on its own; believe the device.
                state.locked = false;
                Err(DeviceError::NotLocked)
            }
            Some(&STATUS_ERROR) => Err(remote_error(&response[1..])),
            status => Err(unexpected_status("unlock", status)),
        }
    }

    /// Halt the program running on the device.
    ///
    /// Returns the device's acknowledgement payload.
    pub fn stop(&self) -> Result<Bytes> {
        let _state = self.gate();
        self.tx.send(&[REQUEST_STOP])?;
        let response = self.rx.recv()?;
        match response.first() {
            Some(&STATUS_OK) => Ok(response.slice(1..)),
            Some(&STATUS_ERROR) => Err(remote_error(&response[1..])),
            status => Err(unexpected_status("stop", status)),
        }
    }

    /// Whether this session believes it holds the device lock.
    pub fn is_locked(&self) -> bool {
        self.gate().locked
    }
}

fn remote_error(message: &[u8]) -> DeviceError {
    DeviceError::Remote(String::from_utf8_lossy(message).into_owned())
}

fn unexpected_status(request: &str, status: Option<&u8>) -> DeviceError {
    match status {
        Some(status) => DeviceError::Protocol(format!(
            "unexpected status 0x{status:02x} in response to {request}"
        )),
        None => DeviceError::Protocol(format!("empty response to {request}")),
    }
}

#[cfg(test)]
mod tests {
    use crate::device::Device;
    use crate::error::DeviceError;
    use crate::simulator::DeviceSimulator;
    use crate::testpipe::duplex;

    fn session() -> (Device, std::thread::JoinHandle<()>) {
        let ((host_reader, host_writer), (sim_reader, sim_writer)) = duplex();
        let sim = DeviceSimulator::new();
        let serve = std::thread::spawn(move || sim.serve(sim_reader, sim_writer));
        let device = Device::new(host_reader, host_writer).unwrap();
        (device, serve)
    }

    #[test]
    fn lock_then_unlock() {
        let (device, serve) = session();

        device.controller.lock().unwrap();
        assert!(device.controller.is_locked());
        device.controller.unlock().unwrap();
        assert!(!device.controller.is_locked());

        device.close();
        serve.join().unwrap();
    }

    #[test]
    fn second_lock_reports_conflict() {
        let (device, serve) = session();

        device.controller.lock().unwrap();
        let err = device.controller.lock().unwrap_err();
        assert!(matches!(err, DeviceError::LockConflict));

        // The original lock is still held and releasable.
        device.controller.unlock().unwrap();

        device.close();
        serve.join().unwrap();
    }

    #[test]
    fn unlock_without_lock_fails_locally() {
        let (device, serve) = session();

        let err = device.controller.unlock().unwrap_err();
        assert!(matches!(err, DeviceError::NotLocked));

        // No state changed on either end: the lock is still free.
        device.controller.lock().unwrap();
        device.controller.unlock().unwrap();

        device.close();
        serve.join().unwrap();
    }

    #[test]
    fn stop_returns_device_acknowledgement() {
        let (device, serve) = session();

        let ack = device.controller.stop().unwrap();
        assert_eq!(ack.as_ref(), b"stopped");

        device.close();
        serve.join().unwrap();
    }
}
