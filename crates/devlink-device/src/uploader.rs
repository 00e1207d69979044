use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use devlink_mux::{PacketReceiver, PacketSender};
use tracing::debug;

use crate::error::{DeviceError, Result};

/// FILES request: read the file at the attached path.
pub const CMD_READ: u8 = 0x01;
/// FILES request: write the file at the attached path.
pub const CMD_WRITE: u8 = 0x02;
/// FILES transfer frame: one chunk of file content.
pub const DATA: u8 = 0x10;
/// FILES transfer frame: end of file content.
pub const END_OF_FILE: u8 = 0x11;
/// FILES response status: operation succeeded.
pub const STATUS_OK: u8 = 0x00;
/// FILES response status: failure, followed by a UTF-8 message.
pub const STATUS_ERROR: u8 = 0xFF;

/// Largest file chunk carried in one DATA frame.
pub const CHUNK_SIZE: usize = 4096;

/// Remote file read/write over the file-transfer channel.
///
/// Like the controller, responses carry no correlation IDs, so at most one
/// transfer is in flight at a time; an internal gate enforces it.
pub struct Uploader {
    tx: PacketSender,
    rx: PacketReceiver,
    transfer: Mutex<()>,
}

impl Uploader {
    pub(crate) fn new(tx: PacketSender, rx: PacketReceiver) -> Self {
        Self {
            tx,
            rx,
            transfer: Mutex::new(()),
        }
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.transfer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the remote file at `path`.
    ///
    /// Chunks arrive in order and are concatenated; a device-reported error
    /// aborts the transfer but leaves the channel usable.
    pub fn read_file(&self, path: &str) -> Result<Bytes> {
        let _transfer = self.gate();
        self.tx.send(&request(CMD_READ, path))?;

        let mut data = BytesMut::new();
        loop {
            let frame = self.rx.recv()?;
            match frame.first() {
                Some(&DATA) => data.extend_from_slice(&frame[1..]),
                Some(&END_OF_FILE) => {
                    debug!(path, len = data.len(), "file read complete");
                    return Ok(data.freeze());
                }
                Some(&STATUS_ERROR) => return Err(remote_error(&frame[1..])),
                status => return Err(unexpected_frame("read", status)),
            }
        }
    }

    /// Write `data` to the remote file at `path`.
    ///
    /// Content goes out in [`CHUNK_SIZE`] pieces followed by an end-of-file
    /// marker; the device answers with one completion status.
    pub fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let _transfer = self.gate();
        self.tx.send(&request(CMD_WRITE, path))?;

        let mut frame = Vec::with_capacity(1 + CHUNK_SIZE);
        for chunk in data.chunks(CHUNK_SIZE) {
            frame.clear();
            frame.push(DATA);
            frame.extend_from_slice(chunk);
            self.tx.send(&frame)?;
        }
        self.tx.send(&[END_OF_FILE])?;

        let response = self.rx.recv()?;
        match response.first() {
            Some(&STATUS_OK) => {
                debug!(path, len = data.len(), "file write complete");
                Ok(())
            }
            Some(&STATUS_ERROR) => Err(remote_error(&response[1..])),
            status => Err(unexpected_frame("write", status)),
        }
    }
}

fn request(cmd: u8, path: &str) -> Vec<u8> {
    let mut request = Vec::with_capacity(1 + path.len());
    request.push(cmd);
    request.extend_from_slice(path.as_bytes());
    request
}

fn remote_error(message: &[u8]) -> DeviceError {
    DeviceError::Remote(String::from_utf8_lossy(message).into_owned())
}

fn unexpected_frame(transfer: &str, tag: Option<&u8>) -> DeviceError {
    match tag {
        Some(tag) => DeviceError::Protocol(format!(
            "unexpected frame tag 0x{tag:02x} during {transfer} transfer"
        )),
        None => DeviceError::Protocol(format!("empty frame during {transfer} transfer")),
    }
}
