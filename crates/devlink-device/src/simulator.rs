use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use devlink_mux::{channel, Mux, PacketReceiver, PacketSender, StreamReceiver, StreamSender};
use tracing::{debug, error};

use crate::controller;
use crate::uploader;
use crate::uploader::CHUNK_SIZE;

/// In-process peer speaking the device side of the link protocols.
///
/// Serves the control and file-transfer channels, echoes program input back
/// as program output, and greets on the log channel. The file table is
/// shared across connections, so a session can write a file and a later
/// session can read it back.
pub struct DeviceSimulator {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Default for DeviceSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSimulator {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed a file into the simulated filesystem.
    pub fn insert_file(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files_lock().insert(path.into(), content.into());
    }

    /// Look up a file in the simulated filesystem.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files_lock().get(path).cloned()
    }

    fn files_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve one connection until its link closes.
    pub fn serve(&self, reader: impl Read + Send + 'static, writer: impl Write + Send + 'static) {
        if let Err(err) = self.serve_inner(reader, writer) {
            error!(%err, "simulator session ended abnormally");
        }
    }

    fn serve_inner(
        &self,
        reader: impl Read + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> devlink_mux::Result<()> {
        let mux = Mux::new(reader, writer);
        let control_rx = PacketReceiver::new(&mux, channel::CONTROL)?;
        let control_tx = PacketSender::new(&mux, channel::CONTROL);
        let files_rx = PacketReceiver::new(&mux, channel::FILES)?;
        let files_tx = PacketSender::new(&mux, channel::FILES);
        let program_rx = StreamReceiver::new(&mux, channel::PROGRAM)?;
        let program_tx = StreamSender::new(&mux, channel::PROGRAM);
        let log_tx = StreamSender::new(&mux, channel::LOG);
        mux.start();

        debug!("simulator session started");
        let _ = log_tx.write(b"devlink simulator ready\n");

        std::thread::scope(|scope| {
            scope.spawn(|| self.control_loop(&control_rx, &control_tx));
            scope.spawn(|| self.files_loop(&files_rx, &files_tx));
            scope.spawn(|| program_echo(&program_rx, &program_tx));
        });
        debug!("simulator session ended");
        Ok(())
    }

    fn control_loop(&self, rx: &PacketReceiver, tx: &PacketSender) {
        let mut locked = false;
        loop {
            let request = match rx.recv() {
                Ok(request) => request,
                Err(_) => break,
            };
            let response: Vec<u8> = match request.first() {
                Some(&controller::REQUEST_LOCK) => {
                    if locked {
                        vec![controller::STATUS_LOCKED]
                    } else {
                        locked = true;
                        vec![controller::STATUS_OK]
                    }
                }
                Some(&controller::REQUEST_UNLOCK) => {
                    if locked {
                        locked = false;
                        vec![controller::STATUS_OK]
                    } else {
                        vec![controller::STATUS_NOT_LOCKED]
                    }
                }
                Some(&controller::REQUEST_STOP) => {
                    let mut response = vec![controller::STATUS_OK];
                    response.extend_from_slice(b"stopped");
                    response
                }
                _ => error_frame(controller::STATUS_ERROR, "unknown control request"),
            };
            if tx.send(&response).is_err() {
                break;
            }
        }
        // The lock dies with the connection.
    }

    fn files_loop(&self, rx: &PacketReceiver, tx: &PacketSender) {
        loop {
            let request = match rx.recv() {
                Ok(request) => request,
                Err(_) => break,
            };
            let outcome = match request.first() {
                Some(&uploader::CMD_READ) => self.handle_read(tx, &request[1..]),
                Some(&uploader::CMD_WRITE) => self.handle_write(rx, tx, &request[1..]),
                _ => tx.send(&error_frame(uploader::STATUS_ERROR, "unknown file request")),
            };
            if outcome.is_err() {
                break;
            }
        }
    }

    fn handle_read(&self, tx: &PacketSender, path: &[u8]) -> devlink_mux::Result<()> {
        let path = String::from_utf8_lossy(path).into_owned();
        let content = self.files_lock().get(&path).cloned();
        match content {
            Some(content) => {
                let mut frame = Vec::with_capacity(1 + CHUNK_SIZE);
                for chunk in content.chunks(CHUNK_SIZE) {
                    frame.clear();
                    frame.push(uploader::DATA);
                    frame.extend_from_slice(chunk);
                    tx.send(&frame)?;
                }
                tx.send(&[uploader::END_OF_FILE])
            }
            None => tx.send(&error_frame(
                uploader::STATUS_ERROR,
                &format!("no such file: {path}"),
            )),
        }
    }

    fn handle_write(
        &self,
        rx: &PacketReceiver,
        tx: &PacketSender,
        path: &[u8],
    ) -> devlink_mux::Result<()> {
        let path = String::from_utf8_lossy(path).into_owned();
        let mut content = Vec::new();
        loop {
            let frame = rx.recv()?;
            match frame.first() {
                Some(&uploader::DATA) => content.extend_from_slice(&frame[1..]),
                Some(&uploader::END_OF_FILE) => break,
                _ => {
                    return tx.send(&error_frame(
                        uploader::STATUS_ERROR,
                        "unexpected frame in write transfer",
                    ))
                }
            }
        }
        self.files_lock().insert(path, content);
        tx.send(&[uploader::STATUS_OK])
    }
}

fn program_echo(rx: &StreamReceiver, tx: &StreamSender) {
    let mut buf = [0u8; 1024];
    loop {
        match rx.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.write(&buf[..n]).is_err() {
                    break;
                }
            }
        }
    }
}

fn error_frame(status: u8, message: &str) -> Vec<u8> {
    let mut response = vec![status];
    response.extend_from_slice(message.as_bytes());
    response
}
