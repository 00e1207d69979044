use std::io::{Read, Write};

use devlink_mux::{channel, Mux, PacketReceiver, PacketSender, StreamReceiver, StreamSender};
use devlink_transport::LinkStream;

use crate::controller::Controller;
use crate::error::Result;
use crate::uploader::Uploader;

/// One device session over one physical link.
///
/// Construction wires the fixed channel set onto a fresh mux; every field
/// lives exactly as long as the session. The session holds no global state,
/// so a process can talk to several devices at once.
pub struct Device {
    /// Lock/unlock/stop protocol on the control channel.
    pub controller: Controller,
    /// File read/write protocol on the file-transfer channel.
    pub uploader: Uploader,
    /// Input to the program running on the device.
    pub program_input: StreamSender,
    /// Output of the program running on the device.
    pub program_output: StreamReceiver,
    /// Device log output.
    pub log_output: StreamReceiver,
    mux: Mux,
    link: Option<LinkStream>,
}

impl Device {
    /// Build a session over the link's read and write halves.
    pub fn new(
        reader: impl Read + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> Result<Self> {
        Self::from_parts(Mux::new(reader, writer), None)
    }

    pub(crate) fn from_parts(mux: Mux, link: Option<LinkStream>) -> Result<Self> {
        let controller = Controller::new(
            PacketSender::new(&mux, channel::CONTROL),
            PacketReceiver::new(&mux, channel::CONTROL)?,
        );
        let uploader = Uploader::new(
            PacketSender::new(&mux, channel::FILES),
            PacketReceiver::new(&mux, channel::FILES)?,
        );
        let program_input = StreamSender::new(&mux, channel::PROGRAM);
        let program_output = StreamReceiver::new(&mux, channel::PROGRAM)?;
        let log_output = StreamReceiver::new(&mux, channel::LOG)?;

        // All receiver slots are attached; inbound dispatch may begin.
        mux.start();

        Ok(Self {
            controller,
            uploader,
            program_input,
            program_output,
            log_output,
            mux,
            link,
        })
    }

    /// Tear the session down: close the mux and, when the link supports it,
    /// shut the transport so the reader thread unblocks immediately.
    pub fn close(&self) {
        self.mux.close();
        if let Some(link) = &self.link {
            let _ = link.shutdown();
        }
    }

    /// Whether the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.mux.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
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
    fn program_io_roundtrips_through_the_simulator() {
        let (device, serve) = session();

        device.program_input.write(b"print('hi')\n").unwrap();

        let mut collected = Vec::new();
        let mut buf = [0u8; 64];
        while collected.len() < 12 {
            let n = device.program_output.read(&mut buf).unwrap();
            assert!(n > 0, "program output ended early");
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"print('hi')\n");

        device.close();
        serve.join().unwrap();
    }

    #[test]
    fn log_channel_carries_the_simulator_greeting() {
        let (device, serve) = session();

        let mut collected = Vec::new();
        let mut buf = [0u8; 64];
        while !collected.ends_with(b"\n") {
            let n = device.log_output.read(&mut buf).unwrap();
            assert!(n > 0, "log ended before greeting");
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"devlink simulator ready\n");

        device.close();
        serve.join().unwrap();
    }

    #[test]
    fn independent_sessions_do_not_share_state() {
        let (first, first_serve) = session();
        let (second, second_serve) = session();

        // Each session talks to its own simulator; locks are independent.
        first.controller.lock().unwrap();
        second.controller.lock().unwrap();
        first.controller.unlock().unwrap();
        second.controller.unlock().unwrap();

        first.close();
        second.close();
        first_serve.join().unwrap();
        second_serve.join().unwrap();
    }

    #[test]
    fn close_wakes_blocked_readers() {
        let (device, serve) = session();
        let device = std::sync::Arc::new(device);

        let reader_device = std::sync::Arc::clone(&device);
        let pending = std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader_device.program_output.read(&mut buf)
        });

        // Give the reader a moment to park before tearing the session down.
        std::thread::sleep(Duration::from_millis(20));
        device.close();

        // A locally closed session ends the stream cleanly.
        let read = pending.join().unwrap().unwrap();
        assert_eq!(read, 0);
        serve.join().unwrap();
    }
}
