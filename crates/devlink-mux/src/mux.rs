use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::codec::{Frame, MuxConfig};
use crate::error::{MuxError, Result};
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// Why the mux stopped.
#[derive(Debug, Clone)]
pub(crate) enum Shutdown {
    /// The link reached EOF or the mux was closed locally.
    Ended,
    /// The link failed with the recorded reason.
    Failed(String),
}

impl Shutdown {
    pub(crate) fn to_error(&self) -> MuxError {
        match self {
            Shutdown::Ended => MuxError::ConnectionClosed,
            Shutdown::Failed(reason) => MuxError::TransportFailed(reason.clone()),
        }
    }
}

/// Receiving end of a channel, as seen from the dispatch path.
///
/// Implementations only enqueue; they must never block, since they run on
/// the mux's reader thread. `close` must be idempotent.
pub(crate) trait FrameSink: Send + Sync {
    fn deliver(&self, payload: Bytes);
    fn close(&self, shutdown: &Shutdown);
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct MuxState {
    started: bool,
    shutdown: Option<Shutdown>,
}

pub(crate) struct MuxShared {
    writer: Mutex<Option<FrameWriter<Box<dyn Write + Send>>>>,
    channels: Mutex<HashMap<u8, Arc<dyn FrameSink>>>,
    state: Mutex<MuxState>,
    state_changed: Condvar,
    max_payload: usize,
}

impl MuxShared {
    /// Write one complete frame. Concurrent callers are serialized; a frame's
    /// bytes are never interleaved with another's.
    pub(crate) fn send(&self, channel: u8, payload: &[u8]) -> Result<()> {
        if let Some(shutdown) = lock(&self.state).shutdown.as_ref() {
            return Err(shutdown.to_error());
        }

        let mut writer_slot = lock(&self.writer);
        let Some(writer) = writer_slot.as_mut() else {
            return Err(MuxError::ConnectionClosed);
        };
        match writer.send(channel, payload) {
            Ok(()) => Ok(()),
            Err(err @ MuxError::PayloadTooLarge { .. }) => Err(err),
            Err(err) => {
                // The link is broken; tear everything down.
                drop(writer_slot);
                self.close(Shutdown::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    pub(crate) fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Attach the single receiver slot for a channel.
    pub(crate) fn register(&self, channel: u8, sink: Arc<dyn FrameSink>) -> Result<()> {
        {
            let mut channels = lock(&self.channels);
            if channels.contains_key(&channel) {
                return Err(MuxError::ChannelBusy(channel));
            }
            channels.insert(channel, Arc::clone(&sink));
        }
        // The mux may have died between construction and attach; the sink
        // must still observe the terminal state.
        if let Some(shutdown) = lock(&self.state).shutdown.as_ref() {
            sink.close(shutdown);
        }
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.state).shutdown.is_some()
    }

    fn start(&self) {
        let mut state = lock(&self.state);
        if !state.started {
            state.started = true;
            self.state_changed.notify_all();
        }
    }

    /// Park the reader thread until `start` or `close`. Returns false if the
    /// mux shut down before dispatch ever began.
    fn wait_for_start(&self) -> bool {
        let mut state = lock(&self.state);
        loop {
            if state.shutdown.is_some() {
                return false;
            }
            if state.started {
                return true;
            }
            state = self
                .state_changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn close(&self, shutdown: Shutdown) {
        {
            let mut state = lock(&self.state);
            if state.shutdown.is_some() {
                return;
            }
            state.shutdown = Some(shutdown.clone());
            self.state_changed.notify_all();
        }
        debug!(?shutdown, "mux shut down");
        // Drop our write half so the peer observes EOF even while our own
        // reader thread is still parked on its read half.
        *lock(&self.writer) = None;
        let sinks: Vec<Arc<dyn FrameSink>> = lock(&self.channels).values().cloned().collect();
        for sink in sinks {
            sink.close(&shutdown);
        }
    }

    fn dispatch(&self, frame: Frame) {
        trace!(
            channel = frame.channel,
            len = frame.payload.len(),
            "frame received"
        );
        let sink = lock(&self.channels).get(&frame.channel).cloned();
        match sink {
            Some(sink) => sink.deliver(frame.payload),
            None => warn!(
                channel = frame.channel,
                len = frame.payload.len(),
                "dropping frame for channel with no receiver"
            ),
        }
    }
}

/// Multiplexes logical channels over one duplex byte stream.
///
/// The mux takes exclusive ownership of the link's two halves. A background
/// reader thread parses inbound bytes into frames and hands each to the
/// receiver attached to its channel; outbound sends from any thread are
/// serialized so frames never interleave on the wire.
///
/// Construction is two-phase: attach receivers first, then call
/// [`start`](Self::start) to begin inbound dispatch. Frames arriving for a
/// channel with no receiver are logged and dropped, so starting before the
/// channel set is complete loses data.
///
/// When the link ends or fails, every attached receiver is closed exactly
/// once with the terminal reason and all subsequent operations fail. No
/// channel outlives its mux.
pub struct Mux {
    shared: Arc<MuxShared>,
    reader: Option<JoinHandle<()>>,
}

impl Mux {
    /// Build a mux over the link's read and write halves.
    pub fn new(reader: impl Read + Send + 'static, writer: impl Write + Send + 'static) -> Self {
        Self::with_config(reader, writer, MuxConfig::default())
    }

    /// Build a mux with explicit configuration.
    pub fn with_config(
        reader: impl Read + Send + 'static,
        writer: impl Write + Send + 'static,
        config: MuxConfig,
    ) -> Self {
        let shared = Arc::new(MuxShared {
            writer: Mutex::new(Some(FrameWriter::with_config(
                Box::new(writer) as Box<dyn Write + Send>,
                config.clone(),
            ))),
            channels: Mutex::new(HashMap::new()),
            state: Mutex::new(MuxState {
                started: false,
                shutdown: None,
            }),
            state_changed: Condvar::new(),
            max_payload: config.max_payload_size,
        });

        let frame_reader =
            FrameReader::with_config(Box::new(reader) as Box<dyn Read + Send>, config);
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || run_reader(thread_shared, frame_reader));

        Self {
            shared,
            reader: Some(handle),
        }
    }

    /// Begin inbound dispatch. Sends work before this; receives don't.
    pub fn start(&self) {
        self.shared.start();
    }

    /// Send one complete frame on a channel.
    pub fn send(&self, channel: u8, payload: &[u8]) -> Result<()> {
        self.shared.send(channel, payload)
    }

    /// Whether the mux has been torn down.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the mux locally. Attached receivers observe the close; the
    /// reader thread exits once the transport unblocks it.
    pub fn close(&self) {
        self.shared.close(Shutdown::Ended);
    }

    pub(crate) fn shared(&self) -> &Arc<MuxShared> {
        &self.shared
    }
}

impl Drop for Mux {
    fn drop(&mut self) {
        self.shared.close(Shutdown::Ended);
        // The reader thread is detached; it exits on its own once the
        // transport reports EOF or an error.
        self.reader.take();
    }
}

fn run_reader(shared: Arc<MuxShared>, mut reader: FrameReader<Box<dyn Read + Send>>) {
    if !shared.wait_for_start() {
        return;
    }
    debug!("mux reader started");
    loop {
        if shared.is_closed() {
            break;
        }
        match reader.read_frame() {
            Ok(frame) => shared.dispatch(frame),
            Err(MuxError::ConnectionClosed) => {
                shared.close(Shutdown::Ended);
                break;
            }
            Err(err) => {
                shared.close(Shutdown::Failed(err.to_string()));
                break;
            }
        }
    }
    debug!("mux reader stopped");
}
