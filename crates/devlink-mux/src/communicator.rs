use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::mux::{lock, FrameSink, Mux, MuxShared, Shutdown};

/// Transparent packet output: one `send` call becomes exactly one frame.
///
/// The caller controls message boundaries; the sender imposes no queuing or
/// backpressure of its own.
pub struct PacketSender {
    shared: Arc<MuxShared>,
    channel: u8,
}

impl PacketSender {
    pub fn new(mux: &Mux, channel: u8) -> Self {
        Self {
            shared: Arc::clone(mux.shared()),
            channel,
        }
    }

    /// Send one payload as one frame.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        self.shared.send(self.channel, payload)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

/// Transparent stream output: bytes are forwarded as frames, but boundaries
/// carry no meaning for the consumer, so long writes may be split.
pub struct StreamSender {
    shared: Arc<MuxShared>,
    channel: u8,
}

impl StreamSender {
    pub fn new(mux: &Mux, channel: u8) -> Self {
        Self {
            shared: Arc::clone(mux.shared()),
            channel,
        }
    }

    /// Forward bytes down the channel.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        // An empty frame carries nothing a stream consumer could observe.
        if bytes.is_empty() {
            return Ok(());
        }
        for chunk in bytes.chunks(self.shared.max_payload()) {
            self.shared.send(self.channel, chunk)?;
        }
        Ok(())
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

struct InboxState<B> {
    buf: B,
    shutdown: Option<Shutdown>,
}

struct Inbox<B> {
    state: Mutex<InboxState<B>>,
    ready: Condvar,
}

impl<B> Inbox<B> {
    fn new(buf: B) -> Self {
        Self {
            state: Mutex::new(InboxState {
                buf,
                shutdown: None,
            }),
            ready: Condvar::new(),
        }
    }

    fn close(&self, shutdown: &Shutdown) {
        let mut state = lock(&self.state);
        if state.shutdown.is_none() {
            state.shutdown = Some(shutdown.clone());
            self.ready.notify_all();
        }
    }
}

type PacketInbox = Inbox<VecDeque<Bytes>>;
type StreamInbox = Inbox<BytesMut>;

impl FrameSink for PacketInbox {
    fn deliver(&self, payload: Bytes) {
        let mut state = lock(&self.state);
        state.buf.push_back(payload);
        self.ready.notify_one();
    }

    fn close(&self, shutdown: &Shutdown) {
        Inbox::close(self, shutdown);
    }
}

impl FrameSink for StreamInbox {
    fn deliver(&self, payload: Bytes) {
        let mut state = lock(&self.state);
        state.buf.extend_from_slice(&payload);
        self.ready.notify_one();
    }

    fn close(&self, shutdown: &Shutdown) {
        Inbox::close(self, shutdown);
    }
}

/// Unbounded buffered packet input: every inbound frame is queued whole, in
/// arrival order, until the consumer takes it.
///
/// The queue has no capacity limit; a slow consumer grows it without bound.
pub struct PacketReceiver {
    inbox: Arc<PacketInbox>,
    channel: u8,
}

impl PacketReceiver {
    /// Attach to `channel` as its single receiver.
    pub fn new(mux: &Mux, channel: u8) -> Result<Self> {
        let inbox = Arc::new(PacketInbox::new(VecDeque::new()));
        mux.shared()
            .register(channel, Arc::clone(&inbox) as Arc<dyn FrameSink>)?;
        Ok(Self { inbox, channel })
    }

    /// Take the oldest queued payload, blocking until one arrives.
    ///
    /// Queued payloads remain retrievable after the mux closes; once the
    /// queue is drained, returns the terminal error.
    pub fn recv(&self) -> Result<Bytes> {
        let mut state = lock(&self.inbox.state);
        loop {
            if let Some(payload) = state.buf.pop_front() {
                return Ok(payload);
            }
            if let Some(shutdown) = &state.shutdown {
                return Err(shutdown.to_error());
            }
            state = self
                .inbox
                .ready
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Like [`recv`](Self::recv), but gives up after `timeout`, returning
    /// `Ok(None)`. The protocol itself never times out; this exists for
    /// callers layering an external timeout policy.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.inbox.state);
        loop {
            if let Some(payload) = state.buf.pop_front() {
                return Ok(Some(payload));
            }
            if let Some(shutdown) = &state.shutdown {
                return Err(shutdown.to_error());
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, _) = self
                .inbox
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state = guard;
        }
    }

    /// Number of payloads currently queued.
    pub fn len(&self) -> usize {
        lock(&self.inbox.state).buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

/// Unbounded buffered stream input: inbound payloads are appended to one
/// byte buffer; reads drain it without respecting frame boundaries.
pub struct StreamReceiver {
    inbox: Arc<StreamInbox>,
    channel: u8,
}

impl StreamReceiver {
    /// Attach to `channel` as its single receiver.
    pub fn new(mux: &Mux, channel: u8) -> Result<Self> {
        let inbox = Arc::new(StreamInbox::new(BytesMut::new()));
        mux.shared()
            .register(channel, Arc::clone(&inbox) as Arc<dyn FrameSink>)?;
        Ok(Self { inbox, channel })
    }

    /// Read available bytes into `buf`, blocking until at least one byte is
    /// present. Returns `Ok(0)` once the channel has closed cleanly and the
    /// buffer is drained; a failed link surfaces as the terminal error.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = lock(&self.inbox.state);
        loop {
            if !state.buf.is_empty() {
                let n = state.buf.len().min(buf.len());
                buf[..n].copy_from_slice(&state.buf[..n]);
                state.buf.advance(n);
                return Ok(n);
            }
            match &state.shutdown {
                Some(Shutdown::Ended) => return Ok(0),
                Some(shutdown @ Shutdown::Failed(_)) => return Err(shutdown.to_error()),
                None => {}
            }
            state = self
                .inbox
                .ready
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Like [`read`](Self::read), but gives up after `timeout`, returning
    /// `Ok(None)`. `Ok(Some(0))` still means end of stream.
    pub fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.inbox.state);
        loop {
            if !state.buf.is_empty() {
                let n = state.buf.len().min(buf.len());
                buf[..n].copy_from_slice(&state.buf[..n]);
                state.buf.advance(n);
                return Ok(Some(n));
            }
            match &state.shutdown {
                Some(Shutdown::Ended) => return Ok(Some(0)),
                Some(shutdown @ Shutdown::Failed(_)) => return Err(shutdown.to_error()),
                None => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, _) = self
                .inbox
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state = guard;
        }
    }

    /// Bytes currently buffered.
    pub fn available(&self) -> usize {
        lock(&self.inbox.state).buf.len()
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}
