/// Errors that can occur in framing and multiplexing.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The payload exceeds what a single frame can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link ended (EOF or explicit close).
    #[error("link closed")]
    ConnectionClosed,

    /// The link failed; the mux has been torn down.
    #[error("link failed: {0}")]
    TransportFailed(String),

    /// A receiver is already attached to this channel.
    #[error("channel {0} already has a receiver attached")]
    ChannelBusy(u8),
}

pub type Result<T> = std::result::Result<T, MuxError>;
