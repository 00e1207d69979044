//! Channel multiplexing and length-prefixed framing over one duplex link.
//!
//! This is the core layer of devlink. One physical connection carries several
//! independent logical conversations; every message is framed with:
//! - A 1-byte channel ID for multiplexing
//! - A 2-byte little-endian payload length
//!
//! The [`Mux`] owns the link, serializes outgoing frames from all channels,
//! and dispatches inbound frames to the communicator attached to each
//! channel. Communicators give each channel its buffering policy: transparent
//! output ([`PacketSender`], [`StreamSender`]) and unbounded buffered input
//! ([`PacketReceiver`], [`StreamReceiver`]).

pub mod channel;
pub mod codec;
pub mod communicator;
pub mod error;
pub mod mux;
pub mod reader;
pub mod writer;

#[cfg(test)]
pub(crate) mod testpipe;

pub use channel::{CONTROL, FILES, LOG, PROGRAM};
pub use codec::{decode_frame, encode_frame, Frame, MuxConfig, HEADER_SIZE, MAX_PAYLOAD};
pub use communicator::{PacketReceiver, PacketSender, StreamReceiver, StreamSender};
pub use error::{MuxError, Result};
pub use mux::Mux;
pub use reader::FrameReader;
pub use writer::FrameWriter;
