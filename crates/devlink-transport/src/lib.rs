//! Duplex byte-stream transports for devlink device sessions.
//!
//! A device session needs nothing from its physical connection beyond a
//! bidirectional byte stream: writes go out, bytes arrive, the connection
//! eventually ends or fails. [`LinkStream`] is that contract as a concrete
//! type; [`TcpLink`] produces one over a TCP socket. Serial adapters and other
//! media plug in the same way by yielding a `LinkStream`.
//!
//! No framing lives here. Everything above is built by `devlink-mux`.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpLink;
pub use traits::LinkStream;
