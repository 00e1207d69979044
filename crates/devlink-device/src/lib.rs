//! Device sessions and the protocols spoken over them.
//!
//! A [`Device`] owns one mux over one physical link and exposes the fixed
//! channel set: the [`Controller`] (lock/unlock/stop), the [`Uploader`]
//! (remote file read/write), and raw stream conduits for program I/O and the
//! device log. Several independent sessions can coexist in one process;
//! nothing here is global.

pub mod connector;
pub mod controller;
pub mod device;
pub mod error;
pub mod simulator;
pub mod uploader;

#[cfg(test)]
pub(crate) mod testpipe;

pub use connector::{connect, connect_with_timeout};
pub use controller::Controller;
pub use device::Device;
pub use error::{DeviceError, Result};
pub use simulator::DeviceSimulator;
pub use uploader::{Uploader, CHUNK_SIZE};
