//! Fixed channel IDs.
//!
//! The channel set is static and known to both ends of the link ahead of
//! time; there is no negotiation. IDs 3-254 are unassigned.

/// Device lock/unlock/stop requests and responses (packet mode).
pub const CONTROL: u8 = 0;

/// Remote file read/write transfers (packet mode).
pub const FILES: u8 = 1;

/// Running program's stdin/stdout (stream mode, both directions).
pub const PROGRAM: u8 = 2;

/// Device log output (stream mode, device to host only).
pub const LOG: u8 = 255;

/// Returns a human-readable name for a channel ID.
pub fn channel_name(id: u8) -> &'static str {
    match id {
        CONTROL => "CONTROL",
        FILES => "FILES",
        PROGRAM => "PROGRAM",
        LOG => "LOG",
        _ => "UNASSIGNED",
    }
}
