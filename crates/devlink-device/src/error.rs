/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The underlying link failed or closed; the session is dead.
    #[error("transport error: {0}")]
    Transport(#[from] devlink_mux::MuxError),

    /// The connection could not be established.
    #[error("connect error: {0}")]
    Connect(#[from] devlink_transport::TransportError),

    /// Malformed or out-of-order response on a protocol channel.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device lock is held by another session.
    #[error("device is locked by another session")]
    LockConflict,

    /// This session holds no device lock.
    #[error("device is not locked by this session")]
    NotLocked,

    /// The device reported the operation failed.
    #[error("device error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
