use std::path::PathBuf;

/// Errors surfaced by transporters and the packet stream beneath them.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local socket.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a destination socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on a stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A packet header carried the wrong magic bytes.
    #[error("invalid packet magic (expected 0x5457 \"TW\")")]
    InvalidMagic,

    /// A packet payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stream closed before a complete packet arrived.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,

    /// Another transporter already serves this address.
    #[error("address already in use: {0}")]
    AddressInUse(String),

    /// No transporter serves the destination address.
    #[error("destination unreachable: {0}")]
    Unreachable(String),

    /// The transporter has been stopped.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
