use sockframe_frame::FrameError;

use crate::address::Address;
use crate::option::SocketOption;

/// Errors that can occur in socket transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The OS refused to create a socket.
    #[error("failed to create socket: {0}")]
    Socket(std::io::Error),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: Address,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: Address,
        source: std::io::Error,
    },

    /// Failed to start listening on a bound socket.
    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: Address,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Setting or reading a socket option failed.
    #[error("socket option {option:?} failed: {source}")]
    SocketOption {
        option: SocketOption,
        source: std::io::Error,
    },

    /// A send call failed before the whole packet was written.
    #[error("send failed: {0}")]
    Send(std::io::Error),

    /// A receive call failed.
    #[error("receive failed: {0}")]
    Receive(std::io::Error),

    /// The remote end closed the stream.
    #[error("peer closed the connection")]
    PeerHangup,

    /// Text that does not name an IP address and port.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Packet construction or reassembly failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
