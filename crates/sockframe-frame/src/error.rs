/// Errors that can occur while building, encoding or reassembling packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit under the configured wire size ceiling.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The wire size ceiling cannot hold even a packet header.
    #[error("max wire size {max_wire_size} is below the {min}-byte header")]
    WireSizeTooSmall { max_wire_size: u16, min: usize },

    /// The reassembly buffer is smaller than one maximum-size packet.
    #[error("packet buffer too small ({capacity} bytes, need at least {min})")]
    BufferTooSmall { capacity: usize, min: usize },

    /// A header declared a total length the stream cannot contain.
    #[error("malformed packet length {declared}")]
    MalformedLength { declared: u16 },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before a complete packet arrived.
    #[error("connection closed by peer")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
