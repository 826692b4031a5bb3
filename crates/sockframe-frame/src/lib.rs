//! Typed, length-prefixed packets and the fixed-size buffer that reassembles them.
//!
//! Every packet is framed with:
//! - a 2-byte big-endian total length (header included)
//! - a 2-byte big-endian kind
//! - the payload
//!
//! Kind `65535` is reserved for the empty packet. Failures are returned to the
//! caller and also announced on a [`Reporter`].

pub mod buffer;
pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;
pub mod report;
pub mod writer;

pub use buffer::PacketBuffer;
#[cfg(feature = "async")]
pub use codec::PacketCodec;
pub use codec::{
    encode_packet, peek_header, FrameConfig, Header, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_MAX_WIRE_SIZE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use packet::{Packet, EMPTY_PACKET_KIND};
pub use reader::{fill_until_packet, read_once, PacketReader};
pub use report::{ErrorEvent, ErrorKind, ErrorSink, Reporter};
pub use writer::{write_packet, PacketWriter};
