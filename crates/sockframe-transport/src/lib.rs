//! Stream (TCP) and datagram (UDP) endpoints that exchange sockframe packets.
//!
//! Endpoints wrap a raw socket descriptor held behind an `Arc`, so cloning an
//! endpoint (for example into a selector) shares the socket and the last
//! clone closes it. Calls block unless [`DONT_WAIT`] is passed as the
//! receive flags.
//!
//! ```no_run
//! use sockframe_frame::{Packet, PacketBuffer};
//! use sockframe_transport::{Address, Listener, PacketTransport, StreamEndpoint};
//!
//! let listener = Listener::bind(Address::new("127.0.0.1", 7000)?, Listener::DEFAULT_BACKLOG)?;
//! let client = StreamEndpoint::connect(Address::new("127.0.0.1", 7000)?)?;
//! let server = listener.accept()?;
//!
//! client.send(&Packet::new(1, b"hello"))?;
//! let mut buffer = PacketBuffer::new();
//! server.receive(&mut buffer)?;
//! assert_eq!(buffer.pop_packet().unwrap().payload(), b"hello");
//! # Ok::<(), sockframe_transport::TransportError>(())
//! ```

pub mod address;
pub mod error;
pub mod option;

#[cfg(unix)]
pub mod datagram;
#[cfg(unix)]
pub mod endpoint;
#[cfg(unix)]
mod io;
#[cfg(unix)]
pub mod listener;
#[cfg(unix)]
pub mod socket;
#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
mod sys;

pub use address::Address;
pub use error::{Result, TransportError};
pub use option::SocketOption;

#[cfg(unix)]
pub use datagram::DatagramEndpoint;
#[cfg(unix)]
pub use endpoint::{Endpoint, PacketTransport};
#[cfg(unix)]
pub use listener::Listener;
#[cfg(unix)]
pub use socket::{Socket, DONT_WAIT};
#[cfg(unix)]
pub use stream::StreamEndpoint;
