use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use socket2::Type;
use sockframe_frame::codec::encode_header;
use sockframe_frame::{ErrorKind, FrameError, Packet, PacketBuffer, Reporter};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::endpoint::PacketTransport;
use crate::error::{Result, TransportError};
use crate::socket::Socket;
use crate::sys;

/// A UDP endpoint.
///
/// A packet goes out as up to three datagrams: the 2-byte length, the 2-byte
/// kind, and the payload (omitted when empty). The receiver reassembles them
/// in its [`PacketBuffer`], so a lost or reordered datagram corrupts the
/// stream. Use only on loss-free paths such as loopback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatagramEndpoint {
    socket: Socket,
}

impl DatagramEndpoint {
    /// Unbound socket whose default destination is `address`.
    pub fn new(address: Address) -> Result<Self> {
        Self::with_reporter(address, Reporter::global())
    }

    pub fn with_reporter(address: Address, reporter: Reporter) -> Result<Self> {
        let socket = Socket::open(address, Type::DGRAM, reporter)?;
        Ok(Self { socket })
    }

    /// Create and bind to `address` in one step.
    pub fn bound(address: Address) -> Result<Self> {
        let endpoint = Self::new(address)?;
        endpoint.bind()?;
        Ok(endpoint)
    }

    /// Bind to the stored address.
    pub fn bind(&self) -> Result<()> {
        let address = self.socket.address();
        self.socket.bind(address)?;
        info!(fd = self.raw_fd(), %address, "datagram socket bound");
        Ok(())
    }

    /// Replace the stored address, then bind to it.
    ///
    /// `address` must be in the same family the socket was created with.
    pub fn bind_to(&mut self, address: Address) -> Result<()> {
        self.socket.set_address(address);
        self.bind()
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }

    pub fn raw_fd(&self) -> RawFd {
        self.socket.raw_fd()
    }

    fn send_datagram(&self, bytes: &[u8], to: &Address, flags: i32) -> Result<()> {
        loop {
            match sys::send_to(self.socket.as_fd(), bytes, &to.socket_addr(), flags) {
                Ok(_) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(self.socket.fail(ErrorKind::Send, err, TransportError::Send))
                }
            }
        }
    }
}

impl PacketTransport for DatagramEndpoint {
    fn send_with(&self, packet: &Packet, to: Option<&Address>, flags: Option<i32>) -> Result<()> {
        let to = to.copied().unwrap_or(self.socket.address());
        let flags = flags.unwrap_or(self.socket.send_flags());

        let header = encode_header(packet.wire_len(), packet.kind());
        self.send_datagram(&header[..2], &to, flags)?;
        self.send_datagram(&header[2..], &to, flags)?;
        if !packet.payload().is_empty() {
            self.send_datagram(packet.payload(), &to, flags)?;
        }
        debug!(fd = self.raw_fd(), %to, kind = packet.kind(), "packet sent");
        Ok(())
    }

    /// Each datagram is read into the buffer's whole free tail. A datagram
    /// longer than that space is discarded along with the retained bytes and
    /// reported as a receive failure.
    fn receive_with(&self, buffer: &mut PacketBuffer, flags: Option<i32>) -> Result<Address> {
        let flags = flags.unwrap_or(self.socket.receive_flags());
        if buffer.available_write_space() == 0 {
            return Err(FrameError::BufferTooSmall {
                capacity: buffer.capacity(),
                min: usize::from(buffer.max_wire_size()),
            }
            .into());
        }

        loop {
            match sys::recv_from(self.socket.as_fd(), buffer.write_space(), flags) {
                Ok(received) if received.truncated => {
                    warn!(
                        fd = self.raw_fd(),
                        from = %received.from,
                        space = received.len,
                        "datagram larger than free buffer space"
                    );
                    buffer.clear();
                    let err = io::Error::new(io::ErrorKind::InvalidData, "datagram truncated");
                    return Err(self.socket.fail(ErrorKind::Receive, err, TransportError::Receive));
                }
                // Empty datagrams carry no bytes for the buffer.
                Ok(received) if received.len == 0 => continue,
                Ok(received) => {
                    buffer.ingest(received.len);
                    if buffer.has_packet() {
                        return Ok(Address::from(received.from));
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.socket.fail_receive(err)),
            }
        }
    }
}

impl AsRawFd for DatagramEndpoint {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

impl AsFd for DatagramEndpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}
