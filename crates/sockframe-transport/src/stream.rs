use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use bytes::BytesMut;
use socket2::Type;
use sockframe_frame::{fill_until_packet, write_packet, ErrorEvent, ErrorKind, FrameError};
use sockframe_frame::{Packet, PacketBuffer, Reporter};
use tracing::{debug, info};

use crate::address::Address;
use crate::endpoint::PacketTransport;
use crate::error::{Result, TransportError};
use crate::socket::Socket;

/// A connected TCP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamEndpoint {
    socket: Socket,
}

impl StreamEndpoint {
    /// Connect to `server` (blocking).
    pub fn connect(server: Address) -> Result<Self> {
        Self::connect_with_reporter(server, Reporter::global())
    }

    pub fn connect_with_reporter(server: Address, reporter: Reporter) -> Result<Self> {
        let socket = Socket::open(server, Type::STREAM, reporter)?;
        socket.connect(server)?;
        info!(fd = socket.raw_fd(), %server, "connected");
        Ok(Self { socket })
    }

    /// Bind to `local` first, then connect to `server`.
    pub fn connect_from(server: Address, local: Address) -> Result<Self> {
        let socket = Socket::open(server, Type::STREAM, Reporter::global())?;
        socket.bind(local)?;
        socket.connect(server)?;
        info!(fd = socket.raw_fd(), %server, %local, "connected");
        Ok(Self { socket })
    }

    pub(crate) fn from_socket(socket: Socket) -> Self {
        Self { socket }
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

    /// The peer this stream is connected to.
    pub fn peer_address(&self) -> Address {
        self.socket.address()
    }

    fn hangup(&self) -> TransportError {
        debug!(fd = self.raw_fd(), "peer hung up");
        self.socket
            .reporter()
            .report(ErrorEvent::new(ErrorKind::PeerHangup).on_descriptor(self.raw_fd()));
        TransportError::PeerHangup
    }
}

impl PacketTransport for StreamEndpoint {
    fn send_with(&self, packet: &Packet, _to: Option<&Address>, flags: Option<i32>) -> Result<()> {
        let flags = flags.unwrap_or(self.socket.send_flags());
        let mut scratch = BytesMut::with_capacity(usize::from(packet.wire_len()));

        match write_packet(&mut self.socket.io(flags), packet, &mut scratch) {
            Ok(()) => Ok(()),
            Err(FrameError::Io(err)) => {
                Err(self.socket.fail(ErrorKind::Send, err, TransportError::Send))
            }
            Err(FrameError::ConnectionClosed) => Err(self.socket.fail(
                ErrorKind::Send,
                io::Error::from(io::ErrorKind::WriteZero),
                TransportError::Send,
            )),
            Err(other) => Err(other.into()),
        }
    }

    fn receive_with(&self, buffer: &mut PacketBuffer, flags: Option<i32>) -> Result<Address> {
        let flags = flags.unwrap_or(self.socket.receive_flags());

        match fill_until_packet(&mut self.socket.io(flags), buffer) {
            Ok(()) => Ok(self.peer_address()),
            Err(FrameError::ConnectionClosed) => Err(self.hangup()),
            Err(FrameError::Io(err)) => Err(self.socket.fail_receive(err)),
            Err(other) => Err(other.into()),
        }
    }
}

impl AsRawFd for StreamEndpoint {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

impl AsFd for StreamEndpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}
