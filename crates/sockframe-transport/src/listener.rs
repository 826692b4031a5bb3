use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use socket2::Type;
use sockframe_frame::{ErrorKind, Reporter};
use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::socket::Socket;
use crate::stream::StreamEndpoint;
use crate::sys;

/// A listening TCP socket.
///
/// Convert into an [`Endpoint`](crate::Endpoint) to watch it with a selector;
/// it reports readable when a connection is waiting to be accepted.
#[derive(Debug)]
pub struct Listener {
    socket: Socket,
}

impl Listener {
    /// Default pending-connection queue length.
    pub const DEFAULT_BACKLOG: i32 = 10;

    /// Create, bind and listen on `address` (blocking).
    pub fn bind(address: Address, backlog: i32) -> Result<Self> {
        Self::bind_with_reporter(address, backlog, Reporter::global())
    }

    pub fn bind_with_reporter(address: Address, backlog: i32, reporter: Reporter) -> Result<Self> {
        let socket = Socket::open(address, Type::STREAM, reporter)?;
        socket.bind(address)?;
        socket.listen(backlog)?;
        info!(fd = socket.raw_fd(), %address, backlog, "listening");
        Ok(Self { socket })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<StreamEndpoint> {
        self.accept_with_reporter(self.socket.reporter().clone())
    }

    /// Accept, giving the new stream its own reporter.
    pub fn accept_with_reporter(&self, reporter: Reporter) -> Result<StreamEndpoint> {
        let (fd, peer) = loop {
            match sys::accept(self.socket.as_fd()) {
                Ok(accepted) => break accepted,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(self.socket.fail(ErrorKind::Accept, err, TransportError::Accept))
                }
            }
        };
        let peer = Address::from(peer);
        let stream = StreamEndpoint::from_socket(Socket::from_owned(fd, peer, reporter));
        debug!(listener = self.raw_fd(), fd = stream.raw_fd(), %peer, "accepted connection");
        Ok(stream)
    }

    /// The bound address, with the real port when bound to port 0.
    pub fn local_address(&self) -> Result<Address> {
        self.socket.local_address()
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn raw_fd(&self) -> RawFd {
        self.socket.raw_fd()
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

impl AsFd for Listener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}
