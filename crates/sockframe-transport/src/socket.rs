use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::Arc;

use socket2::Type;
use sockframe_frame::{ErrorKind, Reporter};
use tracing::debug;

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::io::SocketIo;
use crate::option::SocketOption;
use crate::sys;

/// Per-call flag for a receive that returns `WouldBlock` instead of waiting.
pub const DONT_WAIT: i32 = libc::MSG_DONTWAIT;

/// State shared by every endpoint kind.
///
/// Cloning a `Socket` shares the descriptor; the last clone dropped closes it.
/// Address and flags are per clone. Equality and hashing use the descriptor
/// number only.
#[derive(Clone)]
pub struct Socket {
    fd: Arc<OwnedFd>,
    address: Address,
    send_flags: i32,
    receive_flags: i32,
    reporter: Reporter,
}

impl Socket {
    /// Create a socket in the family of `address` with `SO_REUSEADDR` set.
    pub(crate) fn open(address: Address, ty: Type, reporter: Reporter) -> Result<Self> {
        let fd = sys::socket(&address.socket_addr(), ty).map_err(|err| {
            reporter.report_io(ErrorKind::SocketCreate, None, &err);
            TransportError::Socket(err)
        })?;
        let socket = Self::from_owned(fd, address, reporter);
        socket.set_option(SocketOption::ReuseAddr, 1)?;
        debug!(fd = socket.raw_fd(), %address, "socket created");
        Ok(socket)
    }

    pub(crate) fn from_owned(fd: OwnedFd, address: Address, reporter: Reporter) -> Self {
        Self {
            fd: Arc::new(fd),
            address,
            send_flags: 0,
            receive_flags: 0,
            reporter,
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Number of live handles sharing this descriptor.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.fd)
    }

    /// The address this socket was bound to, connected to, or last heard from.
    pub fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    /// The locally bound address, as reported by the OS.
    pub fn local_address(&self) -> Result<Address> {
        sys::local_addr(self.fd.as_fd())
            .map(Address::from)
            .map_err(|err| self.fail(ErrorKind::GetOption, err, TransportError::Socket))
    }

    pub fn set_option(&self, option: SocketOption, value: i32) -> Result<()> {
        sys::set_option(self.fd.as_fd(), option, value).map_err(|err| {
            self.fail(ErrorKind::SetOption, err, |source| {
                TransportError::SocketOption { option, source }
            })
        })
    }

    pub fn option(&self, option: SocketOption) -> Result<i32> {
        sys::get_option(self.fd.as_fd(), option).map_err(|err| {
            self.fail(ErrorKind::GetOption, err, |source| {
                TransportError::SocketOption { option, source }
            })
        })
    }

    pub fn send_flags(&self) -> i32 {
        self.send_flags
    }

    /// Flags used by sends that do not pass their own.
    pub fn set_send_flags(&mut self, flags: i32) {
        self.send_flags = flags;
    }

    pub fn receive_flags(&self) -> i32 {
        self.receive_flags
    }

    /// Flags used by receives that do not pass their own.
    pub fn set_receive_flags(&mut self, flags: i32) {
        self.receive_flags = flags;
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub(crate) fn bind(&self, address: Address) -> Result<()> {
        sys::bind(self.fd.as_fd(), &address.socket_addr()).map_err(|err| {
            self.fail(ErrorKind::Bind, err, |source| TransportError::Bind {
                address,
                source,
            })
        })?;
        debug!(fd = self.raw_fd(), %address, "socket bound");
        Ok(())
    }

    pub(crate) fn connect(&self, address: Address) -> Result<()> {
        sys::connect(self.fd.as_fd(), &address.socket_addr()).map_err(|err| {
            self.fail(ErrorKind::Connect, err, |source| TransportError::Connect {
                address,
                source,
            })
        })
    }

    pub(crate) fn listen(&self, backlog: i32) -> Result<()> {
        let address = self.address;
        sys::listen(self.fd.as_fd(), backlog).map_err(|err| {
            self.fail(ErrorKind::Listen, err, |source| TransportError::Listen {
                address,
                source,
            })
        })
    }

    /// `Read`/`Write` view of the descriptor using `flags` on every call.
    pub(crate) fn io(&self, flags: i32) -> SocketIo<'_> {
        SocketIo::new(self.fd.as_fd(), flags)
    }

    /// Wrap a receive failure, reporting it unless it is `WouldBlock` from a
    /// [`DONT_WAIT`] read.
    pub(crate) fn fail_receive(&self, err: io::Error) -> TransportError {
        if err.kind() == io::ErrorKind::WouldBlock {
            return TransportError::Receive(err);
        }
        self.fail(ErrorKind::Receive, err, TransportError::Receive)
    }

    /// Report an OS failure on this descriptor and wrap it.
    pub(crate) fn fail(
        &self,
        kind: ErrorKind,
        err: io::Error,
        wrap: impl FnOnce(io::Error) -> TransportError,
    ) -> TransportError {
        self.reporter.report_io(kind, Some(self.raw_fd()), &err);
        wrap(err)
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        self.raw_fd() == other.raw_fd()
    }
}

impl Eq for Socket {}

impl Hash for Socket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw_fd().hash(state);
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("fd", &self.raw_fd())
            .field("address", &self.address)
            .field("handles", &self.handle_count())
            .finish()
    }
}
