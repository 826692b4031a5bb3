//! Socket calls on borrowed descriptors, built on `socket2`.
//!
//! Everything here returns `io::Result` and knows nothing about packets or
//! error reporting.

use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::os::fd::{BorrowedFd, OwnedFd};

use socket2::{Domain, MaybeUninitSlice, SockAddr, SockRef, Type};

use crate::option::SocketOption;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;

/// One datagram read by [`recv_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Received {
    pub(crate) len: usize,
    pub(crate) from: SocketAddr,
    /// The datagram was longer than the buffer and its tail was discarded.
    pub(crate) truncated: bool,
}

fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: `MaybeUninit<u8>` has the layout of `u8`, and the socket calls
    // only ever write initialised bytes through the slice.
    unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) }
}

fn socket_addr(addr: &SockAddr) -> io::Result<SocketAddr> {
    addr.as_socket().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "unsupported socket address family",
        )
    })
}

fn buffer_size(value: i32) -> io::Result<usize> {
    usize::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("negative buffer size {value}"),
        )
    })
}

/// Create a close-on-exec socket of `ty` in the family of `addr`.
///
/// On Apple targets socket2 also sets `SO_NOSIGPIPE`.
pub(crate) fn socket(addr: &SocketAddr, ty: Type) -> io::Result<OwnedFd> {
    let socket = socket2::Socket::new(Domain::for_address(*addr), ty, None)?;
    Ok(socket.into())
}

pub(crate) fn set_option(fd: BorrowedFd<'_>, option: SocketOption, value: i32) -> io::Result<()> {
    let socket = SockRef::from(&fd);
    match option {
        SocketOption::ReuseAddr => socket.set_reuse_address(value != 0),
        SocketOption::KeepAlive => socket.set_keepalive(value != 0),
        SocketOption::Broadcast => socket.set_broadcast(value != 0),
        SocketOption::RecvBuffer => socket.set_recv_buffer_size(buffer_size(value)?),
        SocketOption::SendBuffer => socket.set_send_buffer_size(buffer_size(value)?),
    }
}

pub(crate) fn get_option(fd: BorrowedFd<'_>, option: SocketOption) -> io::Result<i32> {
    let socket = SockRef::from(&fd);
    let size = |size: usize| i32::try_from(size).unwrap_or(i32::MAX);
    Ok(match option {
        SocketOption::ReuseAddr => i32::from(socket.reuse_address()?),
        SocketOption::KeepAlive => i32::from(socket.keepalive()?),
        SocketOption::Broadcast => i32::from(socket.broadcast()?),
        SocketOption::RecvBuffer => size(socket.recv_buffer_size()?),
        SocketOption::SendBuffer => size(socket.send_buffer_size()?),
    })
}

pub(crate) fn bind(fd: BorrowedFd<'_>, addr: &SocketAddr) -> io::Result<()> {
    SockRef::from(&fd).bind(&SockAddr::from(*addr))
}

pub(crate) fn connect(fd: BorrowedFd<'_>, addr: &SocketAddr) -> io::Result<()> {
    SockRef::from(&fd).connect(&SockAddr::from(*addr))
}

pub(crate) fn listen(fd: BorrowedFd<'_>, backlog: i32) -> io::Result<()> {
    SockRef::from(&fd).listen(backlog)
}

/// Accept a connection as a close-on-exec descriptor.
pub(crate) fn accept(fd: BorrowedFd<'_>) -> io::Result<(OwnedFd, SocketAddr)> {
    let (socket, peer) = SockRef::from(&fd).accept()?;
    Ok((socket.into(), socket_addr(&peer)?))
}

pub(crate) fn local_addr(fd: BorrowedFd<'_>) -> io::Result<SocketAddr> {
    socket_addr(&SockRef::from(&fd).local_addr()?)
}

pub(crate) fn send(fd: BorrowedFd<'_>, buf: &[u8], flags: i32) -> io::Result<usize> {
    SockRef::from(&fd).send_with_flags(buf, flags | SEND_FLAGS)
}

pub(crate) fn recv(fd: BorrowedFd<'_>, buf: &mut [u8], flags: i32) -> io::Result<usize> {
    SockRef::from(&fd).recv_with_flags(as_uninit(buf), flags)
}

pub(crate) fn send_to(
    fd: BorrowedFd<'_>,
    buf: &[u8],
    addr: &SocketAddr,
    flags: i32,
) -> io::Result<usize> {
    SockRef::from(&fd).send_to_with_flags(buf, &SockAddr::from(*addr), flags | SEND_FLAGS)
}

/// Read one datagram and note whether the OS had to cut it short.
pub(crate) fn recv_from(fd: BorrowedFd<'_>, buf: &mut [u8], flags: i32) -> io::Result<Received> {
    let mut bufs = [MaybeUninitSlice::new(as_uninit(buf))];
    let (len, recv_flags, from) =
        SockRef::from(&fd).recv_from_vectored_with_flags(&mut bufs, flags)?;
    Ok(Received {
        len,
        from: socket_addr(&from)?,
        truncated: recv_flags.is_truncated(),
    })
}
