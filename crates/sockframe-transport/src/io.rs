use std::io::{self, Read, Write};
use std::os::fd::BorrowedFd;

use crate::sys;

/// `Read`/`Write` over a borrowed socket, passing fixed flags to recv/send.
///
/// Lets the generic packet loops in `sockframe_frame` drive a raw socket.
#[derive(Debug)]
pub(crate) struct SocketIo<'a> {
    fd: BorrowedFd<'a>,
    flags: i32,
}

impl<'a> SocketIo<'a> {
    pub(crate) fn new(fd: BorrowedFd<'a>, flags: i32) -> Self {
        Self { fd, flags }
    }
}

impl Read for SocketIo<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        sys::recv(self.fd, buf, self.flags)
    }
}

impl Write for SocketIo<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        sys::send(self.fd, buf, self.flags)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
