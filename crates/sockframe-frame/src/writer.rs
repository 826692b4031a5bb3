use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::encode_packet;
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Encode `packet` into `scratch` and write all of it to `dst`.
///
/// Partial writes are continued and interrupted writes resumed. Any other
/// error aborts the packet; no retry is attempted.
pub fn write_packet<W: Write + ?Sized>(
    dst: &mut W,
    packet: &Packet,
    scratch: &mut BytesMut,
) -> Result<()> {
    scratch.clear();
    encode_packet(packet, scratch);

    let mut offset = 0usize;
    while offset < scratch.len() {
        match dst.write(&scratch[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

/// Writes complete packets to any `Write` stream.
#[derive(Debug)]
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> PacketWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Write a complete packet and flush (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        write_packet(&mut self.inner, packet, &mut self.buf)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::buffer::PacketBuffer;

    fn decode_all(bytes: &[u8]) -> Vec<Packet> {
        let mut buffer = PacketBuffer::new();
        buffer.push_bytes(bytes);
        buffer.drain_packets().collect()
    }

    #[test]
    fn write_single_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_packet(&Packet::new(1, b"hello")).unwrap();

        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[..4], &[0x00, 0x09, 0x00, 0x01]);
        assert_eq!(decode_all(&bytes), [Packet::new(1, b"hello")]);
    }

    #[test]
    fn write_multiple_packets() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let packets = [
            Packet::new(1, b"one"),
            Packet::new(2, b""),
            Packet::new(3, b"three"),
        ];
        for packet in &packets {
            writer.write_packet(packet).unwrap();
        }

        assert_eq!(decode_all(&writer.into_inner().into_inner()), packets);
    }

    #[test]
    fn partial_writes_are_continued() {
        let mut dst = TrickleWriter::default();
        let mut scratch = BytesMut::new();
        write_packet(&mut dst, &Packet::new(9, b"trickle"), &mut scratch).unwrap();
        assert_eq!(dst.writes, 11);
        assert_eq!(decode_all(&dst.data), [Packet::new(9, b"trickle")]);
    }

    #[test]
    fn handles_interrupted_write() {
        let mut dst = FailOnceWriter {
            kind: Some(ErrorKind::Interrupted),
            data: Vec::new(),
        };
        write_packet(&mut dst, &Packet::new(5, b"retry"), &mut BytesMut::new()).unwrap();
        assert_eq!(dst.data.len(), 9);
    }

    #[test]
    fn would_block_aborts_the_packet() {
        let mut dst = FailOnceWriter {
            kind: Some(ErrorKind::WouldBlock),
            data: Vec::new(),
        };
        let err = write_packet(&mut dst, &Packet::new(6, b"x"), &mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
        assert!(dst.data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer.write_packet(&Packet::new(1, b"x")).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct TrickleWriter {
        data: Vec<u8>,
        writes: usize,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailOnceWriter {
        kind: Option<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FailOnceWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.kind.take() {
                return Err(std::io::Error::from(kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
