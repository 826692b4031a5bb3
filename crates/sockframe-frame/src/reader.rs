use std::io::{ErrorKind, Read};

use crate::buffer::PacketBuffer;
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Perform exactly one successful read into `buffer.read_window()` and ingest it.
///
/// Interrupted reads are resumed. A zero-byte read maps to
/// [`FrameError::ConnectionClosed`]. Returns the number of bytes read.
pub fn read_once<R: Read + ?Sized>(src: &mut R, buffer: &mut PacketBuffer) -> Result<usize> {
    if buffer.read_window().is_empty() {
        return Err(FrameError::BufferTooSmall {
            capacity: buffer.capacity(),
            min: usize::from(buffer.max_wire_size()),
        });
    }

    loop {
        match src.read(buffer.read_window()) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => {
                buffer.ingest(n);
                return Ok(n);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}

/// Read until `buffer` holds at least one complete packet.
///
/// Always issues at least one read, even when a packet is already queued.
pub fn fill_until_packet<R: Read + ?Sized>(src: &mut R, buffer: &mut PacketBuffer) -> Result<()> {
    loop {
        read_once(src, buffer)?;
        if buffer.has_packet() {
            return Ok(());
        }
    }
}

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads internally. Callers always get complete packets.
#[derive(Debug)]
pub struct PacketReader<T> {
    inner: T,
    buffer: PacketBuffer,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_buffer(inner, PacketBuffer::new())
    }

    pub fn with_buffer(inner: T, buffer: PacketBuffer) -> Self {
        Self { inner, buffer }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.buffer.pop_packet() {
                return Ok(packet);
            }
            read_once(&mut self.inner, &mut self.buffer)?;
        }
    }

    pub fn buffer(&self) -> &PacketBuffer {
        &self.buffer
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
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_packet, FrameConfig};
    use crate::report::{CollectingSink, ErrorKind as ReportKind, Reporter};

    fn wire(packets: &[Packet]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for packet in packets {
            encode_packet(packet, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_packet() {
        let mut reader = PacketReader::new(Cursor::new(wire(&[Packet::new(1, b"hello")])));
        let packet = reader.read_packet().unwrap();
        assert_eq!(packet.kind(), 1);
        assert_eq!(packet.payload(), b"hello");
    }

    #[test]
    fn read_multiple_packets_in_order() {
        let bytes = wire(&[
            Packet::new(1, b"one"),
            Packet::new(2, b"two"),
            Packet::new(3, b"three"),
        ]);
        let mut reader = PacketReader::new(Cursor::new(bytes));

        let kinds: Vec<u16> = (0..3).map(|_| reader.read_packet().unwrap().kind()).collect();
        assert_eq!(kinds, [1, 2, 3]);
    }

    #[test]
    fn partial_read_handling() {
        let reader = ByteByByteReader {
            bytes: wire(&[Packet::new(4, b"slow")]),
            pos: 0,
        };
        let mut reader = PacketReader::new(reader);
        let packet = reader.read_packet().unwrap();
        assert_eq!((packet.kind(), packet.payload()), (4, b"slow".as_ref()));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = PacketReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_packet().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn connection_closed_mid_packet() {
        let bytes = wire(&[Packet::new(2, b"only-part")]);
        let mut reader = PacketReader::new(Cursor::new(bytes[..7].to_vec()));
        assert!(matches!(
            reader.read_packet().unwrap_err(),
            FrameError::ConnectionClosed
        ));
        assert_eq!(reader.buffer().filled_bytes(), 7);
    }

    #[test]
    fn fill_always_reads_once() {
        let mut buffer = PacketBuffer::new();
        buffer.push_bytes(&wire(&[Packet::new(1, b"queued")]));
        assert!(buffer.has_packet());

        let mut src = Cursor::new(Vec::<u8>::new());
        let err = fill_until_packet(&mut src, &mut buffer).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(buffer.packet_count(), 1);
    }

    #[test]
    fn unusable_buffer_is_rejected_before_reading() {
        let sink = Arc::new(CollectingSink::default());
        let config = FrameConfig {
            max_wire_size: 64,
            buffer_capacity: 8,
        };
        let mut buffer = PacketBuffer::with_config(config, Reporter::from_arc(sink.clone()));
        let mut src = Cursor::new(vec![0u8; 16]);

        let err = read_once(&mut src, &mut buffer).unwrap_err();

        assert!(matches!(err, FrameError::BufferTooSmall { capacity: 0, min: 64 }));
        assert_eq!(src.position(), 0);
        assert_eq!(sink.count_of(ReportKind::UndersizedBuffer), 1);
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = FlakyReader {
            first: Some(std::io::ErrorKind::WouldBlock),
            bytes: wire(&[Packet::new(7, b"ok")]),
            pos: 0,
        };
        let mut reader = PacketReader::new(reader);
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == std::io::ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FlakyReader {
            first: Some(std::io::ErrorKind::Interrupted),
            bytes: wire(&[Packet::new(8, b"ok")]),
            pos: 0,
        };
        let mut reader = PacketReader::new(reader);
        let packet = reader.read_packet().unwrap();
        assert_eq!((packet.kind(), packet.payload()), (8, b"ok".as_ref()));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::PacketWriter::new(left);
        let mut reader = PacketReader::new(right);

        let writer_thread = std::thread::spawn(move || {
            for i in 0..64u16 {
                writer
                    .write_packet(&Packet::new(i % 5, format!("msg-{i}")))
                    .unwrap();
            }
        });

        for i in 0..64u16 {
            let packet = reader.read_packet().unwrap();
            assert_eq!(packet.kind(), i % 5);
            assert_eq!(packet.payload(), format!("msg-{i}").as_bytes());
        }
        writer_thread.join().unwrap();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FlakyReader {
        first: Option<std::io::ErrorKind>,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.first.take() {
                return Err(std::io::Error::from(kind));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
