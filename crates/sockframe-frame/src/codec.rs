use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Packet header: total length (2) + kind (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Default ceiling on the total encoded size of one packet.
pub const DEFAULT_MAX_WIRE_SIZE: u16 = u16::MAX;

/// Default reassembly buffer capacity: room for two maximum-size packets.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2 * DEFAULT_MAX_WIRE_SIZE as usize;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total packet length including this header.
    pub wire_len: u16,
    pub kind: u16,
}

impl Header {
    pub fn payload_len(&self) -> usize {
        usize::from(self.wire_len).saturating_sub(HEADER_SIZE)
    }
}

/// Encode the four header bytes.
///
/// Wire format (all fields big-endian):
/// ```text
/// ┌──────────────┬───────────┬──────────────────────┐
/// │ Length (2B)  │ Kind (2B) │ Payload              │
/// │ 4 + payload  │           │ (Length - 4 bytes)   │
/// └──────────────┴───────────┴──────────────────────┘
/// ```
pub fn encode_header(wire_len: u16, kind: u16) -> [u8; HEADER_SIZE] {
    let [l0, l1] = wire_len.to_be_bytes();
    let [k0, k1] = kind.to_be_bytes();
    [l0, l1, k0, k1]
}

/// Append a complete encoded packet to `dst`.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) {
    dst.reserve(usize::from(packet.wire_len()));
    dst.put_slice(&encode_header(packet.wire_len(), packet.kind()));
    dst.put_slice(packet.payload());
}

/// Read the header at the front of `src`, if all four bytes are present.
pub fn peek_header(src: &[u8]) -> Option<Header> {
    if src.len() < HEADER_SIZE {
        return None;
    }
    Some(Header {
        wire_len: u16::from_be_bytes([src[0], src[1]]),
        kind: u16::from_be_bytes([src[2], src[3]]),
    })
}

/// Reject declared lengths that cannot describe a packet.
pub fn check_wire_len(wire_len: u16, max_wire_size: u16) -> Result<()> {
    if usize::from(wire_len) < HEADER_SIZE || wire_len > max_wire_size {
        return Err(FrameError::MalformedLength { declared: wire_len });
    }
    Ok(())
}

/// Configuration for packet construction and reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum total encoded packet size. Default: 65535.
    pub max_wire_size: u16,
    /// Reassembly buffer capacity. Must be at least `max_wire_size`.
    pub buffer_capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_wire_size: DEFAULT_MAX_WIRE_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

#[cfg(feature = "async")]
pub use self::tokio_codec::PacketCodec;

#[cfg(feature = "async")]
mod tokio_codec {
    use bytes::BytesMut;
    use tokio_util::codec::{Decoder, Encoder};

    use super::{check_wire_len, encode_packet, peek_header, DEFAULT_MAX_WIRE_SIZE, HEADER_SIZE};
    use crate::error::{FrameError, Result};
    use crate::packet::Packet;

    /// `tokio_util` codec for the same wire format, for use with `Framed`.
    #[derive(Debug, Clone, Copy)]
    pub struct PacketCodec {
        max_wire_size: u16,
    }

    impl PacketCodec {
        pub fn new() -> Self {
            Self::with_max_wire_size(DEFAULT_MAX_WIRE_SIZE)
        }

        pub fn with_max_wire_size(max_wire_size: u16) -> Self {
            Self { max_wire_size }
        }
    }

    impl Default for PacketCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Decoder for PacketCodec {
        type Item = Packet;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
            let Some(header) = peek_header(src) else {
                return Ok(None);
            };
            check_wire_len(header.wire_len, self.max_wire_size)?;

            let total = usize::from(header.wire_len);
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let raw = src.split_to(total);
            Packet::try_new(header.kind, &raw[HEADER_SIZE..], self.max_wire_size).map(Some)
        }
    }

    impl Encoder<&Packet> for PacketCodec {
        type Error = FrameError;

        fn encode(&mut self, packet: &Packet, dst: &mut BytesMut) -> Result<()> {
            if usize::from(self.max_wire_size) < HEADER_SIZE {
                return Err(FrameError::WireSizeTooSmall {
                    max_wire_size: self.max_wire_size,
                    min: HEADER_SIZE,
                });
            }
            if packet.wire_len() > self.max_wire_size {
                return Err(FrameError::PayloadTooLarge {
                    size: packet.payload().len(),
                    max: usize::from(self.max_wire_size) - HEADER_SIZE,
                });
            }
            encode_packet(packet, dst);
            Ok(())
        }
    }

    impl Encoder<Packet> for PacketCodec {
        type Error = FrameError;

        fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<()> {
            <Self as Encoder<&Packet>>::encode(self, &packet, dst)
        }
    }

    #[cfg(test)]
    mod tests {
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{Decoder, Framed};

        use super::*;

        #[test]
        fn decode_waits_for_complete_packet() {
            let mut wire = BytesMut::new();
            encode_packet(&Packet::new(7, b"async"), &mut wire);
            let mut partial = wire.split_to(6);

            let mut codec = PacketCodec::new();
            assert!(codec.decode(&mut partial).unwrap().is_none());

            partial.unsplit(wire);
            let packet = codec.decode(&mut partial).unwrap().unwrap();
            assert_eq!(packet.kind(), 7);
            assert_eq!(packet.payload(), b"async");
            assert!(partial.is_empty());
        }

        #[test]
        fn decode_rejects_short_length() {
            let mut wire = BytesMut::from(&[0x00, 0x02, 0x00, 0x01][..]);
            let err = PacketCodec::new().decode(&mut wire).unwrap_err();
            assert!(matches!(err, FrameError::MalformedLength { declared: 2 }));
        }

        #[test]
        fn encode_respects_codec_ceiling() {
            let mut codec = PacketCodec::with_max_wire_size(8);
            let mut dst = BytesMut::new();
            let err = codec.encode(Packet::new(1, b"too long"), &mut dst).unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
            assert!(dst.is_empty());
        }

        #[test]
        fn encode_rejects_ceiling_below_header() {
            let mut codec = PacketCodec::with_max_wire_size(3);
            let mut dst = BytesMut::new();
            let err = codec.encode(Packet::new(1, b""), &mut dst).unwrap_err();
            assert!(matches!(err, FrameError::WireSizeTooSmall { max_wire_size: 3, min: 4 }));
            assert!(dst.is_empty());
        }

        #[tokio::test]
        async fn framed_duplex_roundtrip() {
            let (left, right) = tokio::io::duplex(64);
            let mut writer = Framed::new(left, PacketCodec::new());
            let mut reader = Framed::new(right, PacketCodec::new());

            let sender = tokio::spawn(async move {
                writer.send(Packet::new(1, b"first")).await.unwrap();
                writer.send(Packet::new(2, b"")).await.unwrap();
                writer.send(Packet::new(3, vec![0xEE; 200])).await.unwrap();
            });

            let first = reader.next().await.unwrap().unwrap();
            let second = reader.next().await.unwrap().unwrap();
            let third = reader.next().await.unwrap().unwrap();
            sender.await.unwrap();

            assert_eq!((first.kind(), first.payload()), (1, b"first".as_ref()));
            assert_eq!(second.wire_len(), 4);
            assert_eq!(third.payload().len(), 200);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian() {
        assert_eq!(encode_header(0x0102, 0x0304), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn encode_packet_layout() {
        let mut buf = BytesMut::new();
        encode_packet(&Packet::new(0x0A0B, b"hi"), &mut buf);
        assert_eq!(buf.as_ref(), &[0x00, 0x06, 0x0A, 0x0B, b'h', b'i']);
    }

    #[test]
    fn peek_header_needs_four_bytes() {
        assert!(peek_header(&[0x00, 0x04, 0x00]).is_none());
        let header = peek_header(&[0x00, 0x09, 0x00, 0x03, 0xFF]).unwrap();
        assert_eq!(header.wire_len, 9);
        assert_eq!(header.kind, 3);
        assert_eq!(header.payload_len(), 5);
    }

    #[test]
    fn check_wire_len_bounds() {
        assert!(check_wire_len(4, DEFAULT_MAX_WIRE_SIZE).is_ok());
        assert!(check_wire_len(3, DEFAULT_MAX_WIRE_SIZE).is_err());
        assert!(check_wire_len(0, DEFAULT_MAX_WIRE_SIZE).is_err());
        assert!(check_wire_len(100, 64).is_err());
    }

    #[test]
    fn default_config_doubles_capacity() {
        let config = FrameConfig::default();
        assert_eq!(config.max_wire_size, 65535);
        assert_eq!(config.buffer_capacity, 131070);
    }
}
