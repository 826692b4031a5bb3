use bytes::{Bytes, BytesMut};

use crate::codec::{DEFAULT_MAX_WIRE_SIZE, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::report::{ErrorEvent, ErrorKind, Reporter};

/// Kind value reserved for the empty packet.
pub const EMPTY_PACKET_KIND: u16 = u16::MAX;

/// A typed message with a bounded wire size.
///
/// The wire length is `payload.len() + 4` and never changes after
/// construction. Constructing with [`EMPTY_PACKET_KIND`], or with a payload
/// that does not fit, yields the canonical empty packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: u16,
    wire_len: u16,
    payload: BytesMut,
}

impl Packet {
    /// Build a packet under the default 65535-byte ceiling.
    ///
    /// An oversized payload is reported on the process-wide reporter and
    /// degrades to [`Packet::empty`].
    pub fn new(kind: u16, payload: impl AsRef<[u8]>) -> Self {
        Self::with_limit(kind, payload, DEFAULT_MAX_WIRE_SIZE, &Reporter::global())
    }

    /// Build a packet under an explicit ceiling, reporting oversize on `reporter`.
    pub fn with_limit(
        kind: u16,
        payload: impl AsRef<[u8]>,
        max_wire_size: u16,
        reporter: &Reporter,
    ) -> Self {
        match Self::try_new(kind, payload, max_wire_size) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::debug!(kind, error = %err, "packet degraded to empty");
                reporter.report(ErrorEvent::new(ErrorKind::OversizedPayload));
                Self::empty()
            }
        }
    }

    /// Fallible constructor. Does not report anything.
    ///
    /// Fails when `max_wire_size` is below the header size or the payload
    /// does not fit under it.
    pub fn try_new(kind: u16, payload: impl AsRef<[u8]>, max_wire_size: u16) -> Result<Self> {
        if kind == EMPTY_PACKET_KIND {
            return Ok(Self::empty());
        }

        if usize::from(max_wire_size) < HEADER_SIZE {
            return Err(FrameError::WireSizeTooSmall {
                max_wire_size,
                min: HEADER_SIZE,
            });
        }

        let payload = payload.as_ref();
        let max_payload = usize::from(max_wire_size) - HEADER_SIZE;
        if payload.len() > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: max_payload,
            });
        }

        Ok(Self {
            kind,
            // Bounded by max_wire_size above.
            wire_len: (payload.len() + HEADER_SIZE) as u16,
            payload: BytesMut::from(payload),
        })
    }

    /// The canonical empty packet.
    pub fn empty() -> Self {
        Self {
            kind: EMPTY_PACKET_KIND,
            wire_len: HEADER_SIZE as u16,
            payload: BytesMut::new(),
        }
    }

    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// Total encoded size: header plus payload.
    pub fn wire_len(&self) -> u16 {
        self.wire_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable view of the payload bytes. The length cannot change.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload.freeze()
    }

    pub fn is_empty_packet(&self) -> bool {
        self.kind == EMPTY_PACKET_KIND
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty()
    }
}
