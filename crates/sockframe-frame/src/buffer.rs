//! Fixed-capacity reassembly buffer.
//!
//! Raw bytes are written into the free tail of the buffer (see
//! [`PacketBuffer::write_space`] and [`PacketBuffer::read_window`]) and then
//! committed with [`PacketBuffer::ingest`], which extracts every complete
//! packet and compacts what is left back to offset 0.

use std::collections::VecDeque;

use crate::codec::{check_wire_len, peek_header, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::packet::Packet;
use crate::report::{ErrorEvent, ErrorKind, Reporter};

/// Accumulates bytes and queues the packets they complete.
#[derive(Debug)]
pub struct PacketBuffer {
    storage: Box<[u8]>,
    filled: usize,
    pending: VecDeque<Packet>,
    max_wire_size: u16,
    reporter: Reporter,
}

impl PacketBuffer {
    /// Buffer with the default configuration and the process-wide reporter.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default(), Reporter::global())
    }

    /// Buffer with an explicit configuration.
    ///
    /// A capacity below `config.max_wire_size`, or a `max_wire_size` below
    /// the header size, yields an unusable buffer (`capacity() == 0`) and
    /// reports [`ErrorKind::UndersizedBuffer`].
    pub fn with_config(config: FrameConfig, reporter: Reporter) -> Self {
        match Self::try_with_config(config, reporter.clone()) {
            Ok(buffer) => buffer,
            Err(err) => {
                tracing::warn!(error = %err, "packet buffer unusable");
                reporter.report(ErrorEvent::new(ErrorKind::UndersizedBuffer));
                Self {
                    storage: Box::default(),
                    filled: 0,
                    pending: VecDeque::new(),
                    max_wire_size: config.max_wire_size,
                    reporter,
                }
            }
        }
    }

    /// Fallible constructor. Does not report anything.
    pub fn try_with_config(config: FrameConfig, reporter: Reporter) -> Result<Self> {
        if usize::from(config.max_wire_size) < HEADER_SIZE {
            return Err(FrameError::WireSizeTooSmall {
                max_wire_size: config.max_wire_size,
                min: HEADER_SIZE,
            });
        }
        let min = usize::from(config.max_wire_size);
        if config.buffer_capacity < min {
            return Err(FrameError::BufferTooSmall {
                capacity: config.buffer_capacity,
                min,
            });
        }
        Ok(Self {
            storage: vec![0u8; config.buffer_capacity].into_boxed_slice(),
            filled: 0,
            pending: VecDeque::new(),
            max_wire_size: config.max_wire_size,
            reporter,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes retained that do not yet form a complete packet.
    pub fn filled_bytes(&self) -> usize {
        self.filled
    }

    /// Retained bytes, always starting at offset 0.
    pub fn filled(&self) -> &[u8] {
        &self.storage[..self.filled]
    }

    pub fn available_write_space(&self) -> usize {
        self.capacity() - self.filled
    }

    /// False when construction degraded to a zero-capacity buffer.
    pub fn is_usable(&self) -> bool {
        self.capacity() > 0
    }

    pub fn max_wire_size(&self) -> u16 {
        self.max_wire_size
    }

    /// The whole free tail. Commit written bytes with [`ingest`](Self::ingest).
    pub fn write_space(&mut self) -> &mut [u8] {
        &mut self.storage[self.filled..]
    }

    /// Free tail limited to half the capacity.
    ///
    /// Stream reads go through this window so that one read plus a retained
    /// partial packet always fit.
    pub fn read_window(&mut self) -> &mut [u8] {
        let len = self.available_write_space().min(self.capacity() / 2);
        let start = self.filled;
        &mut self.storage[start..start + len]
    }

    /// Commit `count` bytes written into the free tail and extract every
    /// complete packet they finish.
    ///
    /// Returns the number of packets extracted by this call.
    pub fn ingest(&mut self, count: usize) -> usize {
        debug_assert!(count <= self.available_write_space());
        self.filled += count.min(self.available_write_space());

        let mut extracted = 0;
        while let Some(header) = peek_header(self.filled()) {
            if let Err(err) = check_wire_len(header.wire_len, self.max_wire_size) {
                tracing::warn!(error = %err, retained = self.filled, "dropping unparseable bytes");
                self.reporter.report(ErrorEvent::new(ErrorKind::MalformedFrame));
                self.clear();
                break;
            }

            let total = usize::from(header.wire_len);
            if self.filled < total {
                break;
            }

            let packet = Packet::with_limit(
                header.kind,
                &self.storage[HEADER_SIZE..total],
                self.max_wire_size,
                &self.reporter,
            );
            self.pending.push_back(packet);
            self.consume(total);
            extracted += 1;
        }
        extracted
    }

    /// Copy as much of `data` as fits and ingest it.
    ///
    /// Returns the number of bytes accepted.
    pub fn push_bytes(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.available_write_space());
        self.write_space()[..count].copy_from_slice(&data[..count]);
        self.ingest(count);
        count
    }

    pub fn has_packet(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn packet_count(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return the oldest complete packet.
    pub fn pop_packet(&mut self) -> Option<Packet> {
        self.pending.pop_front()
    }

    /// Drain every queued packet in arrival order.
    pub fn drain_packets(&mut self) -> impl Iterator<Item = Packet> + '_ {
        self.pending.drain(..)
    }

    /// Discard retained bytes. Queued packets are kept.
    pub fn clear(&mut self) {
        self.storage[..self.filled].fill(0);
        self.filled = 0;
    }

    /// Drop the first `count` retained bytes and compact the rest to offset 0.
    fn consume(&mut self, count: usize) {
        let count = count.min(self.filled);
        self.storage.copy_within(count..self.filled, 0);
        let remaining = self.filled - count;
        self.storage[remaining..self.filled].fill(0);
        self.filled = remaining;
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}
