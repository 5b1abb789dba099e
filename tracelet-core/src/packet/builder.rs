//! Packet builder.
//!
//! Owns one [`PacketBuffer`] and accumulates serialized events into its
//! payload region until the per-packet event limit is reached. Header size
//! fields are only meaningful after [`PacketBuilder::build_packet`].

use zerocopy::{FromZeros, IntoBytes};

use crate::config::{EVENT_MAX_PAYLOAD_IN_BYTES, EVENT_MAX_PER_PACKET};
use crate::event::RawEvent;

use super::wire::{PacketBuffer, PacketHeader, PACKET_HEADER_LEN, PACKET_LEN, SIZE_FIELD_SCALE};

pub struct PacketBuilder {
    offset: usize,
    event_count: usize,
    buffer: PacketBuffer,
}

impl PacketBuilder {
    /// An all-zero packet. Call [`init`](Self::init) before first use.
    pub fn new() -> Self {
        Self {
            offset: 0,
            event_count: 0,
            buffer: PacketBuffer::new_zeroed(),
        }
    }

    /// Resets bookkeeping and the whole buffer, then stamps the stream id and
    /// sequence number. Required before every reuse of a pooled packet.
    pub fn init(&mut self, stream_id: u32, seq_no: u32) {
        self.wipe();
        self.buffer.header.stream_id.set(stream_id);
        self.buffer.header.packet_seq_count.set(seq_no);
    }

    /// Event limit reached. Independent of byte occupancy.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.event_count >= EVENT_MAX_PER_PACKET
    }

    /// Appends the serialized bytes of `event`.
    ///
    /// Returns `false` without touching the packet when it is already full or
    /// when the bytes would run past the payload region.
    pub fn add_event<E: RawEvent + ?Sized>(&mut self, event: &E) -> bool {
        if self.is_full() {
            return false;
        }
        let len = event.raw_len();
        if len > EVENT_MAX_PAYLOAD_IN_BYTES - self.offset {
            return false;
        }

        let end = self.offset + len;
        let written = event.write_raw(&mut self.buffer.event_payload[self.offset..end]);
        debug_assert_eq!(written, len);

        self.offset = end;
        self.event_count += 1;
        true
    }

    /// Counts one event lost before it could be placed in any packet.
    #[inline]
    pub fn drop_event(&mut self) {
        self.drop_events(1);
    }

    pub fn drop_events(&mut self, count: u32) {
        let discarded = self.buffer.header.events_discarded.get();
        self.buffer
            .header
            .events_discarded
            .set(discarded.saturating_add(count));
    }

    /// Finalizes the size fields. Call once, after the last event.
    pub fn build_packet(&mut self) {
        let header = &mut self.buffer.header;
        header.packet_size.set(PACKET_LEN as u32 * SIZE_FIELD_SCALE);
        header
            .content_size
            .set((PACKET_HEADER_LEN + self.offset) as u32 * SIZE_FIELD_SCALE);
    }

    /// The whole packet, trailing unused payload included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    #[inline]
    pub fn header(&self) -> &PacketHeader {
        &self.buffer.header
    }

    #[inline]
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Payload bytes used so far.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Zeroes the buffer and bookkeeping.
    pub fn wipe(&mut self) {
        self.offset = 0;
        self.event_count = 0;
        self.buffer.zero();
    }
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PacketBuilder {
    fn drop(&mut self) {
        self.wipe();
    }
}
