//! Packet wire layout.
//!
//! ```text
//! stream_id: u32 | events_discarded: u32 | packet_size: u32 |
//! content_size: u32 | packet_seq_count: u32 | event_payload: [u8; EVENT_MAX_PAYLOAD_IN_BYTES]
//! ```
//!
//! All integers are little-endian and unaligned; the structure has no
//! padding and is transmitted in full, unused payload bytes included.

use std::mem::size_of;

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::EVENT_MAX_PAYLOAD_IN_BYTES;

pub const PACKET_HEADER_LEN: usize = 20;

/// Full size of a packet on the wire.
pub const PACKET_LEN: usize = PACKET_HEADER_LEN + EVENT_MAX_PAYLOAD_IN_BYTES;

/// Unit of `packet_size` and `content_size`: 1 for bytes, 8 for bits.
pub const SIZE_FIELD_SCALE: u32 = if cfg!(feature = "ctf-bit-sizes") { 8 } else { 1 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct PacketHeader {
    pub stream_id: U32,
    pub events_discarded: U32,
    pub packet_size: U32,
    pub content_size: U32,
    pub packet_seq_count: U32,
}

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct PacketBuffer {
    pub header: PacketHeader,
    pub event_payload: [u8; EVENT_MAX_PAYLOAD_IN_BYTES],
}

const _: () = assert!(size_of::<PacketHeader>() == PACKET_HEADER_LEN);
const _: () = assert!(size_of::<PacketBuffer>() == PACKET_LEN);
const _: () = assert!(PACKET_LEN as u64 * 8 <= u32::MAX as u64);
