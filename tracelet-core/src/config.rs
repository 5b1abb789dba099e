//! Compile-time sizing of the pipeline.
//!
//! These are constants rather than runtime flags: every buffer in the core is
//! sized from them and nothing is resized after startup.

/// Largest payload an event type may carry, in bytes.
pub const EVENT_SIZE_MAX: usize = 32;

/// Serialized event header: `id: u32` followed by `timestamp: u64`.
pub const EVENT_HEADER_LEN: usize = 12;

/// Number of events after which a packet is complete.
pub const EVENT_MAX_PER_PACKET: usize = 16;

/// Raw payload region of one packet.
pub const EVENT_MAX_PAYLOAD_IN_BYTES: usize =
    EVENT_MAX_PER_PACKET * (EVENT_HEADER_LEN + EVENT_SIZE_MAX);

/// Packet pool depth. The ready queue has the same depth.
pub const PACKET_COUNT_MAX: usize = 4;
