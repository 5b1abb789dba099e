//! ## tracelet-core::packet
//! **Packed packet layout, builder and reader**
//!
//! ### Key Submodules:
//! - `wire/`: On-the-wire header and buffer layout
//! - `builder/`: Serializes events into one packet buffer
//! - `view/`: Reads packets and their events back from raw bytes

pub mod builder;
pub mod view;
pub mod wire;

pub use builder::PacketBuilder;
pub use view::{PacketStream, PacketView, RawRecord, RawRecords};
pub use wire::{PacketBuffer, PacketHeader, PACKET_HEADER_LEN, PACKET_LEN, SIZE_FIELD_SCALE};
