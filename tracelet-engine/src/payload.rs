//! Payload recorded by the built-in capture.

use tracelet_core::event::EventPayload;
use tracelet_schema::{Schema, SchemaError};
use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Schema describing [`LoopCount`], used when no schema file is given.
pub const LOOP_SCHEMA: &str = r#"
- group: capture
  events:
    - name: loop_count
      id: 1
      params:
        - { name: producer, type: uint32_t }
        - { name: count, type: uint64_t }
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct LoopCount {
    pub producer: U32,
    pub count: U64,
}

impl LoopCount {
    pub fn new(producer: u32, count: u64) -> Self {
        Self {
            producer: U32::new(producer),
            count: U64::new(count),
        }
    }
}

impl EventPayload for LoopCount {
    const ID: u32 = 1;
}

pub fn loop_schema() -> Result<Schema, SchemaError> {
    Schema::from_yaml(LOOP_SCHEMA)
}
