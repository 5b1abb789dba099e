//! Decoding of dumped packet streams.

use std::fmt;
use std::path::Path;

use tracelet_core::packet::{PacketStream, RawRecord, SIZE_FIELD_SCALE};
use tracelet_schema::{FieldValue, Schema};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub id: u32,
    /// Event name from the schema.
    pub name: String,
    pub timestamp: u64,
    pub fields: Vec<(String, FieldValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSummary {
    pub stream_id: u32,
    pub sequence: u32,
    pub events_discarded: u32,
    /// Header plus event bytes.
    pub content_bytes: u32,
    pub events: Vec<DecodedEvent>,
}

/// Decodes every packet in `bytes`. Events whose id the schema does not
/// know end the decode with an error, since their length is unknown.
pub fn inspect(bytes: &[u8], schema: &Schema) -> Result<Vec<PacketSummary>, EngineError> {
    let mut packets = Vec::new();
    for packet in PacketStream::new(bytes) {
        let packet = packet?;
        let mut events = Vec::new();
        for record in packet.records(|id| schema.payload_len(id)) {
            events.push(decode_event(schema, record?)?);
        }

        packets.push(PacketSummary {
            stream_id: packet.stream_id(),
            sequence: packet.sequence(),
            events_discarded: packet.events_discarded(),
            content_bytes: packet.header().content_size.get() / SIZE_FIELD_SCALE,
            events,
        });
    }
    tracing::debug!(packets = packets.len(), "stream decoded");
    Ok(packets)
}

fn decode_event(schema: &Schema, record: RawRecord<'_>) -> Result<DecodedEvent, EngineError> {
    let mismatch = || EngineError::SchemaMismatch {
        id: record.id,
        len: record.param.len(),
    };
    let def = schema.event(record.id).ok_or_else(mismatch)?;
    let fields = def
        .decode(record.param)
        .ok_or_else(mismatch)?
        .into_iter()
        .map(|field| (field.name.to_string(), field.value))
        .collect();
    Ok(DecodedEvent {
        id: record.id,
        name: def.name.clone(),
        timestamp: record.timestamp,
        fields,
    })
}

/// Reads and decodes a stream file.
pub fn inspect_file(path: impl AsRef<Path>, schema: &Schema) -> Result<Vec<PacketSummary>, EngineError> {
    let bytes = std::fs::read(path)?;
    inspect(&bytes, schema)
}

impl fmt::Display for PacketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "packet seq={} stream={} events={} discarded={} content={}B",
            self.sequence,
            self.stream_id,
            self.events.len(),
            self.events_discarded,
            self.content_bytes
        )?;
        for event in &self.events {
            write!(f, "  [{:>20}] {} (id {})", event.timestamp, event.name, event.id)?;
            for (name, value) in &event.fields {
                write!(f, " {name}={value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelet_core::packet::{PACKET_HEADER_LEN, PACKET_LEN};
    use tracelet_core::platform::VirtualPlatform;
    use tracelet_core::time::VirtualClock;
    use tracelet_core::{Collector, DecodeError};

    use tracelet_core::event::EventPayload;

    use crate::payload::{loop_schema, LoopCount};

    fn dump(events: u64) -> Vec<u8> {
        let collector = Collector::builder()
            .stream_id(200)
            .platform(VirtualPlatform::new(VirtualClock::new(500), 5))
            .build()
            .unwrap();
        for count in 0..events {
            collector.record(LoopCount::new(0, count));
        }
        collector.flush();

        let mut consumer = collector.consumer().unwrap();
        let mut out = Vec::new();
        while let Some(bytes) = consumer.get_send_packet() {
            out.extend_from_slice(bytes);
            consumer.send_packet_completed();
        }
        out
    }

    #[test]
    fn decodes_events_with_schema() {
        let packets = inspect(&dump(20), &loop_schema().unwrap()).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].events.len(), 16);
        assert_eq!(packets[1].events.len(), 4);
        assert_eq!(packets[1].sequence, 1);
        assert_eq!(packets[1].content_bytes as usize, PACKET_HEADER_LEN + 4 * 24);

        let last = &packets[1].events[3];
        assert_eq!(last.name, "loop_count");
        assert_eq!(last.timestamp, 500 + 19 * 5);
        assert_eq!(last.fields[1], ("count".to_string(), FieldValue::Unsigned(19)));

        let text = packets[1].to_string();
        assert!(text.starts_with("packet seq=1 stream=200 events=4"));
        assert!(text.contains("loop_count (id 1) producer=0 count=18"));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let schema = Schema::from_yaml("- events:\n  - { name: other, id: 2 }\n").unwrap();
        let result = inspect(&dump(1), &schema);
        assert!(matches!(
            result,
            Err(EngineError::Decode(DecodeError::UnknownEvent { id: 1, offset: 0 }))
        ));
    }

    #[test]
    fn records_the_schema_cannot_describe_are_errors() {
        let schema = loop_schema().unwrap();
        let short = RawRecord {
            id: LoopCount::ID,
            timestamp: 1,
            param: &[0; 3],
        };
        assert!(matches!(
            decode_event(&schema, short),
            Err(EngineError::SchemaMismatch { id: 1, len: 3 })
        ));

        let unknown = RawRecord {
            id: 77,
            timestamp: 1,
            param: &[],
        };
        assert!(matches!(
            decode_event(&schema, unknown),
            Err(EngineError::SchemaMismatch { id: 77, len: 0 })
        ));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let bytes = dump(16);
        assert_eq!(bytes.len(), PACKET_LEN);
        let result = inspect(&bytes[..PACKET_LEN - 1], &loop_schema().unwrap());
        assert!(matches!(
            result,
            Err(EngineError::Decode(DecodeError::Truncated { .. }))
        ));
    }
}
