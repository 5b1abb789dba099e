//! Reading packets back from raw bytes.
//!
//! Used by consumers that post-process a dumped packet stream. Events are
//! variable-length on the wire, so walking a payload needs the payload length
//! of each event id, supplied by the caller.

use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::FromBytes;

use crate::config::EVENT_HEADER_LEN;
use crate::error::DecodeError;

use super::wire::{PacketHeader, PACKET_HEADER_LEN, PACKET_LEN, SIZE_FIELD_SCALE};

/// A borrowed, validated packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    header: &'a PacketHeader,
    content: &'a [u8],
}

impl<'a> PacketView<'a> {
    /// Validates one packet at the front of `bytes`, returning it and the
    /// bytes that follow.
    pub fn parse(bytes: &'a [u8]) -> Result<(Self, &'a [u8]), DecodeError> {
        if bytes.len() < PACKET_LEN {
            return Err(DecodeError::Truncated {
                expected: PACKET_LEN,
                actual: bytes.len(),
            });
        }
        let (packet, rest) = bytes.split_at(PACKET_LEN);
        let (header, payload) = PacketHeader::ref_from_prefix(packet).map_err(|_| {
            DecodeError::Truncated {
                expected: PACKET_HEADER_LEN,
                actual: packet.len(),
            }
        })?;

        let packet_size = header.packet_size.get();
        if packet_size != PACKET_LEN as u32 * SIZE_FIELD_SCALE {
            return Err(DecodeError::PacketSize(packet_size));
        }
        let content_size = header.content_size.get();
        if content_size > packet_size {
            return Err(DecodeError::ContentOverflow {
                content: content_size,
                packet: packet_size,
            });
        }
        if content_size % SIZE_FIELD_SCALE != 0
            || ((content_size / SIZE_FIELD_SCALE) as usize) < PACKET_HEADER_LEN
        {
            return Err(DecodeError::ContentSize(content_size));
        }
        let used = (content_size / SIZE_FIELD_SCALE) as usize - PACKET_HEADER_LEN;

        Ok((
            Self {
                header,
                content: &payload[..used],
            },
            rest,
        ))
    }

    pub fn stream_id(&self) -> u32 {
        self.header.stream_id.get()
    }

    pub fn events_discarded(&self) -> u32 {
        self.header.events_discarded.get()
    }

    pub fn sequence(&self) -> u32 {
        self.header.packet_seq_count.get()
    }

    pub fn header(&self) -> &'a PacketHeader {
        self.header
    }

    /// The used part of the payload region.
    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    /// Walks the serialized events. `payload_len` maps an event id to the
    /// size of its payload; unknown ids end the walk with an error.
    pub fn records<F>(&self, payload_len: F) -> RawRecords<'a, F>
    where
        F: Fn(u32) -> Option<usize>,
    {
        RawRecords {
            content: self.content,
            offset: 0,
            payload_len,
            done: false,
        }
    }
}

/// One serialized event, payload left undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub id: u32,
    pub timestamp: u64,
    pub param: &'a [u8],
}

pub struct RawRecords<'a, F> {
    content: &'a [u8],
    offset: usize,
    payload_len: F,
    done: bool,
}

impl<'a, F> Iterator for RawRecords<'a, F>
where
    F: Fn(u32) -> Option<usize>,
{
    type Item = Result<RawRecord<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.content.len() {
            return None;
        }
        let offset = self.offset;
        let content: &'a [u8] = self.content;
        let remaining = &content[offset..];

        let result = decode_record(remaining, offset, &self.payload_len);
        match &result {
            Ok(record) => self.offset += EVENT_HEADER_LEN + record.param.len(),
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

fn decode_record<'a>(
    bytes: &'a [u8],
    offset: usize,
    payload_len: &impl Fn(u32) -> Option<usize>,
) -> Result<RawRecord<'a>, DecodeError> {
    let (id, rest) = U32::read_from_prefix(bytes).map_err(|_| DecodeError::EventOverrun { offset })?;
    let (timestamp, rest) =
        U64::read_from_prefix(rest).map_err(|_| DecodeError::EventOverrun { offset })?;
    let id = id.get();
    let len = payload_len(id).ok_or(DecodeError::UnknownEvent { id, offset })?;
    let param = rest.get(..len).ok_or(DecodeError::EventOverrun { offset })?;

    Ok(RawRecord {
        id,
        timestamp: timestamp.get(),
        param,
    })
}

/// Iterator over back-to-back packets in a dumped stream.
pub struct PacketStream<'a> {
    bytes: &'a [u8],
    failed: bool,
}

impl<'a> PacketStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            failed: false,
        }
    }
}

impl<'a> Iterator for PacketStream<'a> {
    type Item = Result<PacketView<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.bytes.is_empty() {
            return None;
        }
        match PacketView::parse(self.bytes) {
            Ok((view, rest)) => {
                self.bytes = rest;
                Some(Ok(view))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
