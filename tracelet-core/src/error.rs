use thiserror::Error;

use crate::alloc::pool::SlotId;

/// Misuse of a [`FixedPool`](crate::alloc::pool::FixedPool) handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("slot {0} is outside the pool")]
    OutOfRange(SlotId),

    #[error("slot {0} is not allocated")]
    NotAllocated(SlotId),
}

/// Collector construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("{0} bound more than once")]
    AlreadyBound(&'static str),

    #[error("{0} was never bound")]
    Missing(&'static str),
}

/// Errors raised while reading packets back from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer holds {actual} bytes, packet needs {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("content size {content} exceeds packet size {packet}")]
    ContentOverflow { content: u32, packet: u32 },

    #[error("content size {0} does not cover the packet header")]
    ContentSize(u32),

    #[error("packet size {0} does not match this build")]
    PacketSize(u32),

    #[error("unknown event id {id} at payload offset {offset}")]
    UnknownEvent { id: u32, offset: usize },

    #[error("event at payload offset {offset} runs past the content region")]
    EventOverrun { offset: usize },
}
