//! # tracelet-core
//!
//! Allocation-free event batching for resource-constrained targets.
//! Producers push fixed-size typed events; the collector packs them into
//! fixed-size packets and hands completed packets to a draining transport.
//!
//! ### Expectations (Production):
//! - Zero heap allocations after the collector is built
//! - Bounded critical sections, no blocking on backpressure
//! - Packets handed out in strictly increasing sequence order
//!
//! ### Key Submodules:
//! - `alloc`: Fixed object pool with an atomic occupancy map
//! - `queue`: Bounded FIFO of packet handles
//! - `event`: Typed event records and their byte view
//! - `packet`: Wire layout, packet builder and packet decoding
//! - `collector`: Orchestrates pool, builder and ready queue
//! - `platform`: Timestamp and locking adapter
//! - `time`: `VirtualClock` using atomic counters

pub mod alloc;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod packet;
pub mod platform;
pub mod queue;
pub mod stats;
pub mod time;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::collector::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::packet::*;
    pub use crate::platform::*;
    pub use crate::queue::*;
    pub use crate::stats::*;
    pub use crate::time::*;
}

pub use collector::{Collector, CollectorBuilder, Pushed};
pub use error::{CollectorError, DecodeError, PoolError};
