//! Platform adapter.
//!
//! The collector depends on the target for two things: a monotonic
//! timestamp and a mutual exclusion primitive. Both come from a
//! [`Platform`] implementation; the collector builds all of its locks from
//! [`Platform::RawMutex`], so a bare-metal target can plug in a spin lock or
//! an interrupt-masking critical section.

use std::time::Instant;

pub use parking_lot::lock_api;

use crate::time::VirtualClock;

pub trait Platform: Send + Sync {
    /// Raw lock guarding the collector's critical sections.
    type RawMutex: lock_api::RawMutex + Send + Sync;

    /// Monotonic timestamp in nanoseconds. Must not fail.
    fn timestamp(&self) -> u64;
}

/// Hosted platform: `Instant`-based clock and `parking_lot` locks.
#[derive(Debug, Clone, Copy)]
pub struct StdPlatform {
    epoch: Instant,
}

impl StdPlatform {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for StdPlatform {
    type RawMutex = parking_lot::RawMutex;

    #[inline]
    fn timestamp(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

/// Deterministic platform driven by a [`VirtualClock`].
///
/// Every timestamp read advances the clock by `tick_ns`, so a single
/// producer sees strictly increasing, reproducible timestamps.
#[derive(Debug, Clone)]
pub struct VirtualPlatform {
    clock: VirtualClock,
    tick_ns: u64,
}

impl VirtualPlatform {
    pub fn new(clock: VirtualClock, tick_ns: u64) -> Self {
        Self { clock, tick_ns }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }
}

impl Platform for VirtualPlatform {
    type RawMutex = parking_lot::RawMutex;

    #[inline]
    fn timestamp(&self) -> u64 {
        self.clock.tick(self.tick_ns)
    }
}
