//! ## tracelet-core::time
//! **Virtual clock**
//!
//! A shared nanosecond counter that only moves when told to. Clones observe
//! the same time, so a test or a replaying capture can drive several
//! components from one clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>, // Nanoseconds
}

impl VirtualClock {
    pub fn new(seed: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(seed)),
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }

    /// Reads the current time and advances by `ns` in one step.
    pub fn tick(&self, ns: u64) -> u64 {
        self.offset.fetch_add(ns, Ordering::AcqRel)
    }
}
