//! ## tracelet-core::alloc::pool
//! **Fixed-size object pool**
//!
//! Storage for exactly `N` objects built once at construction. Slots are
//! handed out as [`SlotId`] handles and returned with [`FixedPool::release`];
//! the objects themselves stay in place for the lifetime of the pool, so the
//! owner must reset a slot before reusing it.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PoolError;

/// Handle to one pool slot. Handle identity is slot identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub struct FixedPool<T, const N: usize> {
    slots: [T; N],
    // Bit i set means slot i is allocated.
    occupancy: AtomicU64,
}

impl<T, const N: usize> FixedPool<T, N> {
    const DEPTH_OK: () = assert!(N > 0 && N <= 64, "pool depth must be within 1..=64");

    const MASK: u64 = if N == 64 { u64::MAX } else { (1u64 << N) - 1 };

    /// Builds every slot up front. `init` receives the id of the slot it builds.
    pub fn new(mut init: impl FnMut(SlotId) -> T) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::DEPTH_OK;

        Self {
            slots: std::array::from_fn(|i| init(SlotId(i))),
            occupancy: AtomicU64::new(0),
        }
    }

    /// Claims the lowest free slot, or `None` when all `N` are in use.
    pub fn allocate(&self) -> Option<SlotId> {
        let mut current = self.occupancy.load(Ordering::Relaxed);
        loop {
            let free = !current & Self::MASK;
            if free == 0 {
                return None;
            }
            let index = free.trailing_zeros() as usize;
            match self.occupancy.compare_exchange_weak(
                current,
                current | (1 << index),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(SlotId(index)),
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns a slot to the free set.
    ///
    /// Releasing a slot that is not currently allocated leaves the map
    /// untouched and reports the misuse.
    pub fn release(&self, slot: SlotId) -> Result<(), PoolError> {
        if slot.0 >= N {
            return Err(PoolError::OutOfRange(slot));
        }
        let bit = 1u64 << slot.0;
        let previous = self.occupancy.fetch_and(!bit, Ordering::Release);
        if previous & bit == 0 {
            return Err(PoolError::NotAllocated(slot));
        }
        Ok(())
    }

    pub fn is_allocated(&self, slot: SlotId) -> bool {
        slot.0 < N && self.occupancy.load(Ordering::Acquire) & (1 << slot.0) != 0
    }

    /// Number of slots currently allocated.
    pub fn used_count(&self) -> usize {
        self.occupancy.load(Ordering::Acquire).count_ones() as usize
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Shared access to a slot's object.
    ///
    /// Exclusivity of an allocated slot is a protocol between the pool's
    /// users; objects that are mutated through this reference carry their own
    /// interior synchronization.
    ///
    /// # Panics
    /// If `slot` did not come from a pool of this depth.
    #[inline]
    pub fn get(&self, slot: SlotId) -> &T {
        &self.slots[slot.0]
    }
}

impl<T, const N: usize> fmt::Debug for FixedPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPool")
            .field("capacity", &N)
            .field("used", &self.used_count())
            .finish()
    }
}
