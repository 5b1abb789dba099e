//! ## tracelet-core::stats
//! **Pipeline counters**
//!
//! Relaxed atomic counters updated by the collector. They are observational
//! only; nothing in the pipeline branches on them.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    events_recorded: AtomicU64,
    events_discarded: AtomicU64,
    packets_completed: AtomicU64,
    packets_flushed: AtomicU64,
    packets_drained: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events copied into a packet.
    pub events_recorded: u64,
    /// Events lost to pool exhaustion.
    pub events_discarded: u64,
    /// Packets closed because they reached the event limit.
    pub packets_completed: u64,
    /// Partially filled packets closed by a flush.
    pub packets_flushed: u64,
    /// Packets released by the consumer after draining.
    pub packets_drained: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_events_recorded(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_events_discarded(&self) {
        self.events_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_packets_completed(&self) {
        self.packets_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_packets_flushed(&self) {
        self.packets_flushed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_packets_drained(&self) {
        self.packets_drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            packets_completed: self.packets_completed.load(Ordering::Relaxed),
            packets_flushed: self.packets_flushed.load(Ordering::Relaxed),
            packets_drained: self.packets_drained.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Packets handed to the ready queue by either path.
    pub fn packets_queued(&self) -> u64 {
        self.packets_completed + self.packets_flushed
    }
}
