//! ## tracelet-core::collector
//! **Packet lifecycle orchestration**
//!
//! The collector owns the packet pool and the ready queue. Producers push
//! events into the one *filling* packet; when it reaches the event limit it is
//! finalized and queued. A single [`Consumer`] pulls queued packets one at a
//! time (*draining*), hands their bytes to a transport and releases them back
//! to the pool.
//!
//! ```text
//! free -> filling -> queued -> draining -> free
//! ```
//!
//! ### Locking
//! Every lock is built from the platform's raw mutex. The producer lock spans
//! the whole producer transition (packet creation, timestamp, copy, full
//! check, finalize, enqueue), so any number of threads may push. Each pool
//! slot carries its own lock; slot ownership is exclusive per lifecycle
//! state, so these are uncontended.

mod builder;
mod consumer;

use std::sync::atomic::AtomicBool;

use parking_lot::lock_api::Mutex;
use tracing::{debug, trace, warn};

use crate::alloc::pool::{FixedPool, SlotId};
use crate::config::PACKET_COUNT_MAX;
use crate::event::{Event, EventPayload};
use crate::packet::PacketBuilder;
use crate::platform::Platform;
use crate::queue::BoundedQueue;
use crate::stats::{PipelineStats, StatsSnapshot};

pub use builder::CollectorBuilder;
pub use consumer::Consumer;

type Lock<P, T> = Mutex<<P as Platform>::RawMutex, T>;

/// Outcome of a push, as seen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    /// Copied into the filling packet.
    Buffered,
    /// Copied, and the packet it completed is now queued.
    PacketReady { seq: u32 },
    /// No packet could be obtained; the event is gone and counted.
    Discarded,
}

#[derive(Debug, Default)]
struct ProducerState {
    current: Option<SlotId>,
    discarded: u32,
    next_seq: u32,
    discarding: bool,
}

pub struct Collector<P: Platform> {
    stream_id: u32,
    platform: P,
    pool: FixedPool<Lock<P, PacketBuilder>, PACKET_COUNT_MAX>,
    producer: Lock<P, ProducerState>,
    ready: Lock<P, BoundedQueue<SlotId, PACKET_COUNT_MAX>>,
    // Draining packet left behind by a dropped consumer.
    parked: Lock<P, Option<SlotId>>,
    consumer_claimed: AtomicBool,
    stats: PipelineStats,
}

impl<P: Platform> Collector<P> {
    pub fn builder() -> CollectorBuilder<P> {
        CollectorBuilder::new()
    }

    fn new(stream_id: u32, platform: P) -> Self {
        Self {
            stream_id,
            platform,
            pool: FixedPool::new(|_| Mutex::new(PacketBuilder::new())),
            producer: Mutex::new(ProducerState::default()),
            ready: Mutex::new(BoundedQueue::new()),
            parked: Mutex::new(None),
            consumer_claimed: AtomicBool::new(false),
            stats: PipelineStats::new(),
        }
    }

    /// Stamps `event` with the platform time and packs it into the filling
    /// packet, opening one from the pool when needed.
    ///
    /// Never blocks on backpressure: with the pool exhausted the event is
    /// dropped and counted in the `events_discarded` field of the next packet
    /// that can be opened.
    pub fn push_event<T: EventPayload>(&self, event: &mut Event<T>) -> Pushed {
        let mut producer = self.producer.lock();

        let Some(slot) = self.open_packet(&mut producer) else {
            producer.discarded = producer.discarded.saturating_add(1);
            self.stats.increment_events_discarded();
            if !producer.discarding {
                producer.discarding = true;
                warn!(
                    stream_id = self.stream_id,
                    "packet pool exhausted, discarding events"
                );
            }
            return Pushed::Discarded;
        };

        self.pack(&mut producer, slot, event)
    }

    /// Like [`push_event`](Self::push_event), but with the pool exhausted the
    /// event is handed back untouched instead of being discarded. Returns
    /// `None` in that case; nothing is counted and the caller may retry.
    pub fn try_push_event<T: EventPayload>(&self, event: &mut Event<T>) -> Option<Pushed> {
        let mut producer = self.producer.lock();
        let slot = self.open_packet(&mut producer)?;
        Some(self.pack(&mut producer, slot, event))
    }

    fn pack<T: EventPayload>(
        &self,
        producer: &mut ProducerState,
        slot: SlotId,
        event: &mut Event<T>,
    ) -> Pushed {
        let mut packet = self.pool.get(slot).lock();
        event.set_timestamp(self.platform.timestamp());
        let added = packet.add_event(&*event);
        debug_assert!(added, "filling packet refused an event");
        self.stats.increment_events_recorded();

        if !packet.is_full() {
            return Pushed::Buffered;
        }

        packet.build_packet();
        let seq = packet.header().packet_seq_count.get();
        drop(packet);

        self.enqueue(producer, slot);
        self.stats.increment_packets_completed();
        Pushed::PacketReady { seq }
    }

    /// Records `param` as a fresh event.
    pub fn record<T: EventPayload>(&self, param: T) -> Pushed {
        self.push_event(&mut Event::new(param))
    }

    /// Records `param` unless the pool is exhausted; see
    /// [`try_push_event`](Self::try_push_event).
    pub fn try_record<T: EventPayload>(&self, param: T) -> Option<Pushed> {
        self.try_push_event(&mut Event::new(param))
    }

    /// Closes the filling packet early and queues it.
    ///
    /// With no filling packet but discards pending, a packet is opened just to
    /// carry the discard count. Returns the sequence number of the queued
    /// packet, or `None` when there was nothing to flush or no free slot.
    pub fn flush(&self) -> Option<u32> {
        let mut producer = self.producer.lock();
        if producer.current.is_none() && producer.discarded == 0 {
            return None;
        }

        let slot = self.open_packet(&mut producer)?;
        let mut packet = self.pool.get(slot).lock();
        packet.build_packet();
        let seq = packet.header().packet_seq_count.get();
        drop(packet);

        self.enqueue(&mut producer, slot);
        self.stats.increment_packets_flushed();
        debug!(stream_id = self.stream_id, seq, "flushed packet");
        Some(seq)
    }

    /// Claims the consumer side. Only one consumer exists at a time; this
    /// returns `None` while another is alive.
    pub fn consumer(&self) -> Option<Consumer<'_, P>> {
        Consumer::claim(self)
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Packets queued and not yet picked up by the consumer.
    pub fn pending_packets(&self) -> usize {
        self.ready.lock().len()
    }

    /// Pool slots currently filling, queued or draining.
    pub fn packets_in_use(&self) -> usize {
        self.pool.used_count()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn open_packet(&self, producer: &mut ProducerState) -> Option<SlotId> {
        if let Some(slot) = producer.current {
            return Some(slot);
        }

        let slot = self.pool.allocate()?;
        let seq = producer.next_seq;
        let mut packet = self.pool.get(slot).lock();
        packet.init(self.stream_id, seq);
        packet.drop_events(producer.discarded);
        drop(packet);

        if producer.discarding {
            debug!(
                stream_id = self.stream_id,
                discarded = producer.discarded,
                "packet pool recovered"
            );
        }
        trace!(stream_id = self.stream_id, seq, slot = %slot, "opened packet");

        producer.next_seq = seq.wrapping_add(1);
        producer.discarded = 0;
        producer.discarding = false;
        producer.current = Some(slot);
        Some(slot)
    }

    fn enqueue(&self, producer: &mut ProducerState, slot: SlotId) {
        // The queue has the pool's depth, so every allocated slot fits.
        self.ready
            .lock()
            .insert(slot)
            .expect("ready queue is sized to the packet pool");
        producer.current = None;
        trace!(stream_id = self.stream_id, slot = %slot, "queued packet");
    }
}

impl<P: Platform> std::fmt::Debug for Collector<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("stream_id", &self.stream_id)
            .field("pool", &self.pool)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
