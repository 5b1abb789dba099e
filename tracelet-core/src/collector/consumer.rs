//! Draining side of the collector.

use std::sync::atomic::Ordering;

use parking_lot::lock_api::MutexGuard;
use tracing::{error, trace};

use crate::alloc::pool::SlotId;
use crate::packet::PacketBuilder;
use crate::platform::Platform;

use super::Collector;

/// Exclusive handle on the consumer side of a [`Collector`].
///
/// Holds the *draining* packet between [`get_send_packet`] and
/// [`send_packet_completed`]. The byte view borrows the consumer, so a packet
/// cannot be released while its bytes are still in use.
///
/// The handle keeps the draining packet's slot lock, which is not `Send`;
/// create the consumer on the thread that drains.
///
/// [`get_send_packet`]: Consumer::get_send_packet
/// [`send_packet_completed`]: Consumer::send_packet_completed
pub struct Consumer<'a, P: Platform> {
    collector: &'a Collector<P>,
    draining: Option<(SlotId, MutexGuard<'a, P::RawMutex, PacketBuilder>)>,
}

impl<'a, P: Platform> Consumer<'a, P> {
    pub(super) fn claim(collector: &'a Collector<P>) -> Option<Self> {
        collector
            .consumer_claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;

        // Resume a packet a previous consumer left mid-drain.
        let draining = collector
            .parked
            .lock()
            .take()
            .map(|slot| (slot, collector.pool.get(slot).lock()));

        Some(Self {
            collector,
            draining,
        })
    }

    /// Bytes of the draining packet, adopting the oldest queued packet when
    /// nothing is draining. Repeated calls return the same packet until
    /// [`send_packet_completed`](Self::send_packet_completed).
    pub fn get_send_packet(&mut self) -> Option<&[u8]> {
        if self.draining.is_none() {
            let slot = self.collector.ready.lock().remove()?;
            let packet = self.collector.pool.get(slot).lock();
            trace!(
                stream_id = self.collector.stream_id,
                seq = packet.header().packet_seq_count.get(),
                slot = %slot,
                "draining packet"
            );
            self.draining = Some((slot, packet));
        }

        self.draining.as_ref().map(|(_, packet)| packet.as_bytes())
    }

    /// Returns the draining packet to the pool, wiped. No-op when nothing is
    /// draining.
    pub fn send_packet_completed(&mut self) {
        let Some((slot, mut packet)) = self.draining.take() else {
            return;
        };
        packet.wipe();
        drop(packet);

        if let Err(err) = self.collector.pool.release(slot) {
            error!(error = %err, "draining packet was not owned by the pool");
            return;
        }
        self.collector.stats.increment_packets_drained();
        trace!(stream_id = self.collector.stream_id, slot = %slot, "released packet");
    }

    pub fn is_draining(&self) -> bool {
        self.draining.is_some()
    }
}

impl<P: Platform> Drop for Consumer<'_, P> {
    fn drop(&mut self) {
        if let Some((slot, packet)) = self.draining.take() {
            drop(packet);
            *self.collector.parked.lock() = Some(slot);
        }
        self.collector
            .consumer_claimed
            .store(false, Ordering::Release);
    }
}
