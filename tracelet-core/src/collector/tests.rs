use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing_test::traced_test;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{Immutable, IntoBytes};

use super::*;
use crate::config::EVENT_MAX_PER_PACKET;
use crate::error::CollectorError;
use crate::packet::{PacketView, PACKET_HEADER_LEN, PACKET_LEN, SIZE_FIELD_SCALE};
use crate::platform::VirtualPlatform;
use crate::time::VirtualClock;

#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
#[repr(C)]
struct MockEvent {
    value: [u8; 10],
}

impl EventPayload for MockEvent {
    const ID: u32 = 7;
}

#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
#[repr(C)]
struct LoopCount {
    producer: U32,
    count: U32,
}

impl EventPayload for LoopCount {
    const ID: u32 = 1;
}

const RAW_LEN: usize = Event::<MockEvent>::RAW_LEN;

fn collector(stream_id: u32) -> Collector<VirtualPlatform> {
    Collector::builder()
        .stream_id(stream_id)
        .platform(VirtualPlatform::new(VirtualClock::new(1_000), 10))
        .build()
        .unwrap()
}

fn fill_packet(collector: &Collector<VirtualPlatform>, pattern: u8) -> Vec<Pushed> {
    let mut event = Event::new(MockEvent {
        value: [pattern; 10],
    });
    (0..EVENT_MAX_PER_PACKET)
        .map(|_| collector.push_event(&mut event))
        .collect()
}

fn drain_one(collector: &Collector<VirtualPlatform>) -> Option<Vec<u8>> {
    let mut consumer = collector.consumer().unwrap();
    let bytes = consumer.get_send_packet()?.to_vec();
    consumer.send_packet_completed();
    Some(bytes)
}

fn mock_len(id: u32) -> Option<usize> {
    (id == MockEvent::ID).then_some(10)
}

#[test]
fn build_requires_both_bindings() {
    let missing_platform = Collector::<VirtualPlatform>::builder().stream_id(1).build();
    assert_eq!(
        missing_platform.unwrap_err(),
        CollectorError::Missing("platform")
    );

    let missing_stream = Collector::builder()
        .platform(VirtualPlatform::new(VirtualClock::new(0), 1))
        .build();
    assert_eq!(
        missing_stream.unwrap_err(),
        CollectorError::Missing("stream id")
    );
}

#[test]
fn binding_twice_is_rejected() {
    let result = Collector::builder()
        .stream_id(1)
        .stream_id(2)
        .platform(VirtualPlatform::new(VirtualClock::new(0), 1))
        .build();
    assert_eq!(result.unwrap_err(), CollectorError::AlreadyBound("stream id"));

    let clock = VirtualClock::new(0);
    let result = Collector::builder()
        .stream_id(1)
        .platform(VirtualPlatform::new(clock.clone(), 1))
        .platform(VirtualPlatform::new(clock, 1))
        .build();
    assert_eq!(result.unwrap_err(), CollectorError::AlreadyBound("platform"));
}

#[test]
fn full_packet_is_queued_exactly_once() {
    let collector = collector(100);
    let outcomes = fill_packet(&collector, 0x11);

    assert!(outcomes[..EVENT_MAX_PER_PACKET - 1]
        .iter()
        .all(|o| *o == Pushed::Buffered));
    assert_eq!(outcomes.last(), Some(&Pushed::PacketReady { seq: 0 }));
    assert_eq!(collector.pending_packets(), 1);

    let bytes = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&bytes).unwrap();
    assert_eq!(view.stream_id(), 100);
    assert_eq!(view.events_discarded(), 0);
    assert_eq!(
        view.header().content_size.get(),
        (PACKET_HEADER_LEN + EVENT_MAX_PER_PACKET * RAW_LEN) as u32 * SIZE_FIELD_SCALE
    );
    assert_eq!(bytes.len(), PACKET_LEN);
    assert_eq!(collector.packets_in_use(), 0);
}

#[test]
fn empty_queue_yields_nothing() {
    let collector = collector(42);
    let mut consumer = collector.consumer().unwrap();
    assert!(consumer.get_send_packet().is_none());
    assert!(!consumer.is_draining());

    // Completing with nothing draining is harmless.
    consumer.send_packet_completed();
    assert_eq!(collector.stats().packets_drained, 0);
}

#[test]
fn partial_packet_stays_filling() {
    let collector = collector(42);
    assert_eq!(collector.record(MockEvent { value: [1; 10] }), Pushed::Buffered);
    assert_eq!(collector.pending_packets(), 0);
    assert_eq!(collector.packets_in_use(), 1);
    assert!(drain_one(&collector).is_none());
}

#[test]
fn sequence_numbers_increase_by_one_from_zero() {
    let collector = collector(3);
    let mut seen = Vec::new();
    for round in 0..(3 * PACKET_COUNT_MAX) {
        fill_packet(&collector, round as u8);
        let bytes = drain_one(&collector).unwrap();
        seen.push(PacketView::parse(&bytes).unwrap().0.sequence());
    }
    let expected: Vec<u32> = (0..(3 * PACKET_COUNT_MAX) as u32).collect();
    assert_eq!(seen, expected);
}

#[test]
fn draining_is_idempotent_until_completed() {
    let collector = collector(5);
    fill_packet(&collector, 0xAA);
    fill_packet(&collector, 0xBB);

    let mut consumer = collector.consumer().unwrap();
    let first = consumer.get_send_packet().unwrap().to_vec();
    let again = consumer.get_send_packet().unwrap().to_vec();
    assert_eq!(first, again);
    assert_eq!(collector.pending_packets(), 1);

    consumer.send_packet_completed();
    let next = consumer.get_send_packet().unwrap().to_vec();
    assert_ne!(first, next);
    assert_eq!(PacketView::parse(&next).unwrap().0.sequence(), 1);

    consumer.send_packet_completed();
    assert!(consumer.get_send_packet().is_none());
}

#[test]
fn exhausted_pool_discards_and_reports_on_next_packet() {
    let collector = collector(9);
    for round in 0..PACKET_COUNT_MAX {
        fill_packet(&collector, round as u8);
    }
    assert_eq!(collector.packets_in_use(), PACKET_COUNT_MAX);

    let dropped = 5;
    for _ in 0..dropped {
        assert_eq!(
            collector.record(MockEvent { value: [0xEE; 10] }),
            Pushed::Discarded
        );
    }
    assert_eq!(collector.stats().events_discarded, dropped);

    let first = drain_one(&collector).unwrap();
    assert_eq!(PacketView::parse(&first).unwrap().0.events_discarded(), 0);

    // Freed slot becomes the next filling packet and carries the count.
    fill_packet(&collector, 0x55);
    for _ in 1..PACKET_COUNT_MAX {
        drain_one(&collector).unwrap();
    }
    let recovered = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&recovered).unwrap();
    assert_eq!(view.sequence(), PACKET_COUNT_MAX as u32);
    assert_eq!(view.events_discarded(), dropped as u32);
    assert_eq!(view.records(mock_len).count(), EVENT_MAX_PER_PACKET);
}

#[test]
fn try_record_refuses_without_discarding() {
    let collector = collector(10);
    for round in 0..PACKET_COUNT_MAX {
        fill_packet(&collector, round as u8);
    }

    assert_eq!(collector.try_record(MockEvent { value: [1; 10] }), None);
    assert_eq!(collector.stats().events_discarded, 0);
    assert_eq!(collector.stats().events_recorded, (PACKET_COUNT_MAX * EVENT_MAX_PER_PACKET) as u64);

    drain_one(&collector).unwrap();
    assert_eq!(
        collector.try_record(MockEvent { value: [1; 10] }),
        Some(Pushed::Buffered)
    );
    // The filling packet keeps accepting although the pool is full again.
    assert_eq!(collector.packets_in_use(), PACKET_COUNT_MAX);
    assert_eq!(
        collector.try_record(MockEvent { value: [2; 10] }),
        Some(Pushed::Buffered)
    );

    for _ in 0..PACKET_COUNT_MAX - 1 {
        drain_one(&collector).unwrap();
    }
    collector.flush();
    let bytes = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&bytes).unwrap();
    assert_eq!(view.events_discarded(), 0);
    assert_eq!(view.records(mock_len).count(), 2);
}

#[test]
fn flush_closes_partial_packet() {
    let collector = collector(11);
    for _ in 0..3 {
        collector.record(MockEvent { value: [0x33; 10] });
    }
    assert_eq!(collector.flush(), Some(0));
    assert_eq!(collector.flush(), None);

    let bytes = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&bytes).unwrap();
    assert_eq!(
        view.header().content_size.get(),
        (PACKET_HEADER_LEN + 3 * RAW_LEN) as u32 * SIZE_FIELD_SCALE
    );
    assert_eq!(collector.stats().packets_flushed, 1);
}

#[test]
fn flush_with_only_discards_yields_header_only_packet() {
    let collector = collector(12);
    for round in 0..PACKET_COUNT_MAX {
        fill_packet(&collector, round as u8);
    }
    for _ in 0..4 {
        collector.record(MockEvent { value: [0; 10] });
    }
    // No free slot yet: the count stays pending.
    assert_eq!(collector.flush(), None);

    for _ in 0..PACKET_COUNT_MAX {
        drain_one(&collector).unwrap();
    }
    assert_eq!(collector.flush(), Some(PACKET_COUNT_MAX as u32));

    let bytes = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&bytes).unwrap();
    assert_eq!(view.events_discarded(), 4);
    assert_eq!(
        view.header().content_size.get(),
        PACKET_HEADER_LEN as u32 * SIZE_FIELD_SCALE
    );
    assert!(view.content().is_empty());
}

#[test]
fn events_are_stamped_from_the_platform() {
    let collector = collector(13);
    let mut event = Event::new(MockEvent { value: [0; 10] });
    collector.push_event(&mut event);
    assert_eq!(event.timestamp(), 1_000);
    collector.push_event(&mut event);
    assert_eq!(event.timestamp(), 1_010);

    collector.flush();
    let bytes = drain_one(&collector).unwrap();
    let (view, _) = PacketView::parse(&bytes).unwrap();
    let stamps: Vec<u64> = view
        .records(mock_len)
        .map(|r| r.unwrap().timestamp)
        .collect();
    assert_eq!(stamps, vec![1_000, 1_010]);
}

#[test]
fn sequential_packets_with_different_payloads() {
    let collector = collector(200);

    fill_packet(&collector, 0x11);
    let data1 = drain_one(&collector).unwrap();

    fill_packet(&collector, 0x22);
    let data2 = drain_one(&collector).unwrap();

    let (first, _) = PacketView::parse(&data1).unwrap();
    let (second, _) = PacketView::parse(&data2).unwrap();
    assert_eq!(first.stream_id(), 200);
    assert_eq!(second.sequence(), first.sequence() + 1);
    assert_ne!(first.content(), second.content());

    let params = |view: &PacketView<'_>| -> Vec<u8> {
        view.records(mock_len)
            .flat_map(|r| r.unwrap().param.to_vec())
            .collect()
    };
    assert!(params(&first).iter().all(|b| *b == 0x11));
    assert!(params(&second).iter().all(|b| *b == 0x22));
}

#[test]
fn only_one_consumer_at_a_time() {
    let collector = collector(14);
    let consumer = collector.consumer().unwrap();
    assert!(collector.consumer().is_none());
    drop(consumer);
    assert!(collector.consumer().is_some());
}

#[test]
fn draining_packet_survives_consumer_drop() {
    let collector = collector(15);
    fill_packet(&collector, 0x77);
    fill_packet(&collector, 0x78);

    let first = {
        let mut consumer = collector.consumer().unwrap();
        consumer.get_send_packet().unwrap().to_vec()
    };
    assert_eq!(collector.packets_in_use(), 2);

    let mut consumer = collector.consumer().unwrap();
    assert!(consumer.is_draining());
    assert_eq!(consumer.get_send_packet().unwrap(), first.as_slice());
    consumer.send_packet_completed();
    assert_eq!(
        PacketView::parse(consumer.get_send_packet().unwrap())
            .unwrap()
            .0
            .sequence(),
        1
    );
}

#[test]
fn released_packets_are_wiped() {
    let collector = collector(16);
    fill_packet(&collector, 0x99);
    drain_one(&collector).unwrap();

    let slot = collector.pool.allocate().unwrap();
    assert!(collector
        .pool
        .get(slot)
        .lock()
        .as_bytes()
        .iter()
        .all(|b| *b == 0));
}

#[traced_test]
#[test]
fn logs_when_discarding_starts() {
    let collector = collector(17);
    for round in 0..PACKET_COUNT_MAX {
        fill_packet(&collector, round as u8);
    }
    collector.record(MockEvent { value: [0; 10] });
    collector.record(MockEvent { value: [0; 10] });
    assert!(logs_contain("packet pool exhausted"));
}

#[test]
fn concurrent_producers_keep_per_producer_order() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 500;

    let collector = Arc::new(
        Collector::builder()
            .stream_id(21)
            .platform(VirtualPlatform::new(VirtualClock::new(0), 1))
            .build()
            .unwrap(),
    );

    let finished = AtomicU32::new(0);
    let drained = std::thread::scope(|s| {
        for producer in 0..PRODUCERS {
            let collector = Arc::clone(&collector);
            let finished = &finished;
            s.spawn(move || {
                let mut event = Event::new(LoopCount {
                    producer: U32::new(producer),
                    count: U32::new(0),
                });
                for count in 0..PER_PRODUCER {
                    event.param_mut().count.set(count);
                    collector.push_event(&mut event);
                }
                finished.fetch_add(1, Ordering::Release);
            });
        }

        let consumer = s.spawn(|| {
            let mut consumer = collector.consumer().unwrap();
            let mut packets = Vec::new();
            loop {
                let done = finished.load(Ordering::Acquire) == PRODUCERS;
                match consumer.get_send_packet() {
                    Some(bytes) => {
                        packets.push(bytes.to_vec());
                        consumer.send_packet_completed();
                    }
                    None if done => {
                        if collector.flush().is_none() {
                            break;
                        }
                    }
                    None => std::thread::yield_now(),
                }
            }
            packets
        });
        consumer.join().unwrap()
    });

    let stats = collector.stats();
    assert_eq!(
        stats.events_recorded + stats.events_discarded,
        u64::from(PRODUCERS * PER_PRODUCER)
    );

    let mut last_count = vec![None::<u32>; PRODUCERS as usize];
    let mut last_timestamp = 0;
    let mut recorded = 0;
    for (expected_seq, bytes) in drained.iter().enumerate() {
        let (view, _) = PacketView::parse(bytes).unwrap();
        assert_eq!(view.sequence(), expected_seq as u32);
        for record in view.records(|id| (id == LoopCount::ID).then_some(8)) {
            let record = record.unwrap();
            let producer = u32::from_le_bytes(record.param[..4].try_into().unwrap()) as usize;
            let count = u32::from_le_bytes(record.param[4..].try_into().unwrap());
            if let Some(previous) = last_count[producer] {
                assert!(count > previous);
            }
            last_count[producer] = Some(count);
            assert!(record.timestamp >= last_timestamp);
            last_timestamp = record.timestamp;
            recorded += 1;
        }
    }
    assert_eq!(recorded, stats.events_recorded);
    assert!(recorded > 0);
}
