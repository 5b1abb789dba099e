//! Built-in capture run.
//!
//! Producer threads push [`LoopCount`] events into a collector while the
//! calling thread drains finished packets into a sink. The stream written to
//! the sink is hashed with BLAKE3 so runs can be compared.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;

use blake3::Hasher;
use crossbeam::utils::Backoff;
use tracing::{debug, info, instrument};

use tracelet_config::{CaptureConfig, ClockMode, TraceletConfig};
use tracelet_core::collector::Consumer;
use tracelet_core::event::Event;
use tracelet_core::platform::{Platform, StdPlatform, VirtualPlatform};
use tracelet_core::stats::StatsSnapshot;
use tracelet_core::time::VirtualClock;
use tracelet_core::Collector;
use tracelet_telemetry::MetricsRecorder;

use crate::error::EngineError;
use crate::payload::LoopCount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Events pushed by each producer.
    pub events: u64,
    pub producers: u32,
    /// Close the trailing partial packet once producers are done.
    pub flush_on_exit: bool,
    /// Wait for pool capacity instead of losing events.
    pub lossless: bool,
}

impl From<&CaptureConfig> for CaptureOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            events: config.events,
            producers: config.producers,
            flush_on_exit: config.flush_on_exit,
            lossless: config.lossless,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub stream_id: u32,
    pub stats: StatsSnapshot,
    pub packets_written: u64,
    pub bytes_written: u64,
    /// BLAKE3 digest of everything written to the sink, hex encoded.
    pub digest: String,
}

impl CaptureReport {
    pub fn validate_digest(&self, expected: &str) -> Result<(), EngineError> {
        if self.digest.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(EngineError::HashMismatch {
                expected: expected.to_string(),
                actual: self.digest.clone(),
            })
        }
    }
}

struct Drain<'s, W> {
    sink: &'s mut W,
    hasher: Hasher,
    packets: u64,
    bytes: u64,
}

impl<W: Write> Drain<'_, W> {
    /// Writes one ready packet, if any. Returns whether a packet was written.
    fn step<P: Platform>(
        &mut self,
        consumer: &mut Consumer<'_, P>,
        metrics: Option<&MetricsRecorder>,
    ) -> Result<bool, EngineError> {
        let Some(bytes) = consumer.get_send_packet() else {
            return Ok(false);
        };
        self.sink.write_all(bytes)?;
        self.hasher.update(bytes);
        self.packets += 1;
        self.bytes += bytes.len() as u64;
        if let Some(metrics) = metrics {
            metrics.add_drained_bytes(bytes.len());
        }
        consumer.send_packet_completed();
        Ok(true)
    }

    fn until_empty<P: Platform>(
        &mut self,
        consumer: &mut Consumer<'_, P>,
        metrics: Option<&MetricsRecorder>,
    ) -> Result<(), EngineError> {
        while self.step(consumer, metrics)? {}
        Ok(())
    }
}

/// Runs producers against `collector` and drains every packet into `sink`.
#[instrument(level = "info", skip_all, fields(stream_id = collector.stream_id()))]
pub fn run_capture<P: Platform, W: Write>(
    collector: &Collector<P>,
    options: &CaptureOptions,
    sink: &mut W,
    metrics: Option<&MetricsRecorder>,
) -> Result<CaptureReport, EngineError> {
    let mut consumer = collector.consumer().ok_or(EngineError::ConsumerBusy)?;
    let mut drain = Drain {
        sink,
        hasher: Hasher::new(),
        packets: 0,
        bytes: 0,
    };

    let finished = AtomicU32::new(0);
    let abort = AtomicBool::new(false);

    info!(
        producers = options.producers,
        events = options.events,
        lossless = options.lossless,
        "starting capture"
    );

    thread::scope(|scope| -> Result<(), EngineError> {
        for producer in 0..options.producers {
            let finished = &finished;
            let abort = &abort;
            let spawned = thread::Builder::new()
                .name(format!("producer-{producer}"))
                .spawn_scoped(scope, move || {
                    produce(collector, producer, options, abort);
                    finished.fetch_add(1, Ordering::Release);
                });
            if let Err(err) = spawned {
                abort.store(true, Ordering::Relaxed);
                return Err(err.into());
            }
        }

        let backoff = Backoff::new();
        loop {
            match drain.step(&mut consumer, metrics) {
                Ok(true) => {
                    backoff.reset();
                    if let Some(metrics) = metrics {
                        metrics.observe(&collector.stats(), collector.packets_in_use());
                    }
                }
                Ok(false) if finished.load(Ordering::Acquire) == options.producers => break,
                Ok(false) => backoff.snooze(),
                Err(err) => {
                    abort.store(true, Ordering::Relaxed);
                    return Err(err);
                }
            }
        }
        Ok(())
    })?;

    // Packets queued between the last empty poll and the final producer exit.
    drain.until_empty(&mut consumer, metrics)?;

    if options.flush_on_exit {
        if let Some(seq) = collector.flush() {
            debug!(seq, "flushed trailing packet");
        }
        drain.until_empty(&mut consumer, metrics)?;
    }
    drain.sink.flush()?;

    let stats = collector.stats();
    if let Some(metrics) = metrics {
        metrics.observe(&stats, collector.packets_in_use());
    }

    let report = CaptureReport {
        stream_id: collector.stream_id(),
        stats,
        packets_written: drain.packets,
        bytes_written: drain.bytes,
        digest: hex::encode(drain.hasher.finalize().as_bytes()),
    };
    info!(
        packets = report.packets_written,
        bytes = report.bytes_written,
        digest = %report.digest,
        "capture complete"
    );
    Ok(report)
}

fn produce<P: Platform>(
    collector: &Collector<P>,
    producer: u32,
    options: &CaptureOptions,
    abort: &AtomicBool,
) {
    let backoff = Backoff::new();
    for count in 0..options.events {
        if abort.load(Ordering::Relaxed) {
            return;
        }
        let payload = LoopCount::new(producer, count);
        if !options.lossless {
            collector.record(payload);
            continue;
        }

        // Pool exhaustion hands the event back; wait for the consumer.
        let mut event = Event::new(payload);
        while collector.try_push_event(&mut event).is_none() {
            if abort.load(Ordering::Relaxed) {
                return;
            }
            backoff.snooze();
        }
        backoff.reset();
    }
}

/// Builds the collector described by `config` and runs a capture into `sink`.
pub fn capture_with_config<W: Write>(
    config: &TraceletConfig,
    sink: &mut W,
    metrics: Option<&MetricsRecorder>,
) -> Result<CaptureReport, EngineError> {
    let options = CaptureOptions::from(&config.capture);
    match config.capture.clock {
        ClockMode::System => {
            let collector = Collector::builder()
                .stream_id(config.stream.id)
                .platform(StdPlatform::new())
                .build()?;
            run_capture(&collector, &options, sink, metrics)
        }
        ClockMode::Virtual => {
            let platform = VirtualPlatform::new(VirtualClock::new(0), config.capture.tick_ns);
            let collector = Collector::builder()
                .stream_id(config.stream.id)
                .platform(platform)
                .build()?;
            run_capture(&collector, &options, sink, metrics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelet_core::config::EVENT_MAX_PER_PACKET;
    use tracelet_core::packet::{PacketStream, PACKET_LEN};

    use crate::payload::loop_schema;

    fn virtual_config(events: u64, producers: u32) -> TraceletConfig {
        let mut config = TraceletConfig::default();
        config.stream.id = 200;
        config.capture.events = events;
        config.capture.producers = producers;
        config.capture.clock = ClockMode::Virtual;
        config.capture.tick_ns = 10;
        config
    }

    #[test]
    fn single_producer_capture_is_complete() {
        let mut sink = Vec::new();
        let report = capture_with_config(&virtual_config(40, 1), &mut sink, None).unwrap();

        // 40 events: two full packets plus a flushed one holding 8.
        assert_eq!(report.packets_written, 3);
        assert_eq!(report.bytes_written, 3 * PACKET_LEN as u64);
        assert_eq!(sink.len(), 3 * PACKET_LEN);
        assert_eq!(report.stats.events_recorded, 40);
        assert_eq!(report.stats.events_discarded, 0);
        assert_eq!(report.stats.packets_completed, 2);
        assert_eq!(report.stats.packets_flushed, 1);

        let schema = loop_schema().unwrap();
        let mut expected = 0u64;
        for (seq, packet) in PacketStream::new(&sink).enumerate() {
            let packet = packet.unwrap();
            assert_eq!(packet.stream_id(), 200);
            assert_eq!(packet.sequence(), seq as u32);
            for record in packet.records(|id| schema.payload_len(id)) {
                let record = record.unwrap();
                let fields = schema.event(record.id).unwrap().decode(record.param).unwrap();
                assert_eq!(fields[1].value.to_string(), expected.to_string());
                expected += 1;
            }
        }
        assert_eq!(expected, 40);
    }

    #[test]
    fn virtual_clock_capture_is_reproducible() {
        let config = virtual_config(100, 1);
        let mut first = Vec::new();
        let mut second = Vec::new();
        let a = capture_with_config(&config, &mut first, None).unwrap();
        let b = capture_with_config(&config, &mut second, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
        assert!(a.validate_digest(&b.digest.to_uppercase()).is_ok());
        assert!(matches!(
            a.validate_digest("00"),
            Err(EngineError::HashMismatch { .. })
        ));
    }

    #[test]
    fn without_flush_partial_packet_stays_behind() {
        let mut config = virtual_config(EVENT_MAX_PER_PACKET as u64 + 3, 1);
        config.capture.flush_on_exit = false;
        let mut sink = Vec::new();
        let report = capture_with_config(&config, &mut sink, None).unwrap();
        assert_eq!(report.packets_written, 1);
        assert_eq!(report.stats.events_recorded, EVENT_MAX_PER_PACKET as u64 + 3);
    }

    #[test]
    fn concurrent_producers_lose_nothing_in_lossless_mode() {
        let mut sink = Vec::new();
        let metrics = MetricsRecorder::new().unwrap();
        let report =
            capture_with_config(&virtual_config(250, 4), &mut sink, Some(&metrics)).unwrap();

        let stats = report.stats;
        assert_eq!(stats.events_discarded, 0);
        assert_eq!(stats.events_recorded, 1000);
        assert_eq!(stats.packets_drained, report.packets_written);
        assert_eq!(metrics.drained_bytes.get(), report.bytes_written);
        assert_eq!(metrics.pool_in_use.get(), 0);

        let schema = loop_schema().unwrap();
        let mut per_producer = [0u64; 4];
        for packet in PacketStream::new(&sink) {
            let packet = packet.unwrap();
            assert_eq!(packet.events_discarded(), 0);
            for record in packet.records(|id| schema.payload_len(id)) {
                let record = record.unwrap();
                let fields = schema.event(record.id).unwrap().decode(record.param).unwrap();
                let producer: usize = fields[0].value.to_string().parse().unwrap();
                per_producer[producer] += 1;
            }
        }
        assert_eq!(per_producer, [250; 4]);
    }

    #[test]
    fn lossless_mode_holds_under_contention() {
        for _ in 0..10 {
            let report =
                capture_with_config(&virtual_config(2_000, 8), &mut std::io::sink(), None)
                    .unwrap();
            assert_eq!(report.stats.events_discarded, 0);
            assert_eq!(report.stats.events_recorded, 16_000);
        }
    }

    #[test]
    fn busy_consumer_is_reported() {
        let collector = Collector::builder()
            .stream_id(1)
            .platform(VirtualPlatform::new(VirtualClock::new(0), 1))
            .build()
            .unwrap();
        let _held = collector.consumer().unwrap();
        let options = CaptureOptions {
            events: 1,
            producers: 1,
            flush_on_exit: true,
            lossless: true,
        };
        let result = run_capture(&collector, &options, &mut Vec::new(), None);
        assert!(matches!(result, Err(EngineError::ConsumerBusy)));
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_stops_producers() {
        let result = capture_with_config(&virtual_config(10_000, 2), &mut FailingSink, None);
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
