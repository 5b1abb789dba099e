//! ## tracelet-telemetry::metrics
//! **Prometheus exporter for pipeline counters**
//!
//! Gauges mirror a [`StatsSnapshot`]; they are set from snapshots rather
//! than incremented so the recorder can be refreshed at any cadence.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tracelet_core::stats::StatsSnapshot;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events_recorded: IntGauge,
    pub events_discarded: IntGauge,
    pub packets_completed: IntGauge,
    pub packets_flushed: IntGauge,
    pub packets_drained: IntGauge,
    pub pool_in_use: IntGauge,
    pub drained_bytes: IntCounter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_recorded = gauge(
            &registry,
            "tracelet_events_recorded",
            "Events copied into packets",
        )?;
        let events_discarded = gauge(
            &registry,
            "tracelet_events_discarded",
            "Events lost to packet pool exhaustion",
        )?;
        let packets_completed = gauge(
            &registry,
            "tracelet_packets_completed",
            "Packets closed at the event limit",
        )?;
        let packets_flushed = gauge(
            &registry,
            "tracelet_packets_flushed",
            "Partial packets closed by a flush",
        )?;
        let packets_drained = gauge(
            &registry,
            "tracelet_packets_drained",
            "Packets released by the consumer",
        )?;
        let pool_in_use = gauge(
            &registry,
            "tracelet_pool_in_use",
            "Packet pool slots currently allocated",
        )?;

        let drained_bytes =
            IntCounter::new("tracelet_drained_bytes_total", "Bytes handed to the sink")?;
        registry.register(Box::new(drained_bytes.clone()))?;

        Ok(Self {
            registry,
            events_recorded,
            events_discarded,
            packets_completed,
            packets_flushed,
            packets_drained,
            pool_in_use,
            drained_bytes,
        })
    }

    /// Mirror a snapshot and the current pool occupancy.
    pub fn observe(&self, stats: &StatsSnapshot, pool_in_use: usize) {
        self.events_recorded.set(clamp(stats.events_recorded));
        self.events_discarded.set(clamp(stats.events_discarded));
        self.packets_completed.set(clamp(stats.packets_completed));
        self.packets_flushed.set(clamp(stats.packets_flushed));
        self.packets_drained.set(clamp(stats.packets_drained));
        self.pool_in_use
            .set(i64::try_from(pool_in_use).unwrap_or(i64::MAX));
    }

    #[inline]
    pub fn add_drained_bytes(&self, bytes: usize) {
        self.drained_bytes.inc_by(bytes as u64);
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
