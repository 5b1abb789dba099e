//! ## tracelet-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Installs the global fmt subscriber and provides a few structured
//! summaries shared by the engine and the CLI.

use tracelet_core::stats::StatsSnapshot;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Install the global subscriber. `RUST_LOG` overrides `default_level`.
    pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))?;
        fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_target(false)
            .try_init()
    }

    /// Log a pipeline summary at info level.
    pub fn log_stats(stream_id: u32, stats: &StatsSnapshot) {
        tracing::info!(
            stream_id,
            events_recorded = stats.events_recorded,
            events_discarded = stats.events_discarded,
            packets_completed = stats.packets_completed,
            packets_flushed = stats.packets_flushed,
            packets_drained = stats.packets_drained,
            "pipeline summary"
        );
        if stats.events_discarded > 0 {
            tracing::warn!(
                stream_id,
                discarded = stats.events_discarded,
                "events were discarded, consumer fell behind"
            );
        }
    }
}
