//! # Tracelet Telemetry
//!
//! Logging setup and Prometheus metrics for pipeline runs.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
