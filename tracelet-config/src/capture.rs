//! Capture run configuration.
//!
//! Parameters of the built-in capture: how many producer threads push
//! events, how many events each pushes, where drained packets are written
//! and which clock stamps them.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Timestamp source for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Monotonic host clock.
    #[default]
    System,
    /// Deterministic virtual clock advancing a fixed tick per event.
    Virtual,
}

/// Capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Events pushed by each producer.
    #[validate(range(min = 1))]
    #[serde(default = "default_events")]
    pub events: u64,

    /// Producer threads.
    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_producers")]
    pub producers: u32,

    /// File receiving the drained packet stream.
    #[validate(custom(function = validation::validate_output))]
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub clock: ClockMode,

    /// Virtual clock step per timestamp, nanoseconds.
    #[validate(range(min = 1))]
    #[serde(default = "default_tick_ns")]
    pub tick_ns: u64,

    /// Flush the last partial packet when producers finish.
    #[serde(default = "default_true")]
    pub flush_on_exit: bool,

    /// Producers wait for a free packet instead of letting the collector
    /// discard. With one producer and the virtual clock the output is then
    /// byte-for-byte reproducible.
    #[serde(default = "default_true")]
    pub lossless: bool,
}

fn default_events() -> u64 {
    10
}

fn default_producers() -> u32 {
    1
}

fn default_output() -> String {
    "stream.bin".into()
}

fn default_tick_ns() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            events: default_events(),
            producers: default_producers(),
            output: default_output(),
            clock: ClockMode::default(),
            tick_ns: default_tick_ns(),
            flush_on_exit: default_true(),
            lossless: default_true(),
        }
    }
}
