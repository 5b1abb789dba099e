//! # Tracelet Engine
//!
//! Drives a collector end to end: the built-in capture run, which pushes
//! events from producer threads and writes drained packets to a sink, and
//! decoding of the resulting packet streams. Frontends share these entry
//! points.

pub mod capture;
pub mod error;
pub mod inspect;
pub mod payload;

pub use capture::{capture_with_config, run_capture, CaptureOptions, CaptureReport};
pub use error::EngineError;
pub use inspect::{inspect, inspect_file, DecodedEvent, PacketSummary};
pub use payload::{loop_schema, LoopCount, LOOP_SCHEMA};
