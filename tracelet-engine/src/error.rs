use thiserror::Error;

use tracelet_config::ConfigError;
use tracelet_core::{CollectorError, DecodeError};
use tracelet_schema::SchemaError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("collector setup failed: {0}")]
    Collector(#[from] CollectorError),

    #[error("malformed packet stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("schema does not describe event id {id} with a {len}-byte payload")]
    SchemaMismatch { id: u32, len: usize },

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("consumer side of the collector is already claimed")]
    ConsumerBusy,

    #[error("stream digest mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}
