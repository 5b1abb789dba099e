//! Schema loading and validation errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("event id {id} used by both '{first}' and '{second}'")]
    DuplicateId {
        id: u32,
        first: String,
        second: String,
    },

    #[error("event name '{0}' defined more than once")]
    DuplicateName(String),

    #[error("event '{event}' declares parameter '{param}' more than once")]
    DuplicateParam { event: String, param: String },

    #[error("event '{event}' parameter '{param}' has unsupported type '{ty}'")]
    UnsupportedType {
        event: String,
        param: String,
        ty: String,
    },

    #[error("event '{event}' payload is {size} bytes, limit is {max}")]
    PayloadTooLarge {
        event: String,
        size: usize,
        max: usize,
    },
}
