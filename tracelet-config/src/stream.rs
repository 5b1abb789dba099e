//! Stream identity.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stream configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StreamConfig {
    /// Stream identifier stamped into every packet header.
    #[validate(range(min = 1))]
    #[serde(default = "default_stream_id")]
    pub id: u32,

    /// Event schema describing the payload types on this stream.
    #[serde(default)]
    pub schema: Option<PathBuf>,
}

fn default_stream_id() -> u32 {
    1
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            id: default_stream_id(),
            schema: None,
        }
    }
}
