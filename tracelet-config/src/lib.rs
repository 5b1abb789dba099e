//! # Tracelet Configuration System
//!
//! Hierarchical configuration for the tracelet tools: stream identity,
//! capture run parameters and telemetry.
//!
//! ## Features
//! - **Layered Sources**: defaults, YAML files and `TRACELET_*` environment
//! - **Validation**: every section is checked before it is handed out

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod stream;
mod telemetry;
mod validation;

pub use capture::{CaptureConfig, ClockMode};
pub use error::ConfigError;
pub use stream::StreamConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/tracelet.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TraceletConfig {
    /// Stream identity and schema.
    #[validate(nested)]
    #[serde(default)]
    pub stream: StreamConfig,

    /// Capture run parameters.
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TraceletConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/tracelet.yaml`, if present
    /// 3. `config/<TRACELET_ENV>.yaml`, if present (`TRACELET_ENV` defaults to `production`)
    /// 4. `TRACELET_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(TraceletConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("TRACELET_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{env}.yaml");
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file, then apply environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment =
            Figment::from(Serialized::defaults(TraceletConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("TRACELET_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
