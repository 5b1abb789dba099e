//! Custom validation functions for configuration.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static LOG_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_:]*(=(trace|debug|info|warn|error|off))?$")
        .expect("log directive pattern is valid")
});

/// Validate a log filter: a bare level, or comma-separated
/// `target=level` directives.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = !level.is_empty()
        && level
            .split(',')
            .map(str::trim)
            .all(|directive| LOG_DIRECTIVE.is_match(directive));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate that an output path is not empty.
pub fn validate_output(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        Err(ValidationError::new("empty_output_path"))
    } else {
        Ok(())
    }
}
