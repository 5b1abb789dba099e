//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found error.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Configuration validation error.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// Figment parsing error.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parsing(Box::new(err))
    }
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (section, kind) in errors.errors() {
        match kind {
            validator::ValidationErrorsKind::Struct(nested) => {
                for (field, errors) in nested.field_errors() {
                    let _ = writeln!(output, "Field '{}.{}':", section, field);
                    write_messages(&mut output, errors);
                }
            }
            validator::ValidationErrorsKind::Field(errors) => {
                let _ = writeln!(output, "Field '{}':", section);
                write_messages(&mut output, errors);
            }
            validator::ValidationErrorsKind::List(_) => {
                let _ = writeln!(output, "Field '{}': invalid entries", section);
            }
        }
    }
    output
}

fn write_messages(output: &mut String, errors: &[validator::ValidationError]) {
    use std::fmt::Write;

    for error in errors {
        let message = match &error.message {
            Some(msg) => msg.to_string(),
            None => error.code.to_string(),
        };
        let _ = writeln!(output, "  - {}", message);
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}
