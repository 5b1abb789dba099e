//! ## tracelet-cli
//! **Command-line frontend**
//!
//! Runs captures, generates schema artifacts and decodes dumped streams.

use clap::Parser;
use tracelet_telemetry::logging::EventLogger;

mod commands;

use commands::Cli;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    EventLogger::init(&config.telemetry.log_level)?;

    commands::run_command(cli, config)
}
