use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use tracelet_config::{ClockMode, TraceletConfig};
use tracelet_core::packet::SIZE_FIELD_SCALE;
use tracelet_engine::{capture_with_config, inspect_file, loop_schema};
use tracelet_schema::{codegen, ctf, Schema};
use tracelet_telemetry::{EventLogger, MetricsRecorder};

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "tracelet", version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/tracelet.yaml plus TRACELET_* overrides
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push loop events from producer threads and dump the packet stream
    Capture(CaptureArgs),
    /// Generate CTF metadata (and optionally Rust payload types) from a schema
    Metadata(MetadataArgs),
    /// Decode a dumped packet stream
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Events pushed by each producer
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub events: Option<u64>,
    /// Producer threads
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub producers: Option<u32>,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub stream_id: Option<u32>,
    /// Stamp events from a deterministic virtual clock
    #[arg(long)]
    pub virtual_clock: bool,
    /// Let the collector discard events when the packet pool is exhausted
    #[arg(long)]
    pub lossy: bool,
    /// Leave a trailing partial packet unsent
    #[arg(long)]
    pub no_flush: bool,
    /// Fail unless the stream's BLAKE3 digest equals this hex string
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    #[arg(long)]
    pub schema: PathBuf,
    /// Output directory
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long)]
    pub stream_id: Option<u32>,
    /// Also write Rust payload types to events.rs
    #[arg(long)]
    pub rust: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Schema for decoding; defaults to the configured one, then the built-in loop schema
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

pub fn load_config(cli: &Cli) -> Result<TraceletConfig, tracelet_config::ConfigError> {
    match &cli.config {
        Some(path) => TraceletConfig::load_from_path(path),
        None => TraceletConfig::load(),
    }
}

pub fn run_command(cli: Cli, mut config: TraceletConfig) -> CliResult {
    match cli.command {
        Commands::Capture(args) => {
            apply_capture_args(&mut config, &args);
            run_capture(&config, args.validate_hash.as_deref())
        }
        Commands::Metadata(args) => run_metadata(&config, &args),
        Commands::Inspect(args) => run_inspect(&config, &args),
    }
}

fn apply_capture_args(config: &mut TraceletConfig, args: &CaptureArgs) {
    let capture = &mut config.capture;
    if let Some(events) = args.events {
        capture.events = events;
    }
    if let Some(producers) = args.producers {
        capture.producers = producers;
    }
    if let Some(output) = &args.output {
        capture.output = output.to_string_lossy().into_owned();
    }
    if args.virtual_clock {
        capture.clock = ClockMode::Virtual;
    }
    if args.lossy {
        capture.lossless = false;
    }
    if args.no_flush {
        capture.flush_on_exit = false;
    }
    if let Some(id) = args.stream_id {
        config.stream.id = id;
    }
    if args.metrics {
        config.telemetry.metrics = true;
    }
}

fn run_capture(config: &TraceletConfig, validate_hash: Option<&str>) -> CliResult {
    if let Some(expected) = validate_hash {
        hex::decode(expected).map_err(|e| format!("--validate-hash is not hex: {e}"))?;
    }

    let metrics = if config.telemetry.metrics {
        Some(MetricsRecorder::new()?)
    } else {
        None
    };

    let mut sink = BufWriter::new(File::create(&config.capture.output)?);
    let report = capture_with_config(config, &mut sink, metrics.as_ref())?;
    sink.flush()?;

    EventLogger::log_stats(report.stream_id, &report.stats);
    println!(
        "wrote {} packets ({} bytes) to {}",
        report.packets_written, report.bytes_written, config.capture.output
    );
    println!("stream digest: {}", report.digest);

    if let Some(metrics) = &metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    if let Some(expected) = validate_hash {
        report.validate_digest(expected)?;
        info!("stream digest validated");
    }
    Ok(())
}

fn run_metadata(config: &TraceletConfig, args: &MetadataArgs) -> CliResult {
    let schema = Schema::load(&args.schema)?;
    let stream_id = args.stream_id.unwrap_or(config.stream.id);

    fs::create_dir_all(&args.out)?;
    let metadata_path = args.out.join("metadata");
    fs::write(&metadata_path, ctf::render_metadata(&schema, stream_id))?;
    info!(path = %metadata_path.display(), events = schema.len(), "wrote CTF metadata");
    if SIZE_FIELD_SCALE == 1 {
        warn!(
            "this build writes packet_size/content_size in bytes; CTF readers expect bits, \
             rebuild with the tracelet-core `ctf-bit-sizes` feature before capturing for babeltrace"
        );
    }

    if args.rust {
        let source_path = args.out.join("events.rs");
        fs::write(&source_path, codegen::render_rust(&schema, stream_id))?;
        info!(path = %source_path.display(), "wrote payload types");
    }
    Ok(())
}

fn run_inspect(config: &TraceletConfig, args: &InspectArgs) -> CliResult {
    let schema = match args.schema.as_ref().or(config.stream.schema.as_ref()) {
        Some(path) => Schema::load(path)?,
        None => loop_schema()?,
    };

    let packets = inspect_file(&args.file, &schema)?;
    for packet in &packets {
        print!("{packet}");
    }
    let events: usize = packets.iter().map(|p| p.events.len()).sum();
    println!("{} packets, {events} events", packets.len());
    Ok(())
}
