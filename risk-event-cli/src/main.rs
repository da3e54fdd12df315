//! Risk Event Detector CLI
//!
//! Replays recorded vehicle signal files through the detection engine and
//! dispatches the detected risk events. Each sample file is one vehicle:
//! recordings are replayed in parallel, every vehicle with its own
//! isolated engine instance over the shared, immutable event table.
//!
//! In production the ingestion side is a digital-twin subscription and the
//! dispatch side an MQTT upload; this binary is the local simulation of
//! that pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use risk_event_engine::{DetectionEngine, EventSink, EventTable, RiskEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod replay;
mod sink;

/// Risk Event Detector - detect risk events in recorded signal streams
#[derive(Parser, Debug)]
#[command(name = "risk-event-cli")]
#[command(about = "Detect risk events in recorded vehicle signal streams", long_about = None)]
#[command(version)]
struct Args {
    /// Recorded sample file(s), one per vehicle (can be repeated)
    #[arg(short, long, value_name = "FILE", required = true)]
    samples: Vec<PathBuf>,

    /// Path to the event definition file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Write detected events as JSON lines to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Risk Event Detector CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using detection engine v{}", risk_event_engine::VERSION);

    // Load and compile the event definitions once
    let app_config = config::load_config(&args.config)?;
    let table = Arc::new(config::build_event_table(&app_config)?);

    if !args.quiet {
        println!("═══════════════════════════════════════════════");
        println!("  Risk Event Detector");
        println!("═══════════════════════════════════════════════");
        println!(
            "Definitions: {}   History depth: {}   Vehicles: {}\n",
            table.len(),
            table.history_depth(),
            args.samples.len()
        );
    }

    // One isolated engine per vehicle recording; only the immutable event
    // table is shared across the workers
    let runs: Vec<(String, Result<Vec<RiskEvent>>)> = args
        .samples
        .par_iter()
        .map(|path| (vehicle_name(path), replay_vehicle(path, &table)))
        .collect();

    let mut console = sink::ConsoleSink::new();
    let mut jsonl = match &args.output {
        Some(path) => Some(sink::JsonlSink::create(path)?),
        None => None,
    };

    let mut total = 0usize;
    for (vehicle, result) in runs {
        let events =
            result.with_context(|| format!("Replay failed for vehicle `{}`", vehicle))?;
        if !args.quiet {
            println!("Vehicle `{}`: {} risk event(s)", vehicle, events.len());
        }
        total += events.len();

        for event in events {
            match jsonl.as_mut() {
                Some(sink) => sink.publish(event),
                None => {
                    if !args.quiet {
                        console.publish(event);
                    }
                }
            }
        }
    }

    if let Some(sink) = jsonl {
        let written = sink.finish()?;
        if let Some(path) = &args.output {
            log::info!("{} event(s) written to {:?}", written, path);
        }
    } else {
        log::debug!("{} event(s) printed to console", console.published());
    }
    if !args.quiet {
        println!(
            "\n✓ Done: {} risk event(s) across {} vehicle(s)",
            total,
            args.samples.len()
        );
    }

    Ok(())
}

/// Vehicle identifier derived from the recording file name
fn vehicle_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("vehicle")
        .to_string()
}

/// Replay one vehicle recording through its own engine instance
fn replay_vehicle(path: &Path, table: &Arc<EventTable>) -> Result<Vec<RiskEvent>> {
    let samples = replay::read_sample_file(path)?;

    let mut engine = DetectionEngine::new(Arc::clone(table));
    let mut events = Vec::new();
    for signal in &samples {
        engine.process(signal, &mut events);
    }

    log::info!(
        "{:?}: {} sample(s) replayed, {} risk event(s)",
        path,
        samples.len(),
        events.len()
    );
    Ok(events)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
