//! Dispatch sinks for detected risk events
//!
//! The engine hands every detection to an `EventSink`; these are the local
//! stand-ins for the vehicle-to-cloud transport. The JSON-lines sink
//! writes the wire payload one event per line, the console sink prints a
//! human-readable summary.

use anyhow::{Context, Result};
use risk_event_engine::{EventSink, RiskEvent};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Human-readable sink printing one block per detection
#[derive(Debug, Default)]
pub struct ConsoleSink {
    published: usize,
}

impl ConsoleSink {
    /// Create a new console sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events published so far
    pub fn published(&self) -> usize {
        self.published
    }
}

impl EventSink for ConsoleSink {
    fn publish(&mut self, event: RiskEvent) {
        self.published += 1;

        let phase = match event.start {
            Some(true) => " [start]",
            Some(false) => " [end]",
            None => "",
        };
        println!(
            "[{:>10.3}] {} (risk {}){}",
            event.timestamp, event.name, event.risk_level, phase
        );
        for (signal, value) in &event.event_data {
            println!("             {} = {}", signal, value);
        }
    }
}

/// JSON-lines sink: one serialized risk event per line
pub struct JsonlSink<W: Write> {
    writer: W,
    published: usize,
}

impl JsonlSink<BufWriter<File>> {
    /// Create a sink writing to a file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {:?}", path))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    /// Create a sink over any writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            published: 0,
        }
    }

    /// Flush buffered events and return the publish count
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().context("Failed to flush output")?;
        Ok(self.published)
    }
}

impl<W: Write> EventSink for JsonlSink<W> {
    fn publish(&mut self, event: RiskEvent) {
        // Transport failures are the sink's concern, not the engine's:
        // log and keep processing
        match serde_json::to_string(&event) {
            Ok(line) => match writeln!(self.writer, "{}", line) {
                Ok(()) => self.published += 1,
                Err(e) => log::error!("failed to write risk event `{}`: {}", event.name, e),
            },
            Err(e) => log::error!("failed to serialize risk event `{}`: {}", event.name, e),
        }
    }
}
