//! Recorded sample file ingestion adapter
//!
//! Replays a comma-separated recording as a stream of signals. Rows are
//! `index,signal name,timestamp,value` with a header row first, the
//! format written by the in-vehicle recorder. In production this adapter
//! is replaced by the digital-twin subscription; the engine only ever
//! sees `Signal` values.

use anyhow::{Context, Result};
use risk_event_engine::Signal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read a recorded sample file into signals, in file order
///
/// Malformed rows are skipped with a warning rather than aborting the
/// replay - recordings from test drives regularly contain truncated
/// trailing lines.
pub fn read_sample_file(path: &Path) -> Result<Vec<Signal>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open sample file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut signals = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("Failed to read sample file: {:?}", path))?;

        // First line is the header row
        if line_no == 0 || line.trim().is_empty() {
            continue;
        }

        match parse_sample_row(&line) {
            Some(signal) => signals.push(signal),
            None => {
                skipped += 1;
                log::warn!("{:?}:{}: malformed sample row, skipping", path, line_no + 1);
            }
        }
    }

    if skipped > 0 {
        log::warn!("{:?}: skipped {} malformed row(s)", path, skipped);
    }
    log::debug!("{:?}: {} sample(s) read", path, signals.len());

    Ok(signals)
}

/// Parse one `index,name,timestamp,value` row
fn parse_sample_row(line: &str) -> Option<Signal> {
    let mut fields = line.split(',');

    let _index = fields.next()?;
    let name = fields.next()?.trim();
    let timestamp: f64 = fields.next()?.trim().parse().ok()?;
    let value: f64 = fields.next()?.trim().parse().ok()?;

    if name.is_empty() {
        return None;
    }
    Some(Signal::new(name, value, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_sample_row() {
        let signal = parse_sample_row("17,Vehicle_Speed_Speed,12.5,103.2").unwrap();
        assert_eq!(signal.name, "Vehicle_Speed_Speed");
        assert_eq!(signal.timestamp, 12.5);
        assert_eq!(signal.value, 103.2);
    }

    #[test]
    fn test_parse_rejects_malformed_rows() {
        assert!(parse_sample_row("").is_none());
        assert!(parse_sample_row("1,Vehicle_Speed_Speed").is_none());
        assert!(parse_sample_row("1,Vehicle_Speed_Speed,not_a_time,50.0").is_none());
        assert!(parse_sample_row("1,,12.5,50.0").is_none());
    }

    #[test]
    fn test_read_sample_file_skips_header_and_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "index,signal,timestamp,value").unwrap();
        writeln!(file, "0,Vehicle_Speed_Speed,0.0,50.0").unwrap();
        writeln!(file, "1,Vehicle_Speed_Speed,0.1,52.0").unwrap();
        writeln!(file, "garbage line").unwrap();
        writeln!(file, "2,ADAS_CruiseControl_IsActive,0.2,1.0").unwrap();

        let signals = read_sample_file(file.path()).unwrap();
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].value, 50.0);
        assert_eq!(signals[2].name, "ADAS_CruiseControl_IsActive");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_sample_file(Path::new("/nonexistent/recording.csv")).is_err());
    }
}
