//! Application configuration loading and table compilation
//!
//! The configuration file is TOML: an optional `[engine]` section and a
//! list of `[[events]]` definitions. Invalid definitions are skipped with
//! a warning so one bad entry does not take the whole table down;
//! table-level problems (duplicates, unknown references, cycles) abort
//! the load because the remaining evaluation order would be ambiguous.

use anyhow::{Context, Result};
use risk_event_engine::{EngineConfig, EventConfig, EventTable, EventTableBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from TOML)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Compile the configured definitions into a validated event table
///
/// Structural failures are isolated per definition (skipped with a
/// warning); cross-event failures abort.
pub fn build_event_table(config: &AppConfig) -> Result<EventTable> {
    let mut builder = EventTableBuilder::new().with_min_history(config.engine.min_history);

    for event in &config.events {
        match event.compile() {
            Ok(spec) => builder
                .add(spec)
                .with_context(|| format!("Failed to add event definition `{}`", event.name))?,
            Err(e) => {
                log::warn!("skipping invalid event definition `{}`: {}", event.name, e);
            }
        }
    }

    anyhow::ensure!(!builder.is_empty(), "no valid event definitions loaded");

    builder.build().context("Failed to build event table")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
        [engine]
        min_history = 4

        [[events]]
        name = "speeding"
        event_id = 1.1
        risk_level = 2
        timeout = 30.0

        [[events.start]]
        signal = "Vehicle_Speed_Speed"
        operator = "gt"
        value = 130.0

        [[events.start]]
        signal = "Vehicle_Speed_Speed"
        method = "prev"
        context_length = 2
        operator = "lt"
        value = 130.0

        [[events.end]]
        signal = "Vehicle_Speed_Speed"
        operator = "lt"
        value = 130.0

        [events.event_data]
        Vehicle_Speed_Speed = 5

        [[events]]
        name = "comfort_zone"
        event_id = 2.0

        [[events.start]]
        signal = "Vehicle_Speed_Speed"
        operator = "bt"
        value = [60.0, 90.0]
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.engine.min_history, 4);
        assert_eq!(config.events.len(), 2);
        assert_eq!(config.events[0].start.len(), 2);
        assert_eq!(config.events[0].end.len(), 1);
        assert_eq!(config.events[0].event_data["Vehicle_Speed_Speed"], 5);
        // risk_level defaults to 1 when omitted
        assert_eq!(config.events[1].risk_level, 1);
    }

    #[test]
    fn test_build_event_table() {
        let config: AppConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        let table = build_event_table(&config).unwrap();
        assert_eq!(table.len(), 2);
        // Snapshot depth (5) dominates the configured minimum (4)
        assert_eq!(table.history_depth(), 5);
    }

    #[test]
    fn test_unknown_method_rejected_at_parse_time() {
        let result: std::result::Result<AppConfig, _> = toml::from_str(
            r#"
            [[events]]
            name = "broken"
            event_id = 1.0

            [[events.start]]
            signal = "Vehicle_Speed_Speed"
            method = "median"
            context_length = 3
            operator = "gt"
            value = 1.0
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_definition_skipped() {
        let config: AppConfig = toml::from_str(
            r#"
            [[events]]
            name = "broken"
            event_id = 1.0

            [[events.start]]
            signal = "Vehicle_Speed_Speed"
            method = "mean"
            context_length = 1
            operator = "gt"
            value = 1.0

            [[events]]
            name = "valid"
            event_id = 2.0

            [[events.start]]
            signal = "Vehicle_Speed_Speed"
            operator = "gt"
            value = 130.0
        "#,
        )
        .unwrap();

        let table = build_event_table(&config).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("valid").is_some());
        assert!(table.get("broken").is_none());
    }

    #[test]
    fn test_no_valid_definitions_is_an_error() {
        let config = AppConfig::default();
        assert!(build_event_table(&config).is_err());
    }
}
