//! Risk Event Detection Library
//!
//! Evaluates a declarative set of event definitions against a rolling
//! per-signal history to detect driving situations (speeding, harsh
//! braking, cruise-control transitions, ...) in a stream of timestamped
//! vehicle signal samples. Each detection is emitted as a `RiskEvent` with
//! a contextual snapshot of related signals.
//!
//! # Architecture
//!
//! The library is a synchronous "sample in, zero or more risk events out"
//! transform:
//! - A bounded per-signal history store feeds the condition evaluator
//! - Conditions compare point or aggregated values (prev/mean/min/max) or
//!   another event's running flag
//! - Each definition runs a start/end state machine with a debounce window
//!   measured in domain time
//! - Cross-event references are resolved into a deterministic topological
//!   evaluation order at load time
//!
//! The library does NOT:
//! - Discover or subscribe to the in-vehicle digital twin
//! - Speak MQTT or any other transport
//! - Parse recorded sample files
//!
//! Ingestion adapters and dispatch sinks live in the application layer
//! (risk-event-cli); the engine only consumes `Signal` values and hands
//! `RiskEvent` values to an `EventSink`.
//!
//! # Example Usage
//!
//! ```
//! use risk_event_engine::{
//!     compile_events, ConditionConfig, DetectionEngine, EngineConfig, EventConfig, Method,
//!     Operator, Signal, ValueConfig,
//! };
//! use std::sync::Arc;
//!
//! // Momentary speeding event: fires on the rising edge above 130
//! let speeding = EventConfig {
//!     name: "speeding".to_string(),
//!     event_id: 1.1,
//!     risk_level: 2,
//!     start: vec![
//!         ConditionConfig {
//!             signal: Some("Vehicle_Speed_Speed".to_string()),
//!             event: None,
//!             method: Method::None,
//!             context_length: 1,
//!             operator: Operator::Gt,
//!             value: ValueConfig::Scalar(130.0),
//!         },
//!         ConditionConfig {
//!             signal: Some("Vehicle_Speed_Speed".to_string()),
//!             event: None,
//!             method: Method::Prev,
//!             context_length: 2,
//!             operator: Operator::Lt,
//!             value: ValueConfig::Scalar(130.0),
//!         },
//!     ],
//!     end: vec![],
//!     event_data: Default::default(),
//!     timeout: 0.0,
//! };
//!
//! let engine_config = EngineConfig { min_history: 2 };
//! let table = Arc::new(compile_events(&engine_config, &[speeding]).unwrap());
//! let mut engine = DetectionEngine::new(table);
//!
//! let mut detections = Vec::new();
//! engine.process(&Signal::new("Vehicle_Speed_Speed", 50.0, 0.0), &mut detections);
//! engine.process(&Signal::new("Vehicle_Speed_Speed", 140.0, 1.0), &mut detections);
//!
//! assert_eq!(detections.len(), 1);
//! assert_eq!(detections[0].name, "speeding");
//! ```

// Public modules
pub mod condition;
pub mod config;
pub mod definition;
pub mod engine;
pub mod history;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use condition::{Condition, EventRefCondition, Method, Predicate, Resolution, SignalCondition};
pub use config::{compile_events, ConditionConfig, EngineConfig, EventConfig, Operator, ValueConfig};
pub use definition::{EventSpec, EventStates, MatchResult, RuntimeState};
pub use engine::{DetectionEngine, EventSink};
pub use history::SignalHistory;
pub use table::{EventTable, EventTableBuilder, DEFAULT_MIN_HISTORY};
pub use types::{DetectorError, EventValue, Result, RiskEvent, Signal};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty table builds and tracks nothing
        let table = EventTableBuilder::new().build().unwrap();
        assert!(table.is_empty());
        assert!(!table.tracks("Vehicle_Speed_Speed"));
    }
}
