//! Core types for the risk event detection library
//!
//! This module defines the values flowing through the engine: the `Signal`
//! samples it consumes, the `RiskEvent` payloads it emits, and the errors
//! raised while event definitions are loaded. The engine itself performs no
//! I/O - ingestion and transport live in the application layer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result type for detector operations
pub type Result<T> = std::result::Result<T, DetectorError>;

/// A single timestamped telemetry reading from the vehicle
///
/// Produced by an ingestion adapter (digital-twin subscription or a
/// recorded sample file) and consumed by the engine. Timestamps are domain
/// time in seconds and must be non-decreasing per vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name (e.g., "Vehicle_Speed_Speed")
    pub name: String,
    /// Current sample value
    pub value: f64,
    /// Domain time in seconds
    pub timestamp: f64,
}

impl Signal {
    /// Create a new signal sample
    pub fn new(name: impl Into<String>, value: f64, timestamp: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }
}

/// Errors raised while event definitions are loaded and validated
///
/// All of these are configuration-time failures: an invalid definition is
/// rejected before it enters the active set, and the per-sample hot path
/// never raises them.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("context length must be 1 when no aggregation method is applied, got {0}")]
    ContextWithoutMethod(usize),

    #[error("context length must be greater than 1 for method `{method}`, got {got}")]
    ContextTooShort { method: String, got: usize },

    #[error("operator `bt` requires an ordered [low, high] pair, got [{0}, {1}]")]
    InvalidRange(f64, f64),

    #[error("operator `bt` requires a [low, high] pair, got a scalar")]
    RangeExpected,

    #[error("operator `{0}` requires a scalar threshold, got a pair")]
    ScalarExpected(String),

    #[error("condition must name exactly one of `signal` or `event`")]
    ConditionTarget,

    #[error("event reference conditions do not take an aggregation method")]
    MethodOnEventRef,

    #[error("event data sample count for signal `{0}` must be greater than 0")]
    InvalidSampleCount(String),

    #[error("event definition `{0}` has no start conditions")]
    EmptyStartConditions(String),

    #[error("duplicate event definition: {0}")]
    DuplicateEvent(String),

    #[error("event `{event}` references unknown event `{reference}`")]
    UnknownEventReference { event: String, reference: String },

    #[error("cyclic event reference involving `{0}`")]
    CyclicReference(String),
}

/// A value captured in a risk event's contextual snapshot
///
/// Scalar when the definition requests a single trailing sample, a series
/// when it requests more.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    /// The single most recent sample
    Scalar(f64),
    /// The trailing samples in chronological order
    Series(Vec<f64>),
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Scalar(v) => write!(f, "{:.3}", v),
            EventValue::Series(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:.3}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A detected risk event - the payload sent from the vehicle to the cloud
///
/// Constructed once per detection and handed to the dispatch sink; the
/// engine does not retain it. Field names follow the vehicle-to-cloud wire
/// format when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEvent {
    /// Name of the event definition that matched
    pub name: String,
    /// Numeric event identifier from the definition
    #[serde(rename = "eventId")]
    pub event_id: f64,
    /// Risk level from the definition
    #[serde(rename = "riskLevel")]
    pub risk_level: u8,
    /// Timestamp of the sample that triggered the detection
    pub timestamp: f64,
    /// Contextual snapshot of related signals
    #[serde(rename = "eventData")]
    pub event_data: BTreeMap<String, EventValue>,
    /// `Some(true)` when a stateful event starts, `Some(false)` when it
    /// ends, `None` for momentary events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<bool>,
}
