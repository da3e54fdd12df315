//! Event definition schema and compilation
//!
//! These are the serde-facing types the application layer deserializes
//! from its configuration file (TOML, JSON, ...). Compilation turns them
//! into validated `EventSpec`s once at load time; the per-sample hot path
//! never sees an unvalidated definition.

use crate::condition::{Condition, EventRefCondition, Method, Predicate, SignalCondition};
use crate::definition::EventSpec;
use crate::table::{EventTable, EventTableBuilder, DEFAULT_MIN_HISTORY};
use crate::types::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Engine-wide tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum per-signal history depth, kept even when no condition
    /// needs a window that deep
    #[serde(default = "default_min_history")]
    pub min_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

fn default_min_history() -> usize {
    DEFAULT_MIN_HISTORY
}

/// Comparison operator as written in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Exact equality
    Eq,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Between (strict open interval), takes a [low, high] pair
    Bt,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "eq"),
            Operator::Gt => write!(f, "gt"),
            Operator::Lt => write!(f, "lt"),
            Operator::Bt => write!(f, "bt"),
        }
    }
}

/// Threshold value: a scalar for eq/gt/lt, a [low, high] pair for bt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueConfig {
    /// Single threshold
    Scalar(f64),
    /// [low, high] pair
    Range(f64, f64),
}

/// One condition clause as written in the configuration file
///
/// Exactly one of `signal` and `event` must be set: a signal condition
/// compares an aggregate of the signal's history, an event condition
/// compares the referenced event's running flag (0/1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Signal name the condition reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    /// Referenced event name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Aggregation method (default: none)
    #[serde(default)]
    pub method: Method,

    /// Window size the method considers (default: 1)
    #[serde(default = "default_context_length")]
    pub context_length: usize,

    /// Comparison operator
    pub operator: Operator,

    /// Threshold value
    pub value: ValueConfig,
}

fn default_context_length() -> usize {
    1
}

impl ConditionConfig {
    /// Compile into a typed condition, validating operator/value pairing
    pub fn compile(&self) -> Result<Condition> {
        let predicate = match (self.operator, self.value) {
            (Operator::Eq, ValueConfig::Scalar(v)) => Predicate::Eq(v),
            (Operator::Gt, ValueConfig::Scalar(v)) => Predicate::Gt(v),
            (Operator::Lt, ValueConfig::Scalar(v)) => Predicate::Lt(v),
            (Operator::Bt, ValueConfig::Range(low, high)) => {
                if low >= high {
                    return Err(DetectorError::InvalidRange(low, high));
                }
                Predicate::Between(low, high)
            }
            (Operator::Bt, ValueConfig::Scalar(_)) => return Err(DetectorError::RangeExpected),
            (op, ValueConfig::Range(_, _)) => {
                return Err(DetectorError::ScalarExpected(op.to_string()))
            }
        };

        match (&self.signal, &self.event) {
            (Some(signal), None) => Ok(Condition::Signal(SignalCondition {
                signal: signal.clone(),
                method: self.method,
                context_length: self.context_length,
                predicate,
            })),
            (None, Some(event)) => {
                if self.method != Method::None || self.context_length != 1 {
                    return Err(DetectorError::MethodOnEventRef);
                }
                Ok(Condition::EventRef(EventRefCondition {
                    event: event.clone(),
                    predicate,
                }))
            }
            _ => Err(DetectorError::ConditionTarget),
        }
    }
}

/// One event definition as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Event name, unique within the table
    pub name: String,

    /// Numeric event identifier carried into the emitted payload
    pub event_id: f64,

    /// Risk level carried into the emitted payload
    #[serde(default = "default_risk_level")]
    pub risk_level: u8,

    /// Start condition set (evaluated while idle)
    #[serde(default)]
    pub start: Vec<ConditionConfig>,

    /// End condition set; empty makes the event momentary
    #[serde(default)]
    pub end: Vec<ConditionConfig>,

    /// Snapshot table: signal name -> trailing sample count
    #[serde(default)]
    pub event_data: BTreeMap<String, usize>,

    /// Debounce window in domain time (default: 0, re-fires immediately)
    #[serde(default)]
    pub timeout: f64,
}

fn default_risk_level() -> u8 {
    1
}

impl EventConfig {
    /// Compile into a validated event definition
    pub fn compile(&self) -> Result<EventSpec> {
        let start = self
            .start
            .iter()
            .map(ConditionConfig::compile)
            .collect::<Result<Vec<_>>>()?;
        let end = self
            .end
            .iter()
            .map(ConditionConfig::compile)
            .collect::<Result<Vec<_>>>()?;

        EventSpec::new(
            self.name.clone(),
            self.event_id,
            self.risk_level,
            start,
            end,
            self.event_data.clone(),
            self.timeout,
        )
    }
}

/// Compile a configuration into a validated, ordered event table
///
/// Strict variant: the first invalid definition aborts the load. The
/// application layer may instead compile definitions one by one to isolate
/// failures per definition.
pub fn compile_events(engine: &EngineConfig, events: &[EventConfig]) -> Result<EventTable> {
    let mut builder = EventTableBuilder::new().with_min_history(engine.min_history);
    for config in events {
        builder.add(config.compile()?)?;
    }
    builder.build()
}
