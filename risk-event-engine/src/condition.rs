//! Condition language
//!
//! A condition is one clause of an event's start or end set. Signal
//! conditions compare an aggregate of a signal's recent history against a
//! threshold; event-reference conditions compare another event's running
//! flag (as 0/1) instead. Conditions are validated once at load time - the
//! per-sample evaluation path never raises.

use crate::definition::EventStates;
use crate::history::SignalHistory;
use crate::types::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation applied to a signal's window before comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// No aggregation - the single most recent sample
    #[default]
    None,
    /// Point lookup `context_length` steps back from the most recent
    /// sample; used to detect rising/falling edges
    Prev,
    /// Mean over the last `context_length` samples
    Mean,
    /// Minimum over the last `context_length` samples
    Min,
    /// Maximum over the last `context_length` samples
    Max,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::None => write!(f, "none"),
            Method::Prev => write!(f, "prev"),
            Method::Mean => write!(f, "mean"),
            Method::Min => write!(f, "min"),
            Method::Max => write!(f, "max"),
        }
    }
}

/// Comparison applied to the resolved value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    /// Exact equality
    Eq(f64),
    /// Strictly greater than the threshold
    Gt(f64),
    /// Strictly less than the threshold
    Lt(f64),
    /// Strict open interval: low < value < high
    Between(f64, f64),
}

impl Predicate {
    /// Check the predicate against a resolved value
    ///
    /// A NaN value never matches - this guards against false positives
    /// from undefined aggregates.
    pub fn matches(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match *self {
            Predicate::Eq(threshold) => value == threshold,
            Predicate::Gt(threshold) => value > threshold,
            Predicate::Lt(threshold) => value < threshold,
            Predicate::Between(low, high) => value > low && value < high,
        }
    }
}

/// Outcome of resolving a signal condition's window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The resolved (possibly aggregated) value
    Value(f64),
    /// The window has not accumulated `context_length` samples yet
    Insufficient,
}

/// A condition comparing an aggregate of a signal's recent history
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCondition {
    /// Signal name the condition reads
    pub signal: String,
    /// Aggregation method over the window
    pub method: Method,
    /// Number of most-recent samples the method considers
    pub context_length: usize,
    /// Comparison against the resolved value
    pub predicate: Predicate,
}

impl SignalCondition {
    /// Validate the method/context-length pairing
    ///
    /// `none` requires a window of exactly 1; every aggregating method
    /// requires a window larger than 1.
    pub fn validate(&self) -> Result<()> {
        match self.method {
            Method::None if self.context_length != 1 => {
                Err(DetectorError::ContextWithoutMethod(self.context_length))
            }
            Method::Prev | Method::Mean | Method::Min | Method::Max
                if self.context_length <= 1 =>
            {
                Err(DetectorError::ContextTooShort {
                    method: self.method.to_string(),
                    got: self.context_length,
                })
            }
            _ => Ok(()),
        }
    }

    /// Resolve the condition's value against the current history
    pub fn resolve(&self, history: &SignalHistory) -> Resolution {
        if history.len(&self.signal) < self.context_length {
            return Resolution::Insufficient;
        }

        let value = match self.method {
            Method::None => history.latest(&self.signal).unwrap_or(f64::NAN),
            // -context_length indexing: the sample context_length steps
            // back from (and including) the most recent one
            Method::Prev => history
                .nth_back(&self.signal, self.context_length - 1)
                .unwrap_or(f64::NAN),
            Method::Mean | Method::Min | Method::Max => {
                match history.window(&self.signal, self.context_length) {
                    Some(window) => aggregate(self.method, window),
                    None => return Resolution::Insufficient,
                }
            }
        };

        Resolution::Value(value)
    }
}

/// A condition comparing another event's running flag
#[derive(Debug, Clone, PartialEq)]
pub struct EventRefCondition {
    /// Name of the referenced event definition
    pub event: String,
    /// Comparison against the running flag (1.0 when running, else 0.0)
    pub predicate: Predicate,
}

/// One clause of an event's start or end condition set
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Compares an aggregate of a signal's recent history
    Signal(SignalCondition),
    /// Compares another event's running flag
    EventRef(EventRefCondition),
}

impl Condition {
    /// Evaluate the condition against the current history and event states
    ///
    /// Returns `Some(true)` when satisfied, `Some(false)` when not, and
    /// `None` when the window has not accumulated enough samples yet.
    pub fn satisfied(&self, history: &SignalHistory, states: &EventStates) -> Option<bool> {
        match self {
            Condition::Signal(cond) => match cond.resolve(history) {
                Resolution::Value(value) => Some(cond.predicate.matches(value)),
                Resolution::Insufficient => None,
            },
            Condition::EventRef(cond) => {
                let flag = if states.running(&cond.event) { 1.0 } else { 0.0 };
                Some(cond.predicate.matches(flag))
            }
        }
    }

    /// The signal name this condition reads, if any
    pub fn signal_name(&self) -> Option<&str> {
        match self {
            Condition::Signal(cond) => Some(&cond.signal),
            Condition::EventRef(_) => None,
        }
    }

    /// The event name this condition references, if any
    pub fn event_reference(&self) -> Option<&str> {
        match self {
            Condition::Signal(_) => None,
            Condition::EventRef(cond) => Some(&cond.event),
        }
    }

    /// Validate the condition's structural invariants
    pub fn validate(&self) -> Result<()> {
        match self {
            Condition::Signal(cond) => cond.validate(),
            Condition::EventRef(_) => Ok(()),
        }
    }

    /// History depth this condition requires
    pub fn context_length(&self) -> usize {
        match self {
            Condition::Signal(cond) => cond.context_length,
            Condition::EventRef(_) => 0,
        }
    }
}

/// Aggregate a warmed-up window; any NaN sample poisons the result
fn aggregate(method: Method, window: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in window {
        if value.is_nan() {
            return f64::NAN;
        }
        count += 1;
        sum += value;
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }

    if count == 0 {
        return f64::NAN;
    }

    match method {
        Method::Mean => sum / count as f64,
        Method::Min => min,
        Method::Max => max,
        // Point lookups are resolved by the caller and never reach here
        Method::None | Method::Prev => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(values: &[f64]) -> SignalHistory {
        let mut history = SignalHistory::new(16);
        for &v in values {
            history.record("speed", v);
        }
        history
    }

    fn signal_condition(method: Method, context_length: usize, predicate: Predicate) -> SignalCondition {
        SignalCondition {
            signal: "speed".to_string(),
            method,
            context_length,
            predicate,
        }
    }

    #[test]
    fn test_none_resolves_latest_sample() {
        let cond = signal_condition(Method::None, 1, Predicate::Gt(0.0));

        let empty = SignalHistory::new(16);
        assert_eq!(cond.resolve(&empty), Resolution::Insufficient);

        let history = history_with(&[10.0, 42.0]);
        assert_eq!(cond.resolve(&history), Resolution::Value(42.0));
    }

    #[test]
    fn test_prev_is_a_point_lookup() {
        let history = history_with(&[1.0, 2.0, 3.0, 4.0]);

        let cond = signal_condition(Method::Prev, 2, Predicate::Gt(0.0));
        assert_eq!(cond.resolve(&history), Resolution::Value(3.0));

        let cond = signal_condition(Method::Prev, 4, Predicate::Gt(0.0));
        assert_eq!(cond.resolve(&history), Resolution::Value(1.0));

        let cond = signal_condition(Method::Prev, 5, Predicate::Gt(0.0));
        assert_eq!(cond.resolve(&history), Resolution::Insufficient);
    }

    #[test]
    fn test_aggregates_over_trailing_window() {
        let history = history_with(&[10.0, 20.0, 30.0, 60.0]);

        let mean = signal_condition(Method::Mean, 3, Predicate::Gt(0.0));
        assert_eq!(mean.resolve(&history), Resolution::Value(110.0 / 3.0));

        let min = signal_condition(Method::Min, 3, Predicate::Gt(0.0));
        assert_eq!(min.resolve(&history), Resolution::Value(20.0));

        let max = signal_condition(Method::Max, 2, Predicate::Gt(0.0));
        assert_eq!(max.resolve(&history), Resolution::Value(60.0));
    }

    #[test]
    fn test_insufficient_window_is_not_an_error() {
        let history = history_with(&[10.0, 20.0]);
        let cond = signal_condition(Method::Mean, 5, Predicate::Gt(0.0));
        assert_eq!(cond.resolve(&history), Resolution::Insufficient);
    }

    #[test]
    fn test_nan_in_window_never_matches() {
        let history = history_with(&[10.0, f64::NAN, 30.0]);

        let mean = signal_condition(Method::Mean, 3, Predicate::Gt(0.0));
        match mean.resolve(&history) {
            Resolution::Value(v) => assert!(v.is_nan()),
            Resolution::Insufficient => panic!("window is warmed up"),
        }

        // min/max must not silently skip the NaN either
        let min = signal_condition(Method::Min, 3, Predicate::Lt(100.0));
        let states = EventStates::default();
        assert_eq!(Condition::Signal(min).satisfied(&history, &states), Some(false));
    }

    #[test]
    fn test_predicates() {
        assert!(Predicate::Eq(2.0).matches(2.0));
        assert!(!Predicate::Eq(2.0).matches(2.0001));

        assert!(Predicate::Gt(100.0).matches(100.1));
        assert!(!Predicate::Gt(100.0).matches(100.0));

        assert!(Predicate::Lt(100.0).matches(99.9));
        assert!(!Predicate::Lt(100.0).matches(100.0));

        // Open interval: the bounds themselves do not match
        assert!(Predicate::Between(1.0, 3.0).matches(2.0));
        assert!(!Predicate::Between(1.0, 3.0).matches(1.0));
        assert!(!Predicate::Between(1.0, 3.0).matches(3.0));

        assert!(!Predicate::Eq(f64::NAN).matches(f64::NAN));
        assert!(!Predicate::Gt(0.0).matches(f64::NAN));
    }

    #[test]
    fn test_validation_rejects_inconsistent_context() {
        let cond = signal_condition(Method::None, 2, Predicate::Gt(0.0));
        assert!(matches!(
            cond.validate(),
            Err(DetectorError::ContextWithoutMethod(2))
        ));

        let cond = signal_condition(Method::Mean, 1, Predicate::Gt(0.0));
        assert!(matches!(
            cond.validate(),
            Err(DetectorError::ContextTooShort { .. })
        ));

        let cond = signal_condition(Method::Prev, 2, Predicate::Gt(0.0));
        assert!(cond.validate().is_ok());
    }

    #[test]
    fn test_event_reference_reads_running_flag() {
        let mut states = EventStates::default();
        states.insert("autobahn");
        let history = SignalHistory::new(4);

        let cond = Condition::EventRef(EventRefCondition {
            event: "autobahn".to_string(),
            predicate: Predicate::Eq(1.0),
        });
        assert_eq!(cond.satisfied(&history, &states), Some(false));

        states.set_running("autobahn", true);
        assert_eq!(cond.satisfied(&history, &states), Some(true));
    }
}
