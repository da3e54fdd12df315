//! Event definitions and their start/end state machine
//!
//! An `EventSpec` is the immutable rule descriptor loaded once at
//! configuration time. The mutable runtime side (running flag, debounce
//! re-arm time) lives in `EventStates`, owned by the engine instance, so
//! the same specs can be shared across per-vehicle engine shards.

use crate::condition::Condition;
use crate::history::SignalHistory;
use crate::types::{DetectorError, EventValue, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Result of checking a definition's active condition set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Every condition in the active set is satisfied
    Match,
    /// At least one condition is not satisfied
    NoMatch,
    /// At least one window has not accumulated enough samples yet
    NotReady,
}

/// Mutable per-event runtime state, owned by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuntimeState {
    /// True while a stateful event is in its active (started, not yet
    /// ended) phase
    pub running: bool,
    /// Earliest domain timestamp at which the definition may match again
    pub next_eligible: f64,
}

/// Runtime state table indexed by event name
///
/// One instance per engine (per vehicle shard); never shared across
/// shards.
#[derive(Debug, Clone, Default)]
pub struct EventStates {
    states: HashMap<String, RuntimeState>,
}

impl EventStates {
    /// Register an event with initial (idle, immediately eligible) state
    pub(crate) fn insert(&mut self, name: &str) {
        self.states.insert(name.to_string(), RuntimeState::default());
    }

    /// Running flag of an event (false for unknown names)
    pub fn running(&self, name: &str) -> bool {
        self.states.get(name).map_or(false, |s| s.running)
    }

    /// Current runtime state of an event
    pub fn get(&self, name: &str) -> Option<RuntimeState> {
        self.states.get(name).copied()
    }

    pub(crate) fn set_running(&mut self, name: &str, running: bool) {
        if let Some(state) = self.states.get_mut(name) {
            state.running = running;
        }
    }

    pub(crate) fn set_next_eligible(&mut self, name: &str, next_eligible: f64) {
        if let Some(state) = self.states.get_mut(name) {
            state.next_eligible = next_eligible;
        }
    }
}

/// Immutable descriptor of one detectable risk event
///
/// Constructed once at configuration load and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EventSpec {
    name: String,
    event_id: f64,
    risk_level: u8,
    start_conditions: Vec<Condition>,
    end_conditions: Vec<Condition>,
    /// Signal name -> number of trailing samples captured on detection
    event_data: BTreeMap<String, usize>,
    /// Debounce window in domain time
    timeout: f64,
    /// Signals referenced by any start or end condition
    relevant_signals: HashSet<String>,
}

impl EventSpec {
    /// Create and validate a new event definition
    ///
    /// Rejects inconsistent method/context pairings, non-positive snapshot
    /// sample counts, and an empty start set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        event_id: f64,
        risk_level: u8,
        start_conditions: Vec<Condition>,
        end_conditions: Vec<Condition>,
        event_data: BTreeMap<String, usize>,
        timeout: f64,
    ) -> Result<Self> {
        let name = name.into();

        if start_conditions.is_empty() {
            return Err(DetectorError::EmptyStartConditions(name));
        }
        for condition in start_conditions.iter().chain(end_conditions.iter()) {
            condition.validate()?;
        }
        for (signal, count) in &event_data {
            if *count == 0 {
                return Err(DetectorError::InvalidSampleCount(signal.clone()));
            }
        }

        let relevant_signals = start_conditions
            .iter()
            .chain(end_conditions.iter())
            .filter_map(|c| c.signal_name())
            .map(str::to_string)
            .collect();

        Ok(Self {
            name,
            event_id,
            risk_level,
            start_conditions,
            end_conditions,
            event_data,
            timeout,
            relevant_signals,
        })
    }

    /// Event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric event identifier
    pub fn event_id(&self) -> f64 {
        self.event_id
    }

    /// Risk level carried into the emitted payload
    pub fn risk_level(&self) -> u8 {
        self.risk_level
    }

    /// Start condition set (evaluated while idle)
    pub fn start_conditions(&self) -> &[Condition] {
        &self.start_conditions
    }

    /// End condition set (evaluated while active; empty for momentary
    /// events)
    pub fn end_conditions(&self) -> &[Condition] {
        &self.end_conditions
    }

    /// Snapshot table: signal name -> trailing sample count
    pub fn event_data(&self) -> &BTreeMap<String, usize> {
        &self.event_data
    }

    /// Debounce window in domain time
    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    /// True if the definition has no end conditions: it re-fires on every
    /// eligible start match and never enters the active phase
    pub fn is_momentary(&self) -> bool {
        self.end_conditions.is_empty()
    }

    /// True if the definition's conditions read this signal
    pub fn is_relevant(&self, signal_name: &str) -> bool {
        self.relevant_signals.contains(signal_name)
    }

    /// Signals referenced by any start or end condition
    pub fn relevant_signals(&self) -> &HashSet<String> {
        &self.relevant_signals
    }

    /// Other event definitions referenced by any condition
    pub fn referenced_events(&self) -> impl Iterator<Item = &str> {
        self.start_conditions
            .iter()
            .chain(self.end_conditions.iter())
            .filter_map(|c| c.event_reference())
    }

    /// Largest history window any condition or snapshot entry requires
    pub fn required_history(&self) -> usize {
        let conditions = self
            .start_conditions
            .iter()
            .chain(self.end_conditions.iter())
            .map(|c| c.context_length())
            .max()
            .unwrap_or(0);
        let snapshots = self.event_data.values().copied().max().unwrap_or(0);
        conditions.max(snapshots)
    }

    /// Check the active condition set with short-circuit AND
    ///
    /// Selects start conditions while idle and end conditions while
    /// active. The first unsatisfied condition aborts with `NoMatch`; the
    /// first insufficient window aborts with `NotReady`.
    pub fn check(
        &self,
        running: bool,
        history: &SignalHistory,
        states: &EventStates,
    ) -> MatchResult {
        let active = if running {
            &self.end_conditions
        } else {
            &self.start_conditions
        };

        for condition in active {
            match condition.satisfied(history, states) {
                Some(true) => {}
                Some(false) => return MatchResult::NoMatch,
                None => return MatchResult::NotReady,
            }
        }
        MatchResult::Match
    }

    /// Build the contextual snapshot carried by an emitted risk event
    ///
    /// A count of 1 captures the single latest value; larger counts
    /// capture the trailing samples as a series, truncated to what the
    /// history currently holds. Signals with no recorded samples are
    /// omitted.
    pub fn collect_event_data(&self, history: &SignalHistory) -> BTreeMap<String, EventValue> {
        let mut snapshot = BTreeMap::new();

        for (signal, &count) in &self.event_data {
            let available = history.len(signal);
            if available == 0 {
                log::debug!(
                    "event `{}`: no samples recorded for snapshot signal `{}`, omitting",
                    self.name,
                    signal
                );
                continue;
            }

            if count == 1 {
                if let Some(value) = history.latest(signal) {
                    snapshot.insert(signal.clone(), EventValue::Scalar(value));
                }
            } else {
                let take = count.min(available);
                if let Some(window) = history.window(signal, take) {
                    snapshot.insert(signal.clone(), EventValue::Series(window.collect()));
                }
            }
        }

        snapshot
    }
}
