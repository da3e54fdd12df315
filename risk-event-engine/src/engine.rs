//! Detection engine
//!
//! Drives every loaded event definition over the incoming sample stream:
//! record the sample, gate on warm-up and per-definition debounce, check
//! the active condition set, toggle the state machine, and dispatch a risk
//! event with its contextual snapshot. One engine instance per vehicle;
//! samples must arrive in non-decreasing timestamp order because the
//! running flags and re-arm times are order-sensitive.

use crate::definition::{EventStates, MatchResult, RuntimeState};
use crate::history::SignalHistory;
use crate::table::EventTable;
use crate::types::{RiskEvent, Signal};
use std::sync::Arc;

/// Consumer of detected risk events - the transport boundary
///
/// Implementations forward events to MQTT, a file, the console, or a test
/// buffer. The engine fires and forgets; delivery failures are the sink's
/// concern.
pub trait EventSink {
    /// Accept one detected event
    fn publish(&mut self, event: RiskEvent);
}

/// Collects events instead of transporting them; used by tests and the
/// fleet replay
impl EventSink for Vec<RiskEvent> {
    fn publish(&mut self, event: RiskEvent) {
        self.push(event);
    }
}

/// Per-vehicle detection engine
///
/// Owns the signal history and the per-event runtime state; shares the
/// immutable event table with other engine instances.
pub struct DetectionEngine {
    table: Arc<EventTable>,
    history: SignalHistory,
    states: EventStates,
    last_timestamp: f64,
}

impl DetectionEngine {
    /// Create an engine over a loaded event table
    pub fn new(table: Arc<EventTable>) -> Self {
        let history = SignalHistory::new(table.history_depth());
        let states = table.new_states();
        Self {
            table,
            history,
            states,
            last_timestamp: f64::NEG_INFINITY,
        }
    }

    /// The event table this engine evaluates
    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// Running flag of an event (false for unknown names)
    pub fn is_running(&self, event: &str) -> bool {
        self.states.running(event)
    }

    /// Current runtime state of an event
    pub fn state(&self, event: &str) -> Option<RuntimeState> {
        self.states.get(event)
    }

    /// Process one sample, publishing detections to `sink`
    ///
    /// Samples whose name no definition reads or snapshots are discarded
    /// without touching the history. No definition is evaluated until the
    /// arriving signal's buffer has warmed up to the full history depth,
    /// which avoids partial-window false triggers during startup.
    pub fn process(&mut self, signal: &Signal, sink: &mut dyn EventSink) {
        if signal.timestamp < self.last_timestamp {
            log::warn!(
                "out-of-order sample for `{}`: {} after {}",
                signal.name,
                signal.timestamp,
                self.last_timestamp
            );
        }
        self.last_timestamp = signal.timestamp;

        if !self.table.tracks(&signal.name) {
            return;
        }
        self.history.record(&signal.name, signal.value);

        if self.history.len(&signal.name) < self.history.capacity() {
            return;
        }

        let table = Arc::clone(&self.table);
        for spec in table.evaluation_order() {
            if !spec.is_relevant(&signal.name) {
                continue;
            }

            let Some(state) = self.states.get(spec.name()) else {
                continue;
            };
            if state.next_eligible > signal.timestamp {
                log::trace!(
                    "event `{}` debounced until {}",
                    spec.name(),
                    state.next_eligible
                );
                continue;
            }

            match spec.check(state.running, &self.history, &self.states) {
                MatchResult::Match => {
                    // Momentary events stay idle; stateful events toggle
                    let now_running = !spec.is_momentary() && !state.running;
                    self.states.set_running(spec.name(), now_running);
                    self.states
                        .set_next_eligible(spec.name(), signal.timestamp + spec.timeout());

                    let event = RiskEvent {
                        name: spec.name().to_string(),
                        event_id: spec.event_id(),
                        risk_level: spec.risk_level(),
                        timestamp: signal.timestamp,
                        event_data: spec.collect_event_data(&self.history),
                        start: (!spec.is_momentary()).then_some(now_running),
                    };

                    log::debug!(
                        "detected `{}` at {} (running: {})",
                        event.name,
                        event.timestamp,
                        now_running
                    );
                    sink.publish(event);
                }
                MatchResult::NoMatch | MatchResult::NotReady => {}
            }
        }
    }

    /// Process one sample and return the detections instead of publishing
    pub fn process_collect(&mut self, signal: &Signal) -> Vec<RiskEvent> {
        let mut events = Vec::new();
        self.process(signal, &mut events);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Method, Predicate, SignalCondition};
    use crate::definition::EventSpec;
    use crate::table::EventTableBuilder;
    use std::collections::BTreeMap;

    fn speed_gt(threshold: f64) -> Condition {
        Condition::Signal(SignalCondition {
            signal: "speed".to_string(),
            method: Method::None,
            context_length: 1,
            predicate: Predicate::Gt(threshold),
        })
    }

    fn engine_with(specs: Vec<EventSpec>, min_history: usize) -> DetectionEngine {
        let mut builder = EventTableBuilder::new().with_min_history(min_history);
        for spec in specs {
            builder.add(spec).unwrap();
        }
        DetectionEngine::new(Arc::new(builder.build().unwrap()))
    }

    #[test]
    fn test_warm_up_gates_evaluation() {
        let spec = EventSpec::new(
            "speeding",
            1.1,
            2,
            vec![speed_gt(130.0)],
            vec![],
            BTreeMap::new(),
            0.0,
        )
        .unwrap();
        let mut engine = engine_with(vec![spec], 3);

        // Values above threshold, but the buffer has not warmed up
        assert!(engine.process_collect(&Signal::new("speed", 150.0, 0.0)).is_empty());
        assert!(engine.process_collect(&Signal::new("speed", 150.0, 1.0)).is_empty());
        // Third sample fills the buffer to the required depth
        assert_eq!(engine.process_collect(&Signal::new("speed", 150.0, 2.0)).len(), 1);
    }

    #[test]
    fn test_momentary_event_debounced() {
        let spec = EventSpec::new(
            "speeding",
            1.1,
            2,
            vec![speed_gt(130.0)],
            vec![],
            BTreeMap::new(),
            5.0,
        )
        .unwrap();
        let mut engine = engine_with(vec![spec], 1);

        assert_eq!(engine.process_collect(&Signal::new("speed", 140.0, 0.0)).len(), 1);
        // Still above threshold, but inside the debounce window
        assert!(engine.process_collect(&Signal::new("speed", 141.0, 2.0)).is_empty());
        assert!(engine.process_collect(&Signal::new("speed", 142.0, 4.9)).is_empty());
        // Re-armed exactly at timestamp + timeout
        assert_eq!(engine.process_collect(&Signal::new("speed", 143.0, 5.0)).len(), 1);
        // Momentary events never enter the active phase
        assert!(!engine.is_running("speeding"));
    }

    #[test]
    fn test_irrelevant_signals_ignored() {
        let spec = EventSpec::new(
            "speeding",
            1.1,
            2,
            vec![speed_gt(130.0)],
            vec![],
            BTreeMap::new(),
            0.0,
        )
        .unwrap();
        let mut engine = engine_with(vec![spec], 1);

        assert!(engine.process_collect(&Signal::new("cabin_temp", 500.0, 0.0)).is_empty());
        // The untracked signal must not have consumed history capacity
        assert_eq!(engine.process_collect(&Signal::new("speed", 140.0, 1.0)).len(), 1);
    }
}
