//! Validated event table and evaluation ordering
//!
//! The table is the immutable, validated set of event definitions an
//! engine evaluates. Building it resolves cross-event references into an
//! explicit dependency graph and derives a deterministic, topologically
//! sorted evaluation order, so a definition reading another event's
//! running flag always sees that event's state from the same sample's
//! pass. Cycles are rejected at build time instead of silently evaluating
//! against stale state.

use crate::definition::{EventSpec, EventStates};
use crate::types::{DetectorError, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Default minimum per-signal history depth
pub const DEFAULT_MIN_HISTORY: usize = 10;

/// Builder collecting event definitions before cross-event validation
#[derive(Debug)]
pub struct EventTableBuilder {
    specs: Vec<EventSpec>,
    names: HashSet<String>,
    min_history: usize,
}

impl EventTableBuilder {
    /// Create a new builder with the default minimum history depth
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            names: HashSet::new(),
            min_history: DEFAULT_MIN_HISTORY,
        }
    }

    /// Builder method: set the minimum per-signal history depth
    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    /// Add a validated event definition
    ///
    /// Fails on duplicate names; structural validation already happened in
    /// `EventSpec::new`, so a rejected definition never reaches the table.
    pub fn add(&mut self, spec: EventSpec) -> Result<()> {
        if !self.names.insert(spec.name().to_string()) {
            return Err(DetectorError::DuplicateEvent(spec.name().to_string()));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Number of definitions added so far
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if no definition has been added yet
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolve references, order the definitions, and build the table
    pub fn build(self) -> Result<EventTable> {
        let index: HashMap<&str, usize> = self
            .specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name(), i))
            .collect();

        // Reference edges: referenced definition -> dependent definition
        let n = self.specs.len();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];

        for (i, spec) in self.specs.iter().enumerate() {
            for reference in spec.referenced_events() {
                let &j = index.get(reference).ok_or_else(|| {
                    DetectorError::UnknownEventReference {
                        event: spec.name().to_string(),
                        reference: reference.to_string(),
                    }
                })?;
                dependents[j].push(i);
                indegree[i] += 1;
            }
        }

        // Kahn's algorithm; the ready queue preserves declaration order so
        // independent definitions evaluate in the order they were loaded
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push_back(dependent);
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n)
                .find(|&i| indegree[i] > 0)
                .map(|i| self.specs[i].name().to_string())
                .unwrap_or_default();
            return Err(DetectorError::CyclicReference(stuck));
        }

        let history_depth = self
            .specs
            .iter()
            .map(EventSpec::required_history)
            .max()
            .unwrap_or(0)
            .max(self.min_history)
            .max(1);

        // Track every signal any definition reads or snapshots
        let tracked_signals = self
            .specs
            .iter()
            .flat_map(|spec| {
                spec.relevant_signals()
                    .iter()
                    .cloned()
                    .chain(spec.event_data().keys().cloned())
            })
            .collect();

        log::info!(
            "event table built: {} definition(s), history depth {}",
            n,
            history_depth
        );

        Ok(EventTable {
            specs: self.specs,
            order,
            tracked_signals,
            history_depth,
        })
    }
}

impl Default for EventTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable, validated set of event definitions with a fixed evaluation
/// order
///
/// Shared (behind an `Arc`) across per-vehicle engine instances; all
/// mutable runtime state lives in each engine's `EventStates`.
#[derive(Debug)]
pub struct EventTable {
    specs: Vec<EventSpec>,
    /// Indices into `specs` in dependency-respecting evaluation order
    order: Vec<usize>,
    /// Union of all signals any definition reads or snapshots
    tracked_signals: HashSet<String>,
    /// Per-signal history depth required by the loaded definitions
    history_depth: usize,
}

impl EventTable {
    /// Number of loaded definitions
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if the table holds no definitions
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&EventSpec> {
        self.specs.iter().find(|spec| spec.name() == name)
    }

    /// Definitions in dependency-respecting evaluation order
    pub fn evaluation_order(&self) -> impl Iterator<Item = &EventSpec> {
        self.order.iter().map(move |&i| &self.specs[i])
    }

    /// True if any definition reads or snapshots this signal
    pub fn tracks(&self, signal_name: &str) -> bool {
        self.tracked_signals.contains(signal_name)
    }

    /// Per-signal history depth the engine must retain
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    /// Fresh runtime state table with every definition idle and eligible
    pub fn new_states(&self) -> EventStates {
        let mut states = EventStates::default();
        for spec in &self.specs {
            states.insert(spec.name());
        }
        states
    }
}
