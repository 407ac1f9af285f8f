//! Immutable transition tables.
//!
//! A [`TransitionTable`] is the normalized, validated form of a machine's
//! configuration. Build one with [`TransitionConfig::into_table`] or the
//! [`TableBuilder`]; once built it is read-only and meant to be shared
//! between machines through an `Arc`.
//!
//! [`TransitionConfig::into_table`]: crate::config::TransitionConfig::into_table
//! [`TableBuilder`]: crate::builder::TableBuilder

use super::ids::{EventId, GuardId, MachineName, StateId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Where a transition leads and what gates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub target: StateId,
    pub guard: Option<GuardId>,
    pub timeout: Option<Duration>,
}

impl TransitionRule {
    /// An unguarded rule without a timeout.
    pub fn to(target: impl Into<StateId>) -> Self {
        Self {
            target: target.into(),
            guard: None,
            timeout: None,
        }
    }
}

/// An event a machine sends to a peer after a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forward {
    /// Event delivered to the peer.
    pub event: EventId,
    /// Specific peer; `None` means every peer the sender is wired to.
    pub machine: Option<MachineName>,
}

/// The shortest timeout declared on a state's outgoing rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTimeout {
    pub after: Duration,
    /// Event of the rule that declared `after`.
    pub event: EventId,
}

/// All legal transitions of one machine.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionTable {
    initial_state: StateId,
    states: HashSet<StateId>,
    transitions: HashMap<StateId, HashMap<EventId, TransitionRule>>,
    communications: HashMap<StateId, HashMap<EventId, Forward>>,
    event_sequence: Vec<EventId>,
    timeout_event: Option<EventId>,
    timeouts: HashMap<StateId, StateTimeout>,
}

impl TransitionTable {
    /// Assemble a table from already validated parts.
    ///
    /// Callers outside this crate go through the config loader or the
    /// builder, both of which validate state references first.
    pub(crate) fn from_parts(
        initial_state: StateId,
        states: HashSet<StateId>,
        transitions: HashMap<StateId, HashMap<EventId, TransitionRule>>,
        communications: HashMap<StateId, HashMap<EventId, Forward>>,
        event_sequence: Vec<EventId>,
        timeout_event: Option<EventId>,
    ) -> Self {
        let timeouts = transitions
            .iter()
            .filter_map(|(state, rules)| {
                shortest_timeout(rules).map(|timeout| (state.clone(), timeout))
            })
            .collect();

        Self {
            initial_state,
            states,
            transitions,
            communications,
            event_sequence,
            timeout_event,
            timeouts,
        }
    }

    pub fn initial_state(&self) -> &StateId {
        &self.initial_state
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// Declared states, sorted by name.
    pub fn states(&self) -> Vec<&StateId> {
        let mut states: Vec<_> = self.states.iter().collect();
        states.sort();
        states
    }

    /// Rule for `event` in `state`, if one is declared.
    pub fn rule(&self, state: &str, event: &str) -> Option<&TransitionRule> {
        self.transitions.get(state)?.get(event)
    }

    /// Events with a declared rule in `state`, sorted by name.
    pub fn events_for(&self, state: &str) -> Vec<&EventId> {
        let mut events: Vec<_> = self
            .transitions
            .get(state)
            .map(|rules| rules.keys().collect())
            .unwrap_or_default();
        events.sort();
        events
    }

    /// Forward owed after entering `state` through `event`.
    pub fn forward(&self, state: &str, event: &str) -> Option<&Forward> {
        self.communications.get(state)?.get(event)
    }

    /// Shortest declared timeout among `state`'s outgoing rules.
    pub fn timeout_for(&self, state: &str) -> Option<&StateTimeout> {
        self.timeouts.get(state)
    }

    pub fn event_sequence(&self) -> &[EventId] {
        &self.event_sequence
    }

    /// Timeout event name declared by the config itself, if any.
    pub fn timeout_event(&self) -> Option<&EventId> {
        self.timeout_event.as_ref()
    }

    /// Number of declared rules across all states.
    pub fn rule_count(&self) -> usize {
        self.transitions.values().map(HashMap::len).sum()
    }
}

fn shortest_timeout(rules: &HashMap<EventId, TransitionRule>) -> Option<StateTimeout> {
    rules
        .iter()
        .filter_map(|(event, rule)| rule.timeout.map(|after| (after, event)))
        // Equal timeouts resolve to the smallest event name.
        .min()
        .map(|(after, event)| StateTimeout {
            after,
            event: event.clone(),
        })
}
