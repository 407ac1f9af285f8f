//! State history tracking.
//!
//! The history is the path of states a machine has occupied, oldest first.
//! Its last entry is always the machine's current state, so the path never
//! becomes empty and `goback(0)` is a no-op.

use super::ids::{EventId, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a machine entered a state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryCause {
    /// The machine was created in this state.
    Initial,
    /// A transition fired for this event.
    Event(EventId),
    /// An unconditional jump via `goto`.
    Goto,
    /// A `reset` back to the initial state.
    Reset,
}

/// One visited state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state: StateId,
    pub cause: EntryCause,
    pub at: DateTime<Utc>,
}

/// Ordered path of visited states.
///
/// # Example
///
/// ```rust
/// use statewire::core::{EntryCause, EventId, StateHistory, StateId};
///
/// let mut history = StateHistory::new(StateId::new("Idle"));
/// history.record(StateId::new("MovingUp"), EntryCause::Event(EventId::new("up")));
///
/// let path: Vec<&str> = history.path().map(|s| s.as_str()).collect();
/// assert_eq!(path, ["Idle", "MovingUp"]);
///
/// assert_eq!(history.go_back(1).as_str(), "Idle");
/// assert_eq!(history.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    entries: Vec<HistoryEntry>,
}

impl StateHistory {
    /// Start a history at the initial state.
    pub fn new(initial: StateId) -> Self {
        Self {
            entries: vec![HistoryEntry {
                state: initial,
                cause: EntryCause::Initial,
                at: Utc::now(),
            }],
        }
    }

    /// Append a newly entered state.
    pub fn record(&mut self, state: StateId, cause: EntryCause) {
        self.entries.push(HistoryEntry {
            state,
            cause,
            at: Utc::now(),
        });
    }

    /// Drop the last `steps` entries and return the state now on top.
    ///
    /// When `steps` reaches or exceeds the recorded depth the history
    /// collapses to its first (initial) entry instead of failing.
    pub fn go_back(&mut self, steps: usize) -> &StateId {
        if steps >= self.entries.len() {
            self.entries.truncate(1);
        } else {
            let keep = self.entries.len() - steps;
            self.entries.truncate(keep);
        }
        self.current()
    }

    /// The state on top of the history.
    pub fn current(&self) -> &StateId {
        // `new` seeds one entry and `go_back` never truncates below one.
        &self.entries[self.entries.len() - 1].state
    }

    /// The state the history started in.
    pub fn initial(&self) -> &StateId {
        &self.entries[0].state
    }

    /// Visited states, oldest first.
    pub fn path(&self) -> impl Iterator<Item = &StateId> + '_ {
        self.entries.iter().map(|entry| &entry.state)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time between the first and the last entry.
    pub fn duration(&self) -> Option<std::time::Duration> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        last.at.signed_duration_since(first.at).to_std().ok()
    }
}
