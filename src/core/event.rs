//! Inbound events delivered to a machine's runner.

use super::ids::{EventId, StateId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message on a machine's inbound channel.
///
/// Only `Named` events go through the transition table. `Goto`, `GoBack`
/// and `Reset` navigate the machine's history directly, the same as calling
/// [`Machine::goto`], [`Machine::goback`] and [`Machine::reset`] on a
/// machine that is not running.
///
/// `Terminate` is a cooperative poison pill: the runner finishes whatever it
/// already dequeued and then stops. It never reaches [`Machine::apply`].
///
/// [`Machine::apply`]: crate::machine::Machine::apply
/// [`Machine::goto`]: crate::machine::Machine::goto
/// [`Machine::goback`]: crate::machine::Machine::goback
/// [`Machine::reset`]: crate::machine::Machine::reset
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Event {
    /// A named event looked up in the transition table.
    Named(EventId),
    /// Jump to a declared state, bypassing guards.
    Goto(StateId),
    /// Undo the given number of history entries.
    GoBack(usize),
    /// Return to the initial state.
    Reset,
    /// Stop the receiving runner after in-flight work completes.
    Terminate,
}

impl Event {
    /// Build a named event.
    pub fn named(id: impl Into<EventId>) -> Self {
        Self::Named(id.into())
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate)
    }

    /// The event id, or `None` for anything but `Named`.
    pub fn id(&self) -> Option<&EventId> {
        match self {
            Self::Named(id) => Some(id),
            _ => None,
        }
    }
}

impl From<EventId> for Event {
    fn from(id: EventId) -> Self {
        Self::Named(id)
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::Named(EventId::new(name))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(id) => write!(f, "{id}"),
            Self::Goto(state) => write!(f, "<goto {state}>"),
            Self::GoBack(steps) => write!(f, "<goback {steps}>"),
            Self::Reset => f.write_str("<reset>"),
            Self::Terminate => f.write_str("<terminate>"),
        }
    }
}
