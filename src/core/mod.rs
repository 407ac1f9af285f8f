//! Core state machine types.
//!
//! This module holds the leaf data structures of the engine:
//! - string identifiers for states, events, guards and machines
//! - the immutable [`TransitionTable`]
//! - named [`Guard`] predicates collected in a [`GuardRegistry`]
//! - the [`StateHistory`] path used for undo
//!
//! Nothing here performs I/O or touches a channel.

mod event;
mod guard;
mod history;
mod ids;
mod table;

pub use event::Event;
pub use guard::{Guard, GuardRegistry, GuardVerdict};
pub use history::{EntryCause, HistoryEntry, StateHistory};
pub use ids::{EventId, GuardId, MachineName, StateId};
pub use table::{Forward, StateTimeout, TransitionRule, TransitionTable};
