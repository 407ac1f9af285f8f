//! Concurrent execution of machines.
//!
//! Each machine is driven by its own [`Runner`] task. Runners never share
//! mutable state: a machine's position and history belong to its runner,
//! and the only way one machine affects another is by forwarding an event
//! onto the peer's inbound channel through the static [`Routes`] built by
//! the [`Orchestrator`].
//!
//! ```text
//!   seed / send ──► inbox ──► Runner ──► Machine::apply
//!                               │             │
//!                         state timeout   forward? ──► Routes ──► peer inbox
//! ```

mod error;
mod orchestrator;
mod runner;

pub use error::RuntimeError;
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use runner::{mailbox, Inbox, Mailbox, RunReport, Routes, Runner, RunnerState, RunnerStatus};
