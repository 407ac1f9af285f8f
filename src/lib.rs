//! Statewire: a configuration-driven finite state machine runtime
//!
//! Machines are described by declarative JSON configs (states, events,
//! guarded transitions, per-state timeouts) and run concurrently, each on
//! its own tokio task. Machines cooperate by forwarding events to each
//! other over channels; they never share mutable state.
//!
//! # Core Concepts
//!
//! - **TransitionTable**: Immutable `(state, event) -> rule` mapping, shared via `Arc`
//! - **Guards**: Named predicates supplied by the host
//! - **Machine**: Current state plus history, mutated only by `apply`, `goto`, `goback`, `reset`
//! - **Runner**: Event loop racing each wait against the current state's timeout
//! - **Orchestrator**: Wires machines together and manages their lifecycle
//!
//! # Example
//!
//! ```rust
//! use statewire::config::parse_table;
//! use statewire::core::GuardRegistry;
//! use statewire::machine::Machine;
//! use std::sync::Arc;
//!
//! let table = parse_table(r#"{
//!     "initial_state": "Idle",
//!     "transitions": {
//!         "Idle": {"up": "MovingUp", "emergency_trigger": "Emergency"},
//!         "MovingUp": {"stop": "Idle", "emergency_trigger": "Emergency"},
//!         "Emergency": {"reset": "Idle"}
//!     }
//! }"#).unwrap();
//!
//! let mut elevator = Machine::new("elevator", Arc::new(table), Arc::new(GuardRegistry::new()));
//! elevator.run_sequence(["up", "stop", "emergency_trigger", "reset"]);
//!
//! let path: Vec<&str> = elevator.history().path().map(|s| s.as_str()).collect();
//! assert_eq!(path, ["Idle", "MovingUp", "Idle", "Emergency", "Idle"]);
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod machine;
pub mod runtime;
pub mod snapshot;

// Re-export commonly used types
pub use crate::config::{ConfigError, EngineConfig, TransitionConfig};
pub use crate::core::{Event, EventId, Guard, GuardRegistry, MachineName, StateId, TransitionTable};
pub use crate::machine::{Machine, MachineError, TransitionOutcome};
pub use crate::runtime::{Orchestrator, OrchestratorHandle, RuntimeError};
pub use crate::snapshot::StateSnapshot;
