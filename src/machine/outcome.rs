//! Results of applying events to a machine.

use crate::core::{EventId, Forward, GuardId, StateId};
use thiserror::Error;

/// Why a declared transition did not fire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The guard ran and returned false.
    GuardRejected { guard: GuardId },
    /// The rule names a guard nobody registered.
    GuardMissing { guard: GuardId },
}

/// A transition that fired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub from: StateId,
    pub to: StateId,
    pub event: EventId,
    /// Event owed to a peer machine; the runner delivers it.
    pub forward: Option<Forward>,
}

/// Result of [`Machine::apply`](crate::machine::Machine::apply).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(Applied),
    Blocked {
        state: StateId,
        event: EventId,
        reason: BlockReason,
    },
    /// No rule for this event in the current state.
    Invalid { state: StateId, event: EventId },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The forward carried by an applied transition.
    pub fn forward(&self) -> Option<&Forward> {
        match self {
            Self::Applied(applied) => applied.forward.as_ref(),
            _ => None,
        }
    }

    /// Convert into a `Result` for callers that treat rejections as errors.
    pub fn into_result(self) -> Result<Applied, MachineError> {
        match self {
            Self::Applied(applied) => Ok(applied),
            Self::Blocked {
                state,
                event,
                reason: BlockReason::GuardRejected { guard },
            } => Err(MachineError::GuardBlocked {
                state,
                event,
                guard,
            }),
            Self::Blocked {
                state,
                event,
                reason: BlockReason::GuardMissing { guard },
            } => Err(MachineError::GuardMissing {
                state,
                event,
                guard,
            }),
            Self::Invalid { state, event } => {
                Err(MachineError::InvalidTransition { state, event })
            }
        }
    }
}

/// Recoverable errors raised by machine operations.
///
/// None of these mutate the machine: it stays in the state it was in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("no transition from '{state}' on event '{event}'")]
    InvalidTransition { state: StateId, event: EventId },

    #[error("guard '{guard}' blocked '{event}' in state '{state}'")]
    GuardBlocked {
        state: StateId,
        event: EventId,
        guard: GuardId,
    },

    #[error("guard '{guard}' required by '{event}' in state '{state}' is not registered")]
    GuardMissing {
        state: StateId,
        event: EventId,
        guard: GuardId,
    },

    #[error("state '{0}' is not declared")]
    InvalidState(StateId),
}
