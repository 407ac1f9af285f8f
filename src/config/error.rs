//! Config loading errors.

use crate::core::{EventId, StateId};
use std::path::PathBuf;
use thiserror::Error;

/// A single problem found while validating a config.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigIssue {
    #[error("missing required key 'initial_state'")]
    MissingInitialState,

    #[error("missing required key 'transitions'")]
    MissingTransitions,

    #[error("initial state '{0}' is not a declared state")]
    UnknownInitialState(StateId),

    #[error("transition '{state}' --{event}--> '{target}' targets an undeclared state")]
    UnknownTarget {
        state: StateId,
        event: EventId,
        target: StateId,
    },

    #[error("communications refer to undeclared state '{0}'")]
    UnknownCommunicationState(StateId),

    #[error("timeout on '{state}' --{event}--> must be a positive number of milliseconds, got {millis}")]
    InvalidTimeout {
        state: StateId,
        event: EventId,
        millis: f64,
    },

    #[error("identifiers must not be empty (found in {0})")]
    EmptyIdentifier(&'static str),
}

/// Errors that can occur while loading a transition config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed config: {}", join_issues(.0))]
    Malformed(Vec<ConfigIssue>),
}

impl ConfigError {
    /// Issues behind a `Malformed` error, empty for other variants.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::Malformed(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
