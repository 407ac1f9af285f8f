//! Build errors for table and rule builders.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur when building transition tables and rules.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Rule source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Rule event not specified. Call .on(event)")]
    MissingEvent,

    #[error("Rule target state not specified. Call .to(state)")]
    MissingToState,

    #[error("Table is invalid: {0}")]
    Invalid(#[from] ConfigError),
}
