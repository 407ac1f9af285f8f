//! Runtime errors.

use crate::config::ConfigError;
use crate::core::MachineName;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring, driving or shutting down machines.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("unknown machine '{0}'")]
    UnknownMachine(MachineName),

    #[error("machine '{0}' is already registered")]
    DuplicateMachine(MachineName),

    #[error("machine '{from}' is not wired to '{to}'")]
    PeerUnavailable { from: MachineName, to: MachineName },

    #[error("inbound channel of machine '{0}' is closed")]
    ChannelClosed(MachineName),

    #[error("machine '{machine}' failed to load: {source}")]
    Config {
        machine: MachineName,
        #[source]
        source: Arc<ConfigError>,
    },

    #[error("runner for machine '{machine}' failed: {message}")]
    TaskFailed { machine: MachineName, message: String },
}
