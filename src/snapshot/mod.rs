//! Read-only snapshots of machine state.
//!
//! Presentation layers (shells, graph renderers, dashboards) consume
//! [`StateSnapshot`]s instead of reaching into a running machine. A
//! snapshot can be encoded as JSON or compact binary for transport; it is
//! never fed back into a machine.

use crate::core::{EventId, HistoryEntry, MachineName, StateId};
use crate::machine::Machine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Point-in-time view of one machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    pub machine: MachineName,

    pub initial_state: StateId,

    pub current_state: StateId,

    /// Visited states, oldest first, ending with `current_state`
    pub history: Vec<HistoryEntry>,

    /// Events with a rule in `current_state`
    pub available_events: Vec<EventId>,
}

impl StateSnapshot {
    pub fn of(machine: &Machine) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            machine: machine.id().clone(),
            initial_state: machine.initial_state().clone(),
            current_state: machine.current_state().clone(),
            history: machine.history().entries().to_vec(),
            available_events: machine.available_events().into_iter().cloned().collect(),
        }
    }

    /// Visited states, oldest first.
    pub fn path(&self) -> Vec<&StateId> {
        self.history.iter().map(|entry| &entry.state).collect()
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(self)
        } else {
            Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }
}
