//! Declarative machine configuration.
//!
//! Configs are JSON documents describing one machine:
//!
//! ```json
//! {
//!   "initial_state": "Idle",
//!   "transitions": {
//!     "Idle": { "up": "MovingUp", "coin": { "target": "Paid", "guard": "has_credit", "timeout": 500 } },
//!     "MovingUp": { "stop": "Idle" },
//!     "Paid": {}
//!   },
//!   "communications": { "MovingUp": { "up": { "event": "lock" } } },
//!   "event_sequence": ["up", "stop"]
//! }
//! ```
//!
//! A bare string transition is shorthand for `{"target": ...}`. Parsing
//! normalizes both shapes into [`TransitionRule`]s; validation collects
//! every problem in one pass instead of stopping at the first.
//!
//! [`TransitionRule`]: crate::core::TransitionRule

mod engine;
mod error;
mod validate;

pub use engine::{EngineConfig, TimeoutEvent, DEFAULT_TIMEOUT_EVENT};
pub use error::{ConfigError, ConfigIssue};

use crate::core::{EventId, GuardId, MachineName, StateId, TransitionTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extension of machine configs.
pub const CONFIG_EXTENSION: &str = "json";

/// A transition value as written in the config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTransition {
    /// Shorthand: just the target state.
    Target(StateId),
    /// Full form with optional guard and timeout.
    Rule(RawRule),
}

/// Full form of a transition value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRule {
    pub target: StateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardId>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

/// A communications entry as written in the config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForward {
    pub event: EventId,
    #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineName>,
}

/// Parsed, not yet validated, machine config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default)]
    pub initial_state: Option<StateId>,
    /// Extra declared states, typically terminal ones without rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<StateId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventId>,
    #[serde(default)]
    pub transitions: Option<BTreeMap<StateId, BTreeMap<EventId, RawTransition>>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub communications: BTreeMap<StateId, BTreeMap<EventId, RawForward>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_sequence: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_event: Option<EventId>,
}

impl TransitionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Validate and normalize into an immutable table.
    pub fn into_table(self) -> Result<TransitionTable, ConfigError> {
        validate::normalize(self)
    }

    /// The declared run sequence: `event_sequence`, else `events`.
    pub fn run_sequence(&self) -> &[EventId] {
        if self.event_sequence.is_empty() {
            &self.events
        } else {
            &self.event_sequence
        }
    }
}

/// Parse and validate a JSON config in one step.
pub fn parse_table(json: &str) -> Result<TransitionTable, ConfigError> {
    TransitionConfig::from_json_str(json)?.into_table()
}

/// Identifiers (file stems) of the configs in `dir`, sorted.
pub fn list_configs(dir: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let dir = dir.as_ref();
    let io_error = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_config = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == CONFIG_EXTENSION);
        if !is_config {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            ids.push(stem.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Path of config `id` inside `dir`; the extension is optional in `id`.
pub fn config_path(dir: impl AsRef<Path>, id: &str) -> PathBuf {
    let path = dir.as_ref().join(id);
    if path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION) {
        path
    } else {
        path.with_extension(CONFIG_EXTENSION)
    }
}

/// Load config `id` from `dir` and validate it.
pub fn load_table(dir: impl AsRef<Path>, id: &str) -> Result<TransitionTable, ConfigError> {
    TransitionConfig::from_path(config_path(dir, id))?.into_table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ELEVATOR: &str = r#"{
        "initial_state": "Idle",
        "transitions": {
            "Idle": {"up": "MovingUp", "emergency_trigger": "Emergency"},
            "MovingUp": {"stop": "Idle", "emergency_trigger": "Emergency"},
            "Emergency": {"reset": "Idle"}
        },
        "event_sequence": ["up", "stop", "emergency_trigger", "reset"]
    }"#;

    #[test]
    fn bare_string_and_object_transitions_parse() {
        let config = TransitionConfig::from_json_str(
            r#"{
                "initial_state": "A",
                "transitions": {"A": {"go": "B", "slow": {"target": "B", "guard": "ready", "timeout": 250}}, "B": {}}
            }"#,
        )
        .unwrap();

        let rules = &config.transitions.as_ref().unwrap()[&StateId::new("A")];
        assert_eq!(
            rules[&EventId::new("go")],
            RawTransition::Target(StateId::new("B"))
        );
        assert_eq!(
            rules[&EventId::new("slow")],
            RawTransition::Rule(RawRule {
                target: StateId::new("B"),
                guard: Some(GuardId::new("ready")),
                timeout: Some(250.0),
            })
        );
    }

    #[test]
    fn run_sequence_falls_back_to_events() {
        let config = TransitionConfig::from_json_str(
            r#"{"initial_state": "A", "transitions": {"A": {}}, "events": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(config.run_sequence(), [EventId::new("x")]);

        let config = TransitionConfig::from_json_str(ELEVATOR).unwrap();
        assert_eq!(config.run_sequence().len(), 4);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let result = TransitionConfig::from_json_str("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn list_configs_returns_sorted_json_stems() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vending.json"), "{}").unwrap();
        fs::write(dir.path().join("elevator.json"), ELEVATOR).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let ids = list_configs(dir.path()).unwrap();
        assert_eq!(ids, ["elevator", "vending"]);
    }

    #[test]
    fn list_configs_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(list_configs(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_table_accepts_ids_with_or_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("elevator.json"), ELEVATOR).unwrap();

        let table = load_table(dir.path(), "elevator").unwrap();
        assert_eq!(table.initial_state(), "Idle");

        let table = load_table(dir.path(), "elevator.json").unwrap();
        assert_eq!(table.event_sequence().len(), 4);
    }
}
