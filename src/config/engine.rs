//! Engine-wide settings passed explicitly to the orchestrator.

use crate::core::{EventId, StateTimeout, TransitionTable};
use serde::{Deserialize, Serialize};

/// Event name used when the timeout event is not configured anywhere.
pub const DEFAULT_TIMEOUT_EVENT: &str = "timeout";

/// Which event a runner synthesizes when a state's timeout expires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutEvent {
    /// Always apply this event.
    Fixed(EventId),
    /// Apply the event of the rule that declared the expired timeout.
    Triggering,
}

impl Default for TimeoutEvent {
    fn default() -> Self {
        Self::Fixed(EventId::new(DEFAULT_TIMEOUT_EVENT))
    }
}

/// Runtime settings shared by every runner of an orchestrator.
///
/// # Example
///
/// ```rust
/// use statewire::config::{EngineConfig, TimeoutEvent};
///
/// let config: EngineConfig = serde_json::from_str(r#"{"timeout_event": "triggering"}"#).unwrap();
/// assert_eq!(config.timeout_event, TimeoutEvent::Triggering);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timeout_event: TimeoutEvent,
}

impl EngineConfig {
    pub fn with_timeout_event(mut self, timeout_event: TimeoutEvent) -> Self {
        self.timeout_event = timeout_event;
        self
    }

    /// Event to apply when `timeout` expires on a machine using `table`.
    ///
    /// A `timeout_event` declared in the table's own config wins over the
    /// engine-wide setting.
    pub fn timeout_event_for(&self, table: &TransitionTable, timeout: &StateTimeout) -> EventId {
        if let Some(event) = table.timeout_event() {
            return event.clone();
        }
        match &self.timeout_event {
            TimeoutEvent::Fixed(event) => event.clone(),
            TimeoutEvent::Triggering => timeout.event.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransitionConfig;
    use std::time::Duration;

    fn timeout() -> StateTimeout {
        StateTimeout {
            after: Duration::from_millis(100),
            event: EventId::new("up"),
        }
    }

    fn table(json: &str) -> TransitionTable {
        TransitionConfig::from_json_str(json)
            .unwrap()
            .into_table()
            .unwrap()
    }

    #[test]
    fn default_timeout_event_is_timeout() {
        let table = table(r#"{"initial_state": "A", "transitions": {"A": {}}}"#);
        let config = EngineConfig::default();
        assert_eq!(config.timeout_event_for(&table, &timeout()), "timeout");
    }

    #[test]
    fn triggering_mode_uses_rule_event() {
        let table = table(r#"{"initial_state": "A", "transitions": {"A": {}}}"#);
        let config = EngineConfig::default().with_timeout_event(TimeoutEvent::Triggering);
        assert_eq!(config.timeout_event_for(&table, &timeout()), "up");
    }

    #[test]
    fn table_setting_overrides_engine() {
        let table = table(
            r#"{"initial_state": "A", "timeout_event": "expired", "transitions": {"A": {}}}"#,
        );
        let config = EngineConfig::default().with_timeout_event(TimeoutEvent::Triggering);
        assert_eq!(config.timeout_event_for(&table, &timeout()), "expired");
    }

    #[test]
    fn engine_config_deserializes_fixed_event() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"timeout_event": {"fixed": "tick"}}"#).unwrap();
        assert_eq!(config.timeout_event, TimeoutEvent::Fixed(EventId::new("tick")));

        let empty: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EngineConfig::default());
    }
}
