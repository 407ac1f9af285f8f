//! Machines: a transition table plus mutable position and history.
//!
//! A [`Machine`] is synchronous. It looks events up in its shared table,
//! evaluates guards and moves its current state, but never blocks and never
//! talks to other machines; forwarding is reported in the outcome and left
//! to whoever drives the machine.

mod outcome;

pub use outcome::{Applied, BlockReason, MachineError, TransitionOutcome};

use crate::config::{ConfigError, TransitionConfig};
use crate::core::{
    EntryCause, EventId, GuardRegistry, GuardVerdict, MachineName, StateHistory, StateId,
    StateTimeout, TransitionTable,
};
use crate::snapshot::StateSnapshot;
use std::sync::Arc;

/// One finite state machine instance.
///
/// # Example
///
/// ```rust
/// use statewire::config::parse_table;
/// use statewire::core::GuardRegistry;
/// use statewire::machine::Machine;
/// use std::sync::Arc;
///
/// let table = parse_table(r#"{
///     "initial_state": "Idle",
///     "transitions": {"Idle": {"up": "MovingUp"}, "MovingUp": {"stop": "Idle"}}
/// }"#).unwrap();
///
/// let mut machine = Machine::new("elevator", Arc::new(table), Arc::new(GuardRegistry::new()));
/// assert!(machine.apply("up").is_applied());
/// assert_eq!(machine.current_state(), "MovingUp");
/// assert_eq!(machine.goback(1), "Idle");
/// ```
#[derive(Clone, Debug)]
pub struct Machine {
    id: MachineName,
    history: StateHistory,
    table: Arc<TransitionTable>,
    guards: Arc<GuardRegistry>,
}

impl Machine {
    /// Create a machine in its table's initial state.
    pub fn new(
        id: impl Into<MachineName>,
        table: Arc<TransitionTable>,
        guards: Arc<GuardRegistry>,
    ) -> Self {
        let history = StateHistory::new(table.initial_state().clone());
        Self {
            id: id.into(),
            history,
            table,
            guards,
        }
    }

    /// Validate `config` and create a machine from it.
    pub fn from_config(
        id: impl Into<MachineName>,
        config: TransitionConfig,
        guards: Arc<GuardRegistry>,
    ) -> Result<Self, ConfigError> {
        let table = config.into_table()?;
        Ok(Self::new(id, Arc::new(table), guards))
    }

    pub fn id(&self) -> &MachineName {
        &self.id
    }

    pub fn current_state(&self) -> &StateId {
        self.history.current()
    }

    pub fn initial_state(&self) -> &StateId {
        self.table.initial_state()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn table(&self) -> &Arc<TransitionTable> {
        &self.table
    }

    /// Declared states, sorted.
    pub fn states(&self) -> Vec<&StateId> {
        self.table.states()
    }

    /// Events with a rule in the current state, sorted.
    pub fn available_events(&self) -> Vec<&EventId> {
        self.table.events_for(self.current_state().as_str())
    }

    /// The run sequence declared by the config.
    pub fn event_sequence(&self) -> &[EventId] {
        self.table.event_sequence()
    }

    /// Shortest timeout among the current state's outgoing rules.
    pub fn active_timeout(&self) -> Option<&StateTimeout> {
        self.table.timeout_for(self.current_state().as_str())
    }

    /// Apply one event.
    ///
    /// The machine moves only on [`TransitionOutcome::Applied`]; blocked and
    /// invalid events leave state and history untouched.
    pub fn apply(&mut self, event: impl Into<EventId>) -> TransitionOutcome {
        let event = event.into();
        let from = self.current_state().clone();

        let Some(rule) = self.table.rule(from.as_str(), event.as_str()) else {
            tracing::warn!(
                machine = %self.id,
                state = %from,
                event = %event,
                "invalid transition"
            );
            return TransitionOutcome::Invalid { state: from, event };
        };

        if let Some(guard) = &rule.guard {
            let reason = match self.guards.evaluate(guard.as_str()) {
                GuardVerdict::Allowed => None,
                GuardVerdict::Rejected => Some(BlockReason::GuardRejected {
                    guard: guard.clone(),
                }),
                GuardVerdict::Missing => Some(BlockReason::GuardMissing {
                    guard: guard.clone(),
                }),
            };
            if let Some(reason) = reason {
                tracing::warn!(
                    machine = %self.id,
                    state = %from,
                    event = %event,
                    guard = %guard,
                    missing = matches!(reason, BlockReason::GuardMissing { .. }),
                    "transition blocked by guard"
                );
                return TransitionOutcome::Blocked {
                    state: from,
                    event,
                    reason,
                };
            }
        }

        let to = rule.target.clone();
        self.history
            .record(to.clone(), EntryCause::Event(event.clone()));
        let forward = self.table.forward(to.as_str(), event.as_str()).cloned();

        tracing::info!(
            machine = %self.id,
            from = %from,
            to = %to,
            event = %event,
            "transitioned"
        );

        TransitionOutcome::Applied(Applied {
            from,
            to,
            event,
            forward,
        })
    }

    /// Jump to `state` without consulting guards.
    pub fn goto(&mut self, state: impl Into<StateId>) -> Result<(), MachineError> {
        let state = state.into();
        if !self.table.contains_state(state.as_str()) {
            tracing::warn!(machine = %self.id, state = %state, "goto to undeclared state");
            return Err(MachineError::InvalidState(state));
        }

        tracing::info!(
            machine = %self.id,
            from = %self.current_state(),
            to = %state,
            "goto"
        );
        self.history.record(state, EntryCause::Goto);
        Ok(())
    }

    /// Undo the last `steps` moves and return the resulting state.
    ///
    /// Going back further than the recorded history lands on the initial
    /// state with the history collapsed to that single entry.
    pub fn goback(&mut self, steps: usize) -> StateId {
        if steps >= self.history.len() {
            tracing::debug!(
                machine = %self.id,
                steps,
                depth = self.history.len(),
                "goback beyond history, clamping to initial state"
            );
        }
        let state = self.history.go_back(steps).clone();
        tracing::info!(machine = %self.id, steps, state = %state, "went back");
        state
    }

    /// Return to the initial state, keeping the history.
    pub fn reset(&mut self) {
        let initial = self.table.initial_state().clone();
        tracing::info!(machine = %self.id, from = %self.current_state(), "reset");
        self.history.record(initial, EntryCause::Reset);
    }

    /// Apply events in order, returning each outcome.
    pub fn run_sequence<I, E>(&mut self, events: I) -> Vec<TransitionOutcome>
    where
        I: IntoIterator<Item = E>,
        E: Into<EventId>,
    {
        events.into_iter().map(|event| self.apply(event)).collect()
    }

    /// Replay the config's declared event sequence.
    pub fn run_all(&mut self) -> Vec<TransitionOutcome> {
        if self.table.event_sequence().is_empty() {
            tracing::warn!(machine = %self.id, "no predefined event sequence");
            return Vec::new();
        }
        let events = self.table.event_sequence().to_vec();
        self.run_sequence(events)
    }

    /// Read-only view for presentation layers.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_table;
    use crate::core::Forward;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ELEVATOR: &str = r#"{
        "initial_state": "Idle",
        "transitions": {
            "Idle": {"up": "MovingUp", "emergency_trigger": "Emergency"},
            "MovingUp": {"stop": "Idle", "emergency_trigger": "Emergency"},
            "Emergency": {"reset": "Idle"}
        },
        "communications": {"Emergency": {"emergency_trigger": {"event": "lockdown"}}},
        "event_sequence": ["up", "stop", "emergency_trigger", "reset"]
    }"#;

    fn elevator() -> Machine {
        let table = parse_table(ELEVATOR).unwrap();
        Machine::new("elevator", Arc::new(table), Arc::new(GuardRegistry::new()))
    }

    fn guarded(guards: GuardRegistry) -> Machine {
        let table = parse_table(
            r#"{"initial_state":"Idle","transitions":{
                "Idle":{"select_item":{"target":"Vending","guard":"has_credit"},
                        "service":{"target":"Service","guard":"is_technician"}},
                "Vending":{},"Service":{}}}"#,
        )
        .unwrap();
        Machine::new("vending", Arc::new(table), Arc::new(guards))
    }

    fn path(machine: &Machine) -> Vec<&str> {
        machine.history().path().map(|s| s.as_str()).collect()
    }

    #[test]
    fn new_machine_starts_in_initial_state() {
        let machine = elevator();
        assert_eq!(machine.current_state(), "Idle");
        assert_eq!(path(&machine), ["Idle"]);
        assert_eq!(machine.id(), "elevator");
    }

    #[test]
    fn elevator_sequence_visits_expected_states() {
        let mut machine = elevator();
        let outcomes = machine.run_all();

        assert!(outcomes.iter().all(TransitionOutcome::is_applied));
        assert_eq!(
            path(&machine),
            ["Idle", "MovingUp", "Idle", "Emergency", "Idle"]
        );
    }

    #[test]
    fn applied_transition_appends_one_entry() {
        let mut machine = elevator();
        let outcome = machine.apply("up");

        assert_eq!(
            outcome,
            TransitionOutcome::Applied(Applied {
                from: StateId::new("Idle"),
                to: StateId::new("MovingUp"),
                event: EventId::new("up"),
                forward: None,
            })
        );
        assert_eq!(machine.history().len(), 2);
    }

    #[test]
    fn invalid_event_leaves_state_unchanged() {
        let mut machine = elevator();
        let outcome = machine.apply("select_item");

        assert_eq!(
            outcome,
            TransitionOutcome::Invalid {
                state: StateId::new("Idle"),
                event: EventId::new("select_item"),
            }
        );
        assert_eq!(machine.current_state(), "Idle");
        assert_eq!(machine.history().len(), 1);
        assert!(matches!(
            outcome.into_result(),
            Err(MachineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rejected_guard_blocks_transition() {
        let mut machine = guarded(GuardRegistry::new().with("has_credit", || false));
        let outcome = machine.apply("select_item");

        assert!(matches!(
            &outcome,
            TransitionOutcome::Blocked {
                reason: BlockReason::GuardRejected { guard },
                ..
            } if guard == "has_credit"
        ));
        assert_eq!(machine.current_state(), "Idle");
        assert_eq!(machine.history().len(), 1);
        assert!(matches!(
            outcome.into_result(),
            Err(MachineError::GuardBlocked { .. })
        ));
    }

    #[test]
    fn unregistered_guard_is_reported_distinctly() {
        let mut machine = guarded(GuardRegistry::new());
        let outcome = machine.apply("service");

        assert!(matches!(
            outcome,
            TransitionOutcome::Blocked {
                reason: BlockReason::GuardMissing { .. },
                ..
            }
        ));
        assert_eq!(machine.current_state(), "Idle");
    }

    #[test]
    fn guard_is_evaluated_on_every_apply() {
        let credit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&credit);
        let mut machine = guarded(GuardRegistry::new().with("has_credit", move || {
            flag.load(Ordering::SeqCst)
        }));

        assert!(!machine.apply("select_item").is_applied());
        credit.store(true, Ordering::SeqCst);
        assert!(machine.apply("select_item").is_applied());
        assert_eq!(machine.current_state(), "Vending");
    }

    #[test]
    fn forward_is_attached_for_target_state_and_event() {
        let mut machine = elevator();
        let outcome = machine.apply("emergency_trigger");

        assert_eq!(
            outcome.forward(),
            Some(&Forward {
                event: EventId::new("lockdown"),
                machine: None,
            })
        );
        assert!(machine.apply("reset").forward().is_none());
    }

    #[test]
    fn goto_jumps_without_guards() {
        let mut machine = guarded(GuardRegistry::new().with("has_credit", || false));
        machine.goto("Vending").unwrap();

        assert_eq!(machine.current_state(), "Vending");
        assert_eq!(path(&machine), ["Idle", "Vending"]);
    }

    #[test]
    fn goto_rejects_undeclared_state() {
        let mut machine = elevator();
        let err = machine.goto("Basement").unwrap_err();

        assert_eq!(err, MachineError::InvalidState(StateId::new("Basement")));
        assert_eq!(machine.current_state(), "Idle");
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn goback_zero_is_noop() {
        let mut machine = elevator();
        machine.run_sequence(["up", "stop"]);

        assert_eq!(machine.goback(0), "Idle");
        assert_eq!(machine.history().len(), 3);
    }

    #[test]
    fn goback_undoes_transitions() {
        let mut machine = elevator();
        machine.run_sequence(["up", "emergency_trigger"]);

        assert_eq!(machine.goback(1), "MovingUp");
        assert_eq!(machine.current_state(), "MovingUp");
        assert_eq!(path(&machine), ["Idle", "MovingUp"]);
    }

    #[test]
    fn goback_full_depth_returns_to_initial() {
        let mut machine = elevator();
        machine.run_sequence(["up", "stop", "up"]);
        let depth = machine.history().len();

        assert_eq!(machine.goback(depth - 1), "Idle");
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn goback_past_history_clamps() {
        let mut machine = elevator();
        machine.run_sequence(["up", "emergency_trigger"]);

        assert_eq!(machine.goback(10), "Idle");
        assert_eq!(path(&machine), ["Idle"]);
    }

    #[test]
    fn reset_returns_to_initial_and_keeps_history() {
        let mut machine = elevator();
        machine.run_sequence(["up", "emergency_trigger"]);
        machine.reset();

        assert_eq!(machine.current_state(), "Idle");
        assert_eq!(path(&machine), ["Idle", "MovingUp", "Emergency", "Idle"]);
        assert_eq!(machine.goback(1), "Emergency");
    }

    #[test]
    fn replay_after_reset_is_deterministic() {
        let mut machine = elevator();
        machine.run_all();
        let first = machine.current_state().clone();

        machine.reset();
        machine.run_all();
        assert_eq!(machine.current_state(), &first);
    }

    #[test]
    fn available_events_follow_current_state() {
        let mut machine = elevator();
        let events: Vec<&str> = machine
            .available_events()
            .into_iter()
            .map(|e| e.as_str())
            .collect();
        assert_eq!(events, ["emergency_trigger", "up"]);

        machine.apply("emergency_trigger");
        let events: Vec<&str> = machine
            .available_events()
            .into_iter()
            .map(|e| e.as_str())
            .collect();
        assert_eq!(events, ["reset"]);
    }

    #[test]
    fn from_config_rejects_malformed_config() {
        let config =
            TransitionConfig::from_json_str(r#"{"initial_state":"A","transitions":{"A":{"x":"B"}}}"#)
                .unwrap();
        let result = Machine::from_config("broken", config, Arc::new(GuardRegistry::new()));
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }
}
