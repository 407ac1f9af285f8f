//! Builder for whole transition tables.

use crate::builder::error::BuildError;
use crate::builder::transition::{BuiltRule, RuleBuilder};
use crate::config::{RawForward, RawTransition, TransitionConfig};
use crate::core::{EventId, GuardRegistry, MachineName, StateId, TransitionTable};
use crate::machine::Machine;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for constructing transition tables in code.
///
/// The builder produces the same [`TransitionConfig`] a JSON file would and
/// runs it through the same validation.
#[derive(Clone, Debug, Default)]
pub struct TableBuilder {
    config: TransitionConfig,
}

impl TableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: impl Into<StateId>) -> Self {
        self.config.initial_state = Some(state.into());
        self
    }

    /// Declare a state, with or without rules of its own.
    pub fn state(mut self, state: impl Into<StateId>) -> Self {
        self.transitions().entry(state.into()).or_default();
        self
    }

    /// Add an unguarded rule without a timeout.
    pub fn transition(
        self,
        from: impl Into<StateId>,
        event: impl Into<EventId>,
        to: impl Into<StateId>,
    ) -> Self {
        self.add_rule(BuiltRule {
            from: from.into(),
            event: event.into(),
            raw: RawTransition::Target(to.into()),
        })
    }

    /// Add a rule using a builder.
    /// Returns an error if the builder fails validation.
    pub fn rule(self, builder: RuleBuilder) -> Result<Self, BuildError> {
        Ok(self.add_rule(builder.build()?))
    }

    /// Add a pre-built rule.
    pub fn add_rule(mut self, rule: BuiltRule) -> Self {
        self.transitions()
            .entry(rule.from)
            .or_default()
            .insert(rule.event, rule.raw);
        self
    }

    /// After entering `state` through `event`, send `peer_event` to every
    /// wired peer.
    pub fn forward(
        self,
        state: impl Into<StateId>,
        event: impl Into<EventId>,
        peer_event: impl Into<EventId>,
    ) -> Self {
        self.add_forward(state.into(), event.into(), peer_event.into(), None)
    }

    /// Like [`forward`](Self::forward) but addressed to one peer.
    pub fn forward_to(
        self,
        state: impl Into<StateId>,
        event: impl Into<EventId>,
        peer: impl Into<MachineName>,
        peer_event: impl Into<EventId>,
    ) -> Self {
        self.add_forward(
            state.into(),
            event.into(),
            peer_event.into(),
            Some(peer.into()),
        )
    }

    /// Declared run sequence.
    pub fn event_sequence<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EventId>,
    {
        self.config.event_sequence = events.into_iter().map(Into::into).collect();
        self
    }

    /// Event synthesized when a state's timeout expires.
    pub fn timeout_event(mut self, event: impl Into<EventId>) -> Self {
        self.config.timeout_event = Some(event.into());
        self
    }

    /// The config this builder has accumulated so far.
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Validate and build the table.
    pub fn build(self) -> Result<TransitionTable, BuildError> {
        if self.config.initial_state.is_none() {
            return Err(BuildError::MissingInitialState);
        }
        let mut config = self.config;
        config.transitions.get_or_insert_with(BTreeMap::new);
        Ok(config.into_table()?)
    }

    /// Build the table and wrap it in a machine.
    pub fn build_machine(
        self,
        id: impl Into<MachineName>,
        guards: Arc<GuardRegistry>,
    ) -> Result<Machine, BuildError> {
        let table = self.build()?;
        Ok(Machine::new(id, Arc::new(table), guards))
    }

    fn transitions(&mut self) -> &mut BTreeMap<StateId, BTreeMap<EventId, RawTransition>> {
        self.config.transitions.get_or_insert_with(BTreeMap::new)
    }

    fn add_forward(
        mut self,
        state: StateId,
        event: EventId,
        peer_event: EventId,
        machine: Option<MachineName>,
    ) -> Self {
        self.config
            .communications
            .entry(state)
            .or_default()
            .insert(
                event,
                RawForward {
                    event: peer_event,
                    machine,
                },
            );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigIssue;
    use std::time::Duration;

    #[test]
    fn builder_requires_initial_state() {
        let result = TableBuilder::new().transition("A", "go", "A").build();
        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn builder_runs_config_validation() {
        let result = TableBuilder::new()
            .initial("A")
            .transition("A", "go", "Nowhere")
            .build();

        match result {
            Err(BuildError::Invalid(err)) => assert!(matches!(
                err.issues(),
                [ConfigIssue::UnknownTarget { .. }]
            )),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn fluent_api_builds_table() {
        let table = TableBuilder::new()
            .initial("Idle")
            .transition("Idle", "coin", "Ready")
            .rule(
                RuleBuilder::new()
                    .from("Ready")
                    .on("timeout")
                    .to("Idle")
                    .timeout(Duration::from_millis(100)),
            )
            .unwrap()
            .transition("Ready", "select_item", "Dispensing")
            .state("Dispensing")
            .forward_to("Dispensing", "select_item", "warehouse", "restock_check")
            .event_sequence(["coin", "select_item"])
            .build()
            .unwrap();

        assert_eq!(table.initial_state(), "Idle");
        assert_eq!(table.states().len(), 3);
        assert_eq!(
            table.timeout_for("Ready").unwrap().after,
            Duration::from_millis(100)
        );
        let forward = table.forward("Dispensing", "select_item").unwrap();
        assert_eq!(forward.machine.as_ref().unwrap(), "warehouse");
        assert_eq!(table.event_sequence().len(), 2);
    }

    #[test]
    fn build_machine_starts_in_initial_state() {
        let machine = TableBuilder::new()
            .initial("Red")
            .transition("Red", "next", "Green")
            .state("Green")
            .build_machine("light", Arc::new(GuardRegistry::new()))
            .unwrap();

        assert_eq!(machine.id(), "light");
        assert_eq!(machine.current_state(), "Red");
    }
}
