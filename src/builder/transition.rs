//! Builder for a single transition rule.

use crate::builder::error::BuildError;
use crate::config::{RawRule, RawTransition};
use crate::core::{EventId, GuardId, StateId};
use std::time::Duration;

/// A rule ready to be added to a [`TableBuilder`](crate::builder::TableBuilder).
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltRule {
    pub from: StateId,
    pub event: EventId,
    pub(crate) raw: RawTransition,
}

/// Builder for one `(state, event) -> target` rule with a fluent API.
#[derive(Clone, Debug, Default)]
pub struct RuleBuilder {
    from: Option<StateId>,
    event: Option<EventId>,
    to: Option<StateId>,
    guard: Option<GuardId>,
    timeout: Option<Duration>,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source state (required).
    pub fn from(mut self, state: impl Into<StateId>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Set the triggering event (required).
    pub fn on(mut self, event: impl Into<EventId>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<StateId>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Gate the rule on a registered guard (optional).
    pub fn guard(mut self, guard: impl Into<GuardId>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Attach a timeout to the rule (optional).
    pub fn timeout(mut self, after: Duration) -> Self {
        self.timeout = Some(after);
        self
    }

    /// Build the rule.
    pub fn build(self) -> Result<BuiltRule, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let event = self.event.ok_or(BuildError::MissingEvent)?;
        let target = self.to.ok_or(BuildError::MissingToState)?;

        let raw = if self.guard.is_none() && self.timeout.is_none() {
            RawTransition::Target(target)
        } else {
            RawTransition::Rule(RawRule {
                target,
                guard: self.guard,
                timeout: self.timeout.map(|after| after.as_nanos() as f64 / 1_000_000.0),
            })
        };

        Ok(BuiltRule { from, event, raw })
    }
}
