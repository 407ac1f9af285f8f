//! Builder API for constructing transition tables in code.
//!
//! This module provides fluent builders and a macro for creating tables
//! without writing JSON, while reusing the exact validation JSON configs
//! go through.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::TableBuilder;
pub use transition::{BuiltRule, RuleBuilder};

use crate::core::{EventId, GuardId, StateId};
use std::time::Duration;

/// Create an unguarded rule.
///
/// # Example
///
/// ```
/// use statewire::builder::{simple_rule, TableBuilder};
///
/// let table = TableBuilder::new()
///     .initial("Red")
///     .add_rule(simple_rule("Red", "timer_expired", "Green"))
///     .state("Green")
///     .build()
///     .unwrap();
/// assert_eq!(table.rule_count(), 1);
/// ```
pub fn simple_rule(
    from: impl Into<StateId>,
    event: impl Into<EventId>,
    to: impl Into<StateId>,
) -> BuiltRule {
    RuleBuilder::new()
        .from(from)
        .on(event)
        .to(to)
        .build()
        .expect("Simple rule should always build")
}

/// Create a rule gated on a registered guard.
pub fn guarded_rule(
    from: impl Into<StateId>,
    event: impl Into<EventId>,
    to: impl Into<StateId>,
    guard: impl Into<GuardId>,
) -> BuiltRule {
    RuleBuilder::new()
        .from(from)
        .on(event)
        .to(to)
        .guard(guard)
        .build()
        .expect("Guarded rule should always build")
}

/// Create a rule that also arms a timeout while its source state is active.
pub fn timed_rule(
    from: impl Into<StateId>,
    event: impl Into<EventId>,
    to: impl Into<StateId>,
    after: Duration,
) -> BuiltRule {
    RuleBuilder::new()
        .from(from)
        .on(event)
        .to(to)
        .timeout(after)
        .build()
        .expect("Timed rule should always build")
}
