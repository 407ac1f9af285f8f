//! Validation and normalization of parsed configs.
//!
//! Checks accumulate through stillwater's `Validation` so a single load
//! reports every malformed entry, not just the first one.

use super::{ConfigError, ConfigIssue, RawTransition, TransitionConfig};
use crate::core::{Forward, StateId, TransitionRule, TransitionTable};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigIssue>>;

fn check(ok: bool, issue: impl FnOnce() -> ConfigIssue) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(issue())
    }
}

/// Every state a config declares.
fn declared_states(config: &TransitionConfig) -> HashSet<StateId> {
    let mut states: HashSet<StateId> = config.states.iter().cloned().collect();
    if let Some(transitions) = &config.transitions {
        states.extend(transitions.keys().cloned());
    }
    if let Some(initial) = &config.initial_state {
        states.insert(initial.clone());
    }
    states
}

/// Run all structural checks, accumulating ALL issues.
pub(crate) fn validate(config: &TransitionConfig) -> Check {
    let states = declared_states(config);
    let mut checks: Vec<Check> = Vec::new();

    checks.push(check(config.initial_state.is_some(), || {
        ConfigIssue::MissingInitialState
    }));
    checks.push(check(config.transitions.is_some(), || {
        ConfigIssue::MissingTransitions
    }));

    if let Some(initial) = &config.initial_state {
        checks.push(check(!initial.as_str().is_empty(), || {
            ConfigIssue::EmptyIdentifier("initial_state")
        }));
        // The initial state must have rules or be listed in `states`;
        // otherwise it is only named, never declared.
        let declared = config.states.contains(initial)
            || config
                .transitions
                .as_ref()
                .is_some_and(|transitions| transitions.contains_key(initial));
        checks.push(check(declared || config.transitions.is_none(), || {
            ConfigIssue::UnknownInitialState(initial.clone())
        }));
    }

    for (state, rules) in config.transitions.iter().flatten() {
        checks.push(check(!state.as_str().is_empty(), || {
            ConfigIssue::EmptyIdentifier("transitions")
        }));
        for (event, raw) in rules {
            checks.push(check(!event.as_str().is_empty(), || {
                ConfigIssue::EmptyIdentifier("transitions")
            }));

            let (target, timeout) = match raw {
                RawTransition::Target(target) => (target, None),
                RawTransition::Rule(rule) => (&rule.target, rule.timeout),
            };
            checks.push(check(states.contains(target), || ConfigIssue::UnknownTarget {
                state: state.clone(),
                event: event.clone(),
                target: target.clone(),
            }));
            if let Some(millis) = timeout {
                let resolved = millis.is_finite() && !millis_to_duration(millis).is_zero();
                checks.push(check(resolved, || {
                    ConfigIssue::InvalidTimeout {
                        state: state.clone(),
                        event: event.clone(),
                        millis,
                    }
                }));
            }
        }
    }

    for state in config.communications.keys() {
        checks.push(check(states.contains(state), || {
            ConfigIssue::UnknownCommunicationState(state.clone())
        }));
    }

    Validation::all_vec(checks).map(|_| ())
}

/// Validate `config` and build the table it describes.
pub(crate) fn normalize(config: TransitionConfig) -> Result<TransitionTable, ConfigError> {
    if let Validation::Failure(issues) = validate(&config) {
        let issues: Vec<ConfigIssue> = issues.iter().cloned().collect();
        tracing::error!(issue_count = issues.len(), "rejecting malformed config");
        return Err(ConfigError::Malformed(issues));
    }

    let states = declared_states(&config);
    let event_sequence = config.run_sequence().to_vec();
    let TransitionConfig {
        initial_state,
        transitions,
        communications,
        timeout_event,
        ..
    } = config;

    let (Some(initial_state), Some(transitions)) = (initial_state, transitions) else {
        // Both presences were checked above.
        return Err(ConfigError::Malformed(vec![ConfigIssue::MissingInitialState]));
    };

    let transitions = transitions
        .into_iter()
        .map(|(state, rules)| {
            let rules = rules
                .into_iter()
                .map(|(event, raw)| (event, normalize_rule(raw)))
                .collect::<HashMap<_, _>>();
            (state, rules)
        })
        .collect();

    let communications = communications
        .into_iter()
        .map(|(state, forwards)| {
            let forwards = forwards
                .into_iter()
                .map(|(event, raw)| {
                    let forward = Forward {
                        event: raw.event,
                        machine: raw.machine,
                    };
                    (event, forward)
                })
                .collect::<HashMap<_, _>>();
            (state, forwards)
        })
        .collect();

    Ok(TransitionTable::from_parts(
        initial_state,
        states,
        transitions,
        communications,
        event_sequence,
        timeout_event,
    ))
}

fn normalize_rule(raw: RawTransition) -> TransitionRule {
    match raw {
        RawTransition::Target(target) => TransitionRule::to(target),
        RawTransition::Rule(rule) => TransitionRule {
            target: rule.target,
            guard: rule.guard,
            timeout: rule.timeout.map(millis_to_duration),
        },
    }
}

/// Nanosecond-rounded duration for a millisecond count. Negative values
/// saturate to zero.
fn millis_to_duration(millis: f64) -> Duration {
    Duration::from_nanos((millis * 1_000_000.0).round() as u64)
}
