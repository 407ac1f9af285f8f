//! Guard predicates for controlling state transitions.
//!
//! Guards are nullary boolean functions registered by the host under a
//! name. Transition rules refer to guards by that name; the engine never
//! invents a guard on its own.

use super::ids::GuardId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate that determines if a guarded transition can execute.
///
/// Guards take no arguments: they consult whatever host state they closed
/// over. They must be thread-safe because every runner sharing a registry
/// may evaluate them concurrently.
///
/// # Example
///
/// ```rust
/// use statewire::core::Guard;
///
/// let always = Guard::new(|| true);
/// assert!(always.check());
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

/// Result of looking a guard up and evaluating it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Allowed,
    Rejected,
    Missing,
}

/// Named guards supplied by the host.
///
/// Populate the registry at startup, wrap it in an `Arc` and hand it to
/// every machine. It is never mutated once machines are running.
///
/// # Example
///
/// ```rust
/// use statewire::core::{GuardRegistry, GuardVerdict};
///
/// let guards = GuardRegistry::new()
///     .with("is_system_ready", || true)
///     .with("has_credit", || false);
///
/// assert_eq!(guards.evaluate("is_system_ready"), GuardVerdict::Allowed);
/// assert_eq!(guards.evaluate("has_credit"), GuardVerdict::Rejected);
/// assert_eq!(guards.evaluate("unknown"), GuardVerdict::Missing);
/// ```
#[derive(Clone, Debug, Default)]
pub struct GuardRegistry {
    guards: HashMap<GuardId, Guard>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a guard, replacing any previous one with the same name.
    pub fn register<F>(&mut self, id: impl Into<GuardId>, predicate: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.guards.insert(id.into(), Guard::new(predicate));
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<F>(mut self, id: impl Into<GuardId>, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.register(id, predicate);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Guard> {
        self.guards.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.guards.contains_key(id)
    }

    /// Look up and evaluate a guard in one step.
    pub fn evaluate(&self, id: &str) -> GuardVerdict {
        match self.guards.get(id) {
            None => GuardVerdict::Missing,
            Some(guard) if guard.check() => GuardVerdict::Allowed,
            Some(_) => GuardVerdict::Rejected,
        }
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn guard_reflects_captured_state() {
        let flag = Arc::new(AtomicBool::new(false));
        let captured = Arc::clone(&flag);
        let guard = Guard::new(move || captured.load(Ordering::SeqCst));

        assert!(!guard.check());
        flag.store(true, Ordering::SeqCst);
        assert!(guard.check());
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::new(|| true);
        assert_eq!(guard.check(), guard.check());
    }

    #[test]
    fn registry_distinguishes_missing_from_rejected() {
        let mut registry = GuardRegistry::new();
        registry.register("closed", || false);

        assert_eq!(registry.evaluate("closed"), GuardVerdict::Rejected);
        assert_eq!(registry.evaluate("absent"), GuardVerdict::Missing);
        assert!(registry.contains("closed"));
        assert!(!registry.contains("absent"));
    }

    #[test]
    fn register_replaces_existing_guard() {
        let registry = GuardRegistry::new()
            .with("ready", || false)
            .with("ready", || true);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.evaluate("ready"), GuardVerdict::Allowed);
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let registry = Arc::new(GuardRegistry::new().with("ready", || true));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.evaluate("ready"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), GuardVerdict::Allowed);
        }
    }
}
