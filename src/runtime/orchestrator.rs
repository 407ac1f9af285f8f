//! Owning, wiring and running a group of machines.

use super::error::RuntimeError;
use super::runner::{mailbox, Mailbox, RunReport, Routes, Runner, RunnerState, RunnerStatus};
use crate::config::{EngineConfig, TransitionConfig};
use crate::core::{Event, GuardRegistry, MachineName, StateId};
use crate::machine::Machine;
use crate::snapshot::StateSnapshot;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// A group of machines and the static routes between them.
///
/// Routes are fixed once [`start`](Self::start) is called: a machine can
/// only forward events to peers it was wired to beforehand.
///
/// # Example
///
/// ```rust
/// use statewire::config::EngineConfig;
/// use statewire::core::GuardRegistry;
/// use statewire::runtime::Orchestrator;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut orchestrator = Orchestrator::new(EngineConfig::default(), Arc::new(GuardRegistry::new()));
/// orchestrator
///     .load_json("light", r#"{"initial_state": "Red", "transitions": {
///         "Red": {"next": "Green"}, "Green": {"next": "Yellow"}, "Yellow": {"next": "Red"}}}"#)
///     .unwrap();
///
/// let handle = orchestrator.start();
/// handle.seed("light", ["next", "next"]).unwrap();
/// handle.stop_all();
///
/// let reports = handle.await_all().await.unwrap();
/// assert_eq!(reports[0].final_state, "Yellow");
/// # }
/// ```
pub struct Orchestrator {
    run_id: Uuid,
    engine: EngineConfig,
    guards: Arc<GuardRegistry>,
    machines: BTreeMap<MachineName, Machine>,
    wiring: BTreeMap<MachineName, BTreeSet<MachineName>>,
    failures: Vec<RuntimeError>,
}

impl Orchestrator {
    pub fn new(engine: EngineConfig, guards: Arc<GuardRegistry>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            engine,
            guards,
            machines: BTreeMap::new(),
            wiring: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn guards(&self) -> &Arc<GuardRegistry> {
        &self.guards
    }

    /// Register an already constructed machine under its own id.
    pub fn add_machine(&mut self, machine: Machine) -> Result<(), RuntimeError> {
        let name = machine.id().clone();
        if self.machines.contains_key(&name) {
            return Err(RuntimeError::DuplicateMachine(name));
        }
        tracing::debug!(run = %self.run_id, machine = %name, "machine registered");
        // A later successful load supersedes an earlier failure under the same name.
        self.failures.retain(|failure| {
            !matches!(failure, RuntimeError::Config { machine, .. } if *machine == name)
        });
        self.machines.insert(name, machine);
        Ok(())
    }

    /// Build a machine from `config` using the shared guard registry.
    ///
    /// A malformed config is fatal for this machine only: the failure is
    /// returned, remembered for [`OrchestratorHandle::await_all`], and the
    /// remaining machines can still be loaded and started.
    pub fn load(
        &mut self,
        name: impl Into<MachineName>,
        config: TransitionConfig,
    ) -> Result<(), RuntimeError> {
        let name = name.into();
        match Machine::from_config(name.clone(), config, Arc::clone(&self.guards)) {
            Ok(machine) => self.add_machine(machine),
            Err(source) => {
                tracing::error!(run = %self.run_id, machine = %name, error = %source, "failed to load machine");
                let error = RuntimeError::Config {
                    machine: name,
                    source: Arc::new(source),
                };
                self.failures.push(error.clone());
                Err(error)
            }
        }
    }

    /// Parse `json` and [`load`](Self::load) it.
    pub fn load_json(
        &mut self,
        name: impl Into<MachineName>,
        json: &str,
    ) -> Result<(), RuntimeError> {
        let name = name.into();
        match TransitionConfig::from_json_str(json) {
            Ok(config) => self.load(name, config),
            Err(source) => {
                tracing::error!(run = %self.run_id, machine = %name, error = %source, "failed to parse machine config");
                let error = RuntimeError::Config {
                    machine: name,
                    source: Arc::new(source),
                };
                self.failures.push(error.clone());
                Err(error)
            }
        }
    }

    /// Allow `from` to forward events into `to`'s inbound channel.
    pub fn wire(
        &mut self,
        from: impl Into<MachineName>,
        to: impl Into<MachineName>,
    ) -> Result<(), RuntimeError> {
        let (from, to) = (from.into(), to.into());
        for name in [&from, &to] {
            if !self.machines.contains_key(name) {
                return Err(RuntimeError::UnknownMachine(name.clone()));
            }
        }
        tracing::debug!(run = %self.run_id, from = %from, to = %to, "wired");
        self.wiring.entry(from).or_default().insert(to);
        Ok(())
    }

    pub fn machine(&self, name: &str) -> Option<&Machine> {
        self.machines.get(name)
    }

    pub fn machine_names(&self) -> impl Iterator<Item = &MachineName> + '_ {
        self.machines.keys()
    }

    /// Peers `name` may forward to.
    pub fn peers_of(&self, name: &str) -> impl Iterator<Item = &MachineName> + '_ {
        self.wiring.get(name).into_iter().flatten()
    }

    /// Spawn one runner task per machine.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> OrchestratorHandle {
        let Self {
            run_id,
            engine,
            machines,
            wiring,
            failures,
            ..
        } = self;

        let channels: BTreeMap<MachineName, _> = machines
            .keys()
            .map(|name| (name.clone(), mailbox()))
            .collect();
        let mailboxes: BTreeMap<MachineName, Mailbox> = channels
            .iter()
            .map(|(name, (tx, _))| (name.clone(), tx.clone()))
            .collect();

        tracing::info!(run = %run_id, machines = machines.len(), "starting machines");

        let mut status = BTreeMap::new();
        let mut tasks = Vec::new();
        let mut inboxes: BTreeMap<MachineName, _> = channels
            .into_iter()
            .map(|(name, (_, rx))| (name, rx))
            .collect();

        for (name, machine) in machines {
            let Some(inbox) = inboxes.remove(&name) else {
                continue;
            };
            let mut routes = Routes::new(name.clone());
            for peer in wiring.get(&name).into_iter().flatten() {
                if let Some(tx) = mailboxes.get(peer) {
                    routes.insert(peer.clone(), tx.clone());
                }
            }

            let (runner, observer) = Runner::new(machine, inbox, routes, engine.clone());
            let span = tracing::info_span!("runner", run = %run_id, machine = %name);
            let task = tokio::spawn(runner.run().instrument(span));
            status.insert(name.clone(), observer);
            tasks.push((name, task));
        }

        OrchestratorHandle {
            run_id,
            mailboxes,
            status,
            tasks,
            failures,
        }
    }
}

/// Control surface over running machines.
pub struct OrchestratorHandle {
    run_id: Uuid,
    mailboxes: BTreeMap<MachineName, Mailbox>,
    status: BTreeMap<MachineName, watch::Receiver<RunnerStatus>>,
    tasks: Vec<(MachineName, JoinHandle<RunReport>)>,
    failures: Vec<RuntimeError>,
}

impl OrchestratorHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Enqueue one event on `name`'s inbound channel.
    pub fn send(&self, name: &str, event: impl Into<Event>) -> Result<(), RuntimeError> {
        let mailbox = self
            .mailboxes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownMachine(MachineName::new(name)))?;
        mailbox
            .send(event.into())
            .map_err(|_| RuntimeError::ChannelClosed(MachineName::new(name)))
    }

    /// Enqueue events in order on `name`'s inbound channel.
    pub fn seed<I, E>(&self, name: &str, events: I) -> Result<(), RuntimeError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Event>,
    {
        for event in events {
            self.send(name, event)?;
        }
        Ok(())
    }

    /// Jump `name` to a declared state, bypassing guards.
    ///
    /// An undeclared state is logged by the runner and ignored.
    pub fn goto(&self, name: &str, state: impl Into<StateId>) -> Result<(), RuntimeError> {
        self.send(name, Event::Goto(state.into()))
    }

    /// Undo `steps` history entries on `name`.
    pub fn goback(&self, name: &str, steps: usize) -> Result<(), RuntimeError> {
        self.send(name, Event::GoBack(steps))
    }

    /// Return `name` to its initial state.
    pub fn reset(&self, name: &str) -> Result<(), RuntimeError> {
        self.send(name, Event::Reset)
    }

    /// Ask one machine to stop.
    pub fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.send(name, Event::Terminate)
    }

    /// Broadcast `Terminate` to every machine.
    pub fn stop_all(&self) {
        tracing::info!(run = %self.run_id, "stopping all machines");
        for (name, mailbox) in &self.mailboxes {
            if mailbox.send(Event::Terminate).is_err() {
                tracing::debug!(run = %self.run_id, machine = %name, "machine already stopped");
            }
        }
    }

    /// Latest snapshot published by `name`'s runner.
    pub fn snapshot(&self, name: &str) -> Option<StateSnapshot> {
        self.status
            .get(name)
            .map(|status| status.borrow().snapshot.clone())
    }

    pub fn runner_state(&self, name: &str) -> Option<RunnerState> {
        self.status.get(name).map(|status| status.borrow().state)
    }

    /// Wait until `name`'s published status satisfies `predicate`.
    ///
    /// Fails with `ChannelClosed` if the runner stops first without ever
    /// satisfying it.
    pub async fn wait_until<F>(&self, name: &str, mut predicate: F) -> Result<StateSnapshot, RuntimeError>
    where
        F: FnMut(&RunnerStatus) -> bool,
    {
        let mut status = self
            .status
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownMachine(MachineName::new(name)))?;
        let matched = status
            .wait_for(|current| predicate(current))
            .await
            .map_err(|_| RuntimeError::ChannelClosed(MachineName::new(name)))?;
        Ok(matched.snapshot.clone())
    }

    /// Wait until `name` reaches `state`.
    pub async fn wait_for_state(&self, name: &str, state: &str) -> Result<StateSnapshot, RuntimeError> {
        self.wait_until(name, |status| status.snapshot.current_state == state)
            .await
    }

    /// Wait for every runner to stop.
    ///
    /// Runners are never cancelled here; call [`stop_all`](Self::stop_all)
    /// first or this waits for them to stop on their own. Returns every
    /// report, or the first fatal error: a load failure recorded before
    /// start, else the first runner task that failed.
    pub async fn await_all(self) -> Result<Vec<RunReport>, RuntimeError> {
        let Self {
            run_id,
            tasks,
            mut failures,
            ..
        } = self;

        let mut reports = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(join_error) => {
                    tracing::error!(run = %run_id, machine = %name, error = %join_error, "runner task failed");
                    failures.push(RuntimeError::TaskFailed {
                        machine: name,
                        message: join_error.to_string(),
                    });
                }
            }
        }

        match failures.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(reports),
        }
    }
}
