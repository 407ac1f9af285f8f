//! Per-machine event loop.

use super::error::RuntimeError;
use crate::config::EngineConfig;
use crate::core::{Event, EventId, Forward, MachineName, StateHistory, StateId, StateTimeout};
use crate::machine::{Machine, TransitionOutcome};
use crate::snapshot::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

/// Sending half of a machine's inbound channel.
pub type Mailbox = mpsc::UnboundedSender<Event>;

/// Receiving half of a machine's inbound channel.
pub type Inbox = mpsc::UnboundedReceiver<Event>;

/// Create an inbound channel.
pub fn mailbox() -> (Mailbox, Inbox) {
    mpsc::unbounded_channel()
}

/// Lifecycle of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerState {
    /// Created, loop not entered yet.
    Idle,
    /// Waiting for or processing events.
    Running,
    /// `Terminate` observed, finishing up.
    Draining,
    /// Loop exited.
    Stopped,
}

/// What a runner publishes after every change.
#[derive(Clone, Debug)]
pub struct RunnerStatus {
    pub state: RunnerState,
    pub snapshot: StateSnapshot,
}

/// Outbound routes from one machine to the peers it is wired to.
#[derive(Clone, Debug)]
pub struct Routes {
    from: MachineName,
    peers: BTreeMap<MachineName, Mailbox>,
}

impl Routes {
    pub fn new(from: impl Into<MachineName>) -> Self {
        Self {
            from: from.into(),
            peers: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, peer: impl Into<MachineName>, mailbox: Mailbox) {
        self.peers.insert(peer.into(), mailbox);
    }

    pub fn peers(&self) -> impl Iterator<Item = &MachineName> + '_ {
        self.peers.keys()
    }

    /// Deliver `event` to `peer`'s inbound channel.
    pub fn send_to(&self, peer: &MachineName, event: EventId) -> Result<(), RuntimeError> {
        let mailbox = self
            .peers
            .get(peer)
            .ok_or_else(|| RuntimeError::PeerUnavailable {
                from: self.from.clone(),
                to: peer.clone(),
            })?;
        mailbox
            .send(Event::Named(event))
            .map_err(|_| RuntimeError::ChannelClosed(peer.clone()))
    }
}

/// Summary returned when a runner stops.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub machine: MachineName,
    pub final_state: StateId,
    pub history: StateHistory,
    /// Named inbound events in arrival order.
    pub received: Vec<EventId>,
    /// Transitions that fired, including timeout transitions.
    pub applied: usize,
    /// Timeouts that expired, whether or not they caused a transition.
    pub timeouts: usize,
    /// Events still queued behind `Terminate`, discarded unprocessed.
    pub discarded: usize,
}

enum Wake {
    Inbound(Option<Event>),
    Timeout(StateTimeout),
}

/// Timeout armed when the current state was entered.
struct Timer {
    deadline: Instant,
    timeout: StateTimeout,
}

/// Drives one [`Machine`] from its inbound channel.
///
/// Each iteration waits for the next inbound event, raced against the
/// deadline of the current state's shortest timeout. The deadline is set
/// when a state is entered and survives events that leave the state
/// unchanged, so only a real transition (or a history command) restarts it.
///
/// A state with no timeout waits on its inbox indefinitely; that idle
/// condition ends only with an inbound event, `Terminate`, or every sender
/// being dropped.
pub struct Runner {
    machine: Machine,
    inbox: Inbox,
    routes: Routes,
    engine: EngineConfig,
    status: watch::Sender<RunnerStatus>,
    report: RunReport,
}

impl Runner {
    pub fn new(
        machine: Machine,
        inbox: Inbox,
        routes: Routes,
        engine: EngineConfig,
    ) -> (Self, watch::Receiver<RunnerStatus>) {
        let (status, observer) = watch::channel(RunnerStatus {
            state: RunnerState::Idle,
            snapshot: machine.snapshot(),
        });
        let report = RunReport {
            machine: machine.id().clone(),
            final_state: machine.current_state().clone(),
            history: machine.history().clone(),
            received: Vec::new(),
            applied: 0,
            timeouts: 0,
            discarded: 0,
        };
        let runner = Self {
            machine,
            inbox,
            routes,
            engine,
            status,
            report,
        };
        (runner, observer)
    }

    /// Run until `Terminate` arrives or every sender is gone.
    pub async fn run(mut self) -> RunReport {
        self.publish(RunnerState::Running);
        tracing::info!(machine = %self.machine.id(), state = %self.machine.current_state(), "runner started");

        let mut timer = self.arm();

        loop {
            match self.next_wake(timer.as_ref()).await {
                Wake::Inbound(None) => {
                    tracing::debug!(machine = %self.machine.id(), "all senders dropped");
                    break;
                }
                Wake::Inbound(Some(Event::Terminate)) => {
                    self.publish(RunnerState::Draining);
                    break;
                }
                Wake::Inbound(Some(Event::Named(event))) => {
                    self.report.received.push(event.clone());
                    let outcome = self.machine.apply(event);
                    if self.settle(outcome) {
                        timer = self.arm();
                    }
                }
                Wake::Inbound(Some(Event::Goto(state))) => {
                    if self.machine.goto(state).is_ok() {
                        self.publish(RunnerState::Running);
                        timer = self.arm();
                    }
                }
                Wake::Inbound(Some(Event::GoBack(steps))) => {
                    self.machine.goback(steps);
                    self.publish(RunnerState::Running);
                    timer = self.arm();
                }
                Wake::Inbound(Some(Event::Reset)) => {
                    self.machine.reset();
                    self.publish(RunnerState::Running);
                    timer = self.arm();
                }
                Wake::Timeout(timeout) => {
                    self.report.timeouts += 1;
                    let event = self
                        .engine
                        .timeout_event_for(self.machine.table(), &timeout);
                    tracing::info!(
                        machine = %self.machine.id(),
                        state = %self.machine.current_state(),
                        after_ms = timeout.after.as_millis() as u64,
                        event = %event,
                        "state timeout expired"
                    );
                    let outcome = self.machine.apply(event);
                    // With no rule for the timeout event the state cannot
                    // change, so the timer stays off until it does.
                    let disarm = matches!(outcome, TransitionOutcome::Invalid { .. });
                    self.settle(outcome);
                    timer = if disarm { None } else { self.arm() };
                }
            }
        }

        self.inbox.close();
        while self.inbox.try_recv().is_ok() {
            self.report.discarded += 1;
        }
        if self.report.discarded > 0 {
            tracing::debug!(
                machine = %self.machine.id(),
                discarded = self.report.discarded,
                "discarded events queued after terminate"
            );
        }

        self.report.final_state = self.machine.current_state().clone();
        self.report.history = self.machine.history().clone();
        self.publish(RunnerState::Stopped);
        tracing::info!(
            machine = %self.machine.id(),
            state = %self.report.final_state,
            applied = self.report.applied,
            "runner stopped"
        );
        self.report
    }

    /// Start the current state's shortest timeout, if it has one.
    fn arm(&self) -> Option<Timer> {
        let timeout = self.machine.active_timeout()?.clone();
        tracing::debug!(
            machine = %self.machine.id(),
            state = %self.machine.current_state(),
            after_ms = timeout.after.as_millis() as u64,
            "timeout armed"
        );
        Some(Timer {
            deadline: Instant::now() + timeout.after,
            timeout,
        })
    }

    async fn next_wake(&mut self, timer: Option<&Timer>) -> Wake {
        match timer {
            Some(timer) => match time::timeout_at(timer.deadline, self.inbox.recv()).await {
                Ok(event) => Wake::Inbound(event),
                Err(_) => Wake::Timeout(timer.timeout.clone()),
            },
            None => Wake::Inbound(self.inbox.recv().await),
        }
    }

    /// Record an outcome; true when the machine moved.
    fn settle(&mut self, outcome: TransitionOutcome) -> bool {
        let TransitionOutcome::Applied(applied) = outcome else {
            return false;
        };
        self.report.applied += 1;
        if let Some(forward) = applied.forward {
            self.forward(&forward);
        }
        self.publish(RunnerState::Running);
        true
    }

    fn forward(&self, forward: &Forward) {
        let machine = self.machine.id();
        let targets: Vec<MachineName> = match &forward.machine {
            Some(peer) => vec![peer.clone()],
            None => self.routes.peers().cloned().collect(),
        };
        if targets.is_empty() {
            tracing::warn!(
                machine = %machine,
                event = %forward.event,
                "forward has no wired peer, dropping"
            );
            return;
        }

        for peer in targets {
            match self.routes.send_to(&peer, forward.event.clone()) {
                Ok(()) => tracing::info!(
                    machine = %machine,
                    peer = %peer,
                    event = %forward.event,
                    "forwarded event"
                ),
                Err(error) => tracing::warn!(
                    machine = %machine,
                    peer = %peer,
                    event = %forward.event,
                    %error,
                    "dropping forwarded event"
                ),
            }
        }
    }

    fn publish(&self, state: RunnerState) {
        // Nobody watching is fine.
        self.status.send_replace(RunnerStatus {
            state,
            snapshot: self.machine.snapshot(),
        });
    }
}
