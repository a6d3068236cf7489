//! The interpreter: applies steps computed by the core and owns every side
//! effect of a running machine.
//!
//! Events from the host, from invoked services and from elapsed delays all go
//! through one queue and are processed strictly one at a time. An event sent
//! while another is being processed waits until the current step, including
//! its actions and observer notifications, has finished.

use crate::core::{
    plan, select, ActionId, Configuration, Event, StateHistory, StateId, StateTree, Transition,
    TransitionRecord,
};
use crate::runtime::error::InterpreterError;
use crate::runtime::invocation::InvocationManager;
use crate::runtime::machine::Machine;
use crate::runtime::queue::{channel, Envelope, Receiver, Sender};
use crate::runtime::scheduler::DelayScheduler;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Lifecycle of an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Running,
    Stopped,
}

/// What an observer sees after each step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot<C> {
    /// Local keys of the active states below the root, outermost first.
    pub value: Vec<String>,
    pub context: C,
    pub status: Status,
    /// The event that produced this snapshot.
    pub event: Option<Event>,
}

impl<C> Snapshot<C> {
    /// Every active state as a dotted path, e.g. `["full", "full.playing"]`.
    pub fn to_strings(&self) -> Vec<String> {
        (1..=self.value.len())
            .map(|len| self.value[..len].join("."))
            .collect()
    }

    /// Whether the dotted `path` is active, e.g. `"full"` or `"full.playing"`.
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('.').collect();
        segments.len() <= self.value.len()
            && segments
                .iter()
                .zip(&self.value)
                .all(|(segment, key)| *segment == key)
    }

    pub fn leaf(&self) -> Option<&str> {
        self.value.last().map(String::as_str)
    }
}

/// Returned by [`Interpreter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Observer<C> = Box<dyn FnMut(&Snapshot<C>) + Send>;

/// Posts events to an interpreter from anywhere, e.g. another task.
///
/// Posted events are processed the next time the interpreter drains its
/// queue: on [`Interpreter::send`], [`Interpreter::process_pending`] or while
/// [`Interpreter::run`] is awaiting.
#[derive(Clone, Debug)]
pub struct MachineHandle {
    tx: Sender,
}

impl MachineHandle {
    /// Returns `false` if the interpreter is gone.
    pub fn send(&self, event: impl Into<Event>) -> bool {
        self.tx
            .send(Envelope::Event {
                event: event.into(),
                origin: None,
            })
            .is_ok()
    }

    /// Ask the interpreter to stop once it reaches this request.
    pub fn stop(&self) -> bool {
        self.tx.send(Envelope::Stop).is_ok()
    }
}

/// A running instance of a [`Machine`].
///
/// # Example
///
/// ```rust
/// use statewise::builder::{MachineBuilder, StateBuilder};
/// use statewise::runtime::{Implementations, Interpreter};
///
/// let machine = MachineBuilder::new("Light")
///     .initial("off")
///     .state(StateBuilder::new("off").on("flip", "on"))
///     .state(StateBuilder::new("on").on("flip", "off").entry("count"))
///     .build_machine(Implementations::new().action("count", |n: &mut u32, _| {
///         *n += 1;
///         Ok(())
///     }))
///     .unwrap();
///
/// let mut light = Interpreter::new(machine, 0u32);
/// light.start().unwrap();
/// light.send("flip").unwrap();
/// light.send("flip").unwrap();
/// light.send("flip").unwrap();
///
/// let snapshot = light.snapshot();
/// assert_eq!(snapshot.value, vec!["on"]);
/// assert_eq!(snapshot.context, 2);
/// ```
pub struct Interpreter<C> {
    session: Uuid,
    machine: Arc<Machine<C>>,
    context: C,
    configuration: Configuration,
    status: Status,
    tx: Sender,
    rx: Receiver,
    invocations: InvocationManager,
    scheduler: DelayScheduler,
    observers: Vec<(Subscription, Observer<C>)>,
    next_subscription: u64,
    history: StateHistory,
    last_event: Option<Event>,
}

impl<C: Clone> Interpreter<C> {
    pub fn new(machine: impl Into<Arc<Machine<C>>>, context: C) -> Self {
        let (tx, rx) = channel();
        Self {
            session: Uuid::new_v4(),
            machine: machine.into(),
            context,
            configuration: Configuration::default(),
            status: Status::NotStarted,
            tx,
            rx,
            invocations: InvocationManager::default(),
            scheduler: DelayScheduler::default(),
            observers: Vec::new(),
            next_subscription: 0,
            history: StateHistory::default(),
            last_event: None,
        }
    }

    /// Keep at most `limit` transition records.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = StateHistory::with_limit(limit);
        self
    }

    /// Unique id of this interpreter session.
    pub fn id(&self) -> Uuid {
        self.session
    }

    pub fn machine(&self) -> &Machine<C> {
        &self.machine
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn handle(&self) -> MachineHandle {
        MachineHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn snapshot(&self) -> Snapshot<C> {
        Snapshot {
            value: self.configuration.value(self.machine.tree()),
            context: self.context.clone(),
            status: self.status,
            event: self.last_event.clone(),
        }
    }

    /// Register an observer called after every handled event and on start
    /// and stop. Unhandled events do not notify.
    pub fn subscribe<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&Snapshot<C>) + Send + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((subscription, Box::new(observer)));
        subscription
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(id, _)| *id != subscription);
        self.observers.len() != before
    }

    /// Whether `event` would be handled in the current configuration.
    pub fn can(&self, event: &str) -> bool {
        self.status == Status::Running
            && select(self.machine.tree(), &self.configuration, event).is_some()
    }

    /// `(state id, invocation id)` for every running invocation.
    pub fn running_invocations(&self) -> Vec<(String, String)> {
        let tree = self.machine.tree();
        self.invocations
            .running()
            .map(|(state, id)| (tree.node(state).id().to_string(), id.to_string()))
            .collect()
    }

    /// `(state id, delay)` for every armed timer.
    pub fn armed_timers(&self) -> Vec<(String, Duration)> {
        let tree = self.machine.tree();
        self.scheduler
            .armed()
            .map(|(state, delay)| (tree.node(state).id().to_string(), delay))
            .collect()
    }

    /// Enter the initial configuration.
    ///
    /// Invocations and timers of the initial states are started first, then
    /// entry actions run outermost first with the `@init` event. Events sent
    /// before starting are processed afterwards, in order. Starting a running
    /// interpreter does nothing.
    pub fn start(&mut self) -> Result<(), InterpreterError> {
        match self.status {
            Status::Running => return Ok(()),
            Status::Stopped => return Err(InterpreterError::Terminated),
            Status::NotStarted => {}
        }

        let machine = Arc::clone(&self.machine);
        let tree = machine.tree();
        if tree.has_delays() {
            let runtime = Handle::try_current().map_err(|_| InterpreterError::NoRuntime {
                machine: tree.id().to_string(),
            })?;
            self.scheduler.set_runtime(runtime);
        }

        self.configuration = Configuration::initial(tree);
        self.status = Status::Running;
        let entered = self.configuration.states().to_vec();
        self.enter(&machine, &entered);

        info!(
            session = %self.session,
            machine = tree.id(),
            state = ?self.configuration.value(tree),
            "Interpreter started"
        );

        let actions: Vec<ActionId> = entered
            .iter()
            .flat_map(|state| tree.node(*state).entry().iter().copied())
            .collect();
        let event = Event::init();
        let result = self.run_actions(&machine, &actions, &event);
        self.last_event = Some(event);
        self.notify();

        result?;
        self.process_pending()
    }

    /// Queue `event` and process the queue to completion.
    ///
    /// Before [`start`](Self::start) the event is only queued. After
    /// [`stop`](Self::stop) it is dropped. An action failure is returned from
    /// the call that processed the failing step; events still queued behind
    /// it stay queued.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<(), InterpreterError> {
        let event = event.into();
        if self.status == Status::Stopped {
            debug!(session = %self.session, event = event.name(), "Dropping event sent after stop");
            return Ok(());
        }
        let _ = self.tx.send(Envelope::Event {
            event,
            origin: None,
        });
        self.process_pending()
    }

    /// Exit every active state and release all invocations and timers.
    ///
    /// Exit actions run innermost first with the `@stop` event after the
    /// bookkeeping is done. Stopping is final; stopping twice does nothing.
    pub fn stop(&mut self) -> Result<(), InterpreterError> {
        match self.status {
            Status::Stopped => return Ok(()),
            Status::NotStarted => {
                self.status = Status::Stopped;
                self.discard_pending();
                info!(session = %self.session, "Interpreter stopped before starting");
                self.notify();
                return Ok(());
            }
            Status::Running => {}
        }

        let machine = Arc::clone(&self.machine);
        let tree = machine.tree();
        let exited: Vec<StateId> = self.configuration.innermost_first().collect();
        self.exit(&exited);
        self.configuration = Configuration::default();
        self.status = Status::Stopped;
        self.discard_pending();
        info!(session = %self.session, machine = tree.id(), "Interpreter stopped");

        let actions: Vec<ActionId> = exited
            .iter()
            .flat_map(|state| tree.node(*state).exit().iter().copied())
            .collect();
        let event = Event::stop();
        let result = self.run_actions(&machine, &actions, &event);
        self.last_event = Some(event);
        self.notify();
        result
    }

    /// Process everything currently queued, including events queued by the
    /// steps themselves. Does nothing unless running.
    pub fn process_pending(&mut self) -> Result<(), InterpreterError> {
        while self.status == Status::Running {
            let Ok(envelope) = self.rx.try_recv() else {
                break;
            };
            self.process(envelope)?;
        }
        Ok(())
    }

    /// Wait for the next queued message, process it and then anything queued
    /// behind it.
    pub async fn next(&mut self) -> Result<(), InterpreterError> {
        match self.status {
            Status::NotStarted => return Err(InterpreterError::NotStarted),
            Status::Stopped => return Err(InterpreterError::Terminated),
            Status::Running => {}
        }
        if let Some(envelope) = self.rx.recv().await {
            self.process(envelope)?;
        }
        self.process_pending()
    }

    /// Process messages until the interpreter is stopped, typically through
    /// a [`MachineHandle`].
    pub async fn run(&mut self) -> Result<(), InterpreterError> {
        if self.status == Status::NotStarted {
            return Err(InterpreterError::NotStarted);
        }
        while self.status == Status::Running {
            self.next().await?;
        }
        Ok(())
    }

    fn process(&mut self, envelope: Envelope) -> Result<(), InterpreterError> {
        let machine = Arc::clone(&self.machine);
        let tree = machine.tree();

        match envelope {
            Envelope::Stop => self.stop(),
            Envelope::Event { event, origin } => {
                if let Some(origin) = origin {
                    if !self.invocations.is_live(origin) {
                        debug!(
                            session = %self.session,
                            event = event.name(),
                            invocation = %origin,
                            "Dropping event from stopped invocation"
                        );
                        return Ok(());
                    }
                }
                match select(tree, &self.configuration, event.name()) {
                    Some(transition) => self.take(&machine, transition, event),
                    None => {
                        debug!(
                            session = %self.session,
                            event = event.name(),
                            state = ?self.configuration.value(tree),
                            "Event not handled"
                        );
                        Ok(())
                    }
                }
            }
            Envelope::Timer(id) => {
                let Some((state, index)) = self.scheduler.take(id) else {
                    debug!(session = %self.session, timer = %id, "Dropping cancelled timer");
                    return Ok(());
                };
                if !self.configuration.contains(state) {
                    debug!(session = %self.session, timer = %id, "Dropping timer of inactive state");
                    return Ok(());
                }
                let delay = &tree.node(state).after()[index];
                self.take(&machine, delay.transition(), Event::new(delay.event()))
            }
        }
    }

    /// Apply one transition: exit bookkeeping, configuration swap, entry
    /// bookkeeping, then actions, history and observers.
    fn take(
        &mut self,
        machine: &Machine<C>,
        transition: &Transition,
        event: Event,
    ) -> Result<(), InterpreterError> {
        let tree = machine.tree();
        let step = plan(tree, &self.configuration, transition);
        let from = qualified(tree, &self.configuration);

        self.exit(&step.exit);
        self.configuration = step.configuration;
        self.enter(machine, &step.entry);

        debug!(
            session = %self.session,
            event = event.name(),
            source = tree.node(step.source).id(),
            state = ?self.configuration.value(tree),
            exited = step.exit.len(),
            entered = step.entry.len(),
            "Transition taken"
        );

        let result = self.run_actions(machine, &step.actions, &event);
        self.history.record(TransitionRecord {
            event: event.name().to_string(),
            from,
            to: qualified(tree, &self.configuration),
            timestamp: Utc::now(),
        });
        self.last_event = Some(event);
        self.notify();
        result
    }

    fn exit(&mut self, states: &[StateId]) {
        for state in states {
            self.invocations.stop_state(*state);
            self.scheduler.cancel_state(*state);
        }
    }

    fn enter(&mut self, machine: &Machine<C>, states: &[StateId]) {
        let tree = machine.tree();
        for state in states {
            let node = tree.node(*state);
            for invoke in node.invocations() {
                self.invocations
                    .start(*state, invoke.id(), machine.service(invoke.service()), &self.tx);
            }
            for (index, delay) in node.after().iter().enumerate() {
                self.scheduler.arm(*state, index, delay.delay(), &self.tx);
            }
        }
    }

    /// Run actions in order, stopping at the first failure.
    fn run_actions(
        &mut self,
        machine: &Machine<C>,
        actions: &[ActionId],
        event: &Event,
    ) -> Result<(), InterpreterError> {
        for id in actions {
            let name = machine.tree().action_name(*id);
            trace!(session = %self.session, action = name, event = event.name(), "Running action");

            if let Err(source) = (machine.action(*id))(&mut self.context, event) {
                warn!(
                    session = %self.session,
                    action = name,
                    event = event.name(),
                    error = %source,
                    "Action failed, skipping the rest of the step"
                );
                return Err(InterpreterError::ActionFailed {
                    action: name.to_string(),
                    event: event.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, observer) in &mut self.observers {
            observer(&snapshot);
        }
    }

    fn discard_pending(&mut self) {
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(session = %self.session, dropped, "Discarded queued messages");
        }
    }
}

fn qualified(tree: &StateTree, configuration: &Configuration) -> Vec<String> {
    configuration
        .ids(tree)
        .into_iter()
        .skip(1)
        .map(str::to_string)
        .collect()
}

impl<C> Drop for Interpreter<C> {
    fn drop(&mut self) {
        self.invocations.stop_all();
        self.scheduler.cancel_all();
    }
}

impl<C> fmt::Debug for Interpreter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("session", &self.session)
            .field("machine", &self.machine.id())
            .field("status", &self.status)
            .field("invocations", &self.invocations.len())
            .field("timers", &self.scheduler.len())
            .finish()
    }
}
