//! Services invoked for the lifetime of a state.
//!
//! Entering a state with `invoke` entries calls each service factory with an
//! [`Emitter`]. The factory starts whatever it needs (a task, a callback
//! registration) and returns an [`InvokeHandle`] that knows how to stop it.
//! Leaving the state stops the handle and silences the emitter; anything the
//! service manages to queue afterwards is discarded when it is dequeued.

use crate::core::{Event, StateId};
use crate::runtime::implementations::Service;
use crate::runtime::queue::{Envelope, InvocationId, Sender};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Sends events from an invoked service back to its interpreter.
#[derive(Clone)]
pub struct Emitter {
    tx: Sender,
    origin: InvocationId,
    alive: Arc<AtomicBool>,
}

impl Emitter {
    /// Queue an event for the interpreter.
    ///
    /// Returns `false` once the invocation has been stopped or the
    /// interpreter is gone; the event is dropped in that case.
    pub fn emit(&self, event: impl Into<Event>) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.tx
            .send(Envelope::Event {
                event: event.into(),
                origin: Some(self.origin),
            })
            .is_ok()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    pub fn origin(&self) -> InvocationId {
        self.origin
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("origin", &self.origin)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Stops a running service. Stopping is idempotent.
pub struct InvokeHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl InvokeHandle {
    pub fn new<F>(stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// A service with nothing to tear down.
    pub fn noop() -> Self {
        Self { stop: None }
    }

    /// Abort `task` on stop.
    pub fn task<T: Send + 'static>(task: JoinHandle<T>) -> Self {
        Self::new(move || task.abort())
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_none()
    }
}

impl fmt::Debug for InvokeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

struct LiveInvocation {
    state: StateId,
    id: String,
    handle: InvokeHandle,
    alive: Arc<AtomicBool>,
}

impl LiveInvocation {
    fn shutdown(mut self) {
        self.alive.store(false, Ordering::Release);
        self.handle.stop();
    }
}

/// Tracks running invocations by owning state.
#[derive(Default)]
pub(crate) struct InvocationManager {
    live: BTreeMap<InvocationId, LiveInvocation>,
    next_id: u64,
}

impl InvocationManager {
    /// Start `service` on behalf of `state`.
    pub(crate) fn start(
        &mut self,
        state: StateId,
        id: &str,
        service: &Service,
        tx: &Sender,
    ) -> InvocationId {
        let origin = InvocationId(self.next_id);
        self.next_id += 1;

        let alive = Arc::new(AtomicBool::new(true));
        let emitter = Emitter {
            tx: tx.clone(),
            origin,
            alive: Arc::clone(&alive),
        };
        let handle = service(emitter);
        debug!(invocation = %origin, id, state = %state, "Invocation started");

        self.live.insert(
            origin,
            LiveInvocation {
                state,
                id: id.to_string(),
                handle,
                alive,
            },
        );
        origin
    }

    /// Stop every invocation owned by `state`, most recent first.
    pub(crate) fn stop_state(&mut self, state: StateId) -> usize {
        let owned: Vec<InvocationId> = self
            .live
            .iter()
            .rev()
            .filter(|(_, invocation)| invocation.state == state)
            .map(|(origin, _)| *origin)
            .collect();

        for origin in &owned {
            if let Some(invocation) = self.live.remove(origin) {
                debug!(invocation = %origin, id = %invocation.id, "Invocation stopped");
                invocation.shutdown();
            }
        }
        owned.len()
    }

    /// Stop everything, most recent first.
    pub(crate) fn stop_all(&mut self) {
        while let Some((origin, invocation)) = self.live.pop_last() {
            debug!(invocation = %origin, id = %invocation.id, "Invocation stopped");
            invocation.shutdown();
        }
    }

    pub(crate) fn is_live(&self, origin: InvocationId) -> bool {
        self.live.contains_key(&origin)
    }

    /// Running invocations in start order.
    pub(crate) fn running(&self) -> impl Iterator<Item = (StateId, &str)> {
        self.live
            .values()
            .map(|invocation| (invocation.state, invocation.id.as_str()))
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}
