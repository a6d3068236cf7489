//! Delay timers for `after` transitions.

use crate::core::StateId;
use crate::runtime::queue::{Envelope, Sender, TimerId};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct ArmedTimer {
    state: StateId,
    index: usize,
    delay: Duration,
    task: JoinHandle<()>,
}

/// Arms one tokio sleep per delayed transition of an entered state and
/// cancels them when the state exits.
///
/// A timer that fires posts [`Envelope::Timer`] to the queue. Firing does not
/// disarm it; [`DelayScheduler::take`] does that when the envelope is
/// processed, so a timer cancelled while its envelope is in flight is
/// recognized as stale.
#[derive(Default)]
pub(crate) struct DelayScheduler {
    timers: BTreeMap<TimerId, ArmedTimer>,
    next_id: u64,
    runtime: Option<Handle>,
}

impl DelayScheduler {
    pub(crate) fn set_runtime(&mut self, runtime: Handle) {
        self.runtime = Some(runtime);
    }

    /// Arm the `index`th delayed transition of `state`.
    pub(crate) fn arm(
        &mut self,
        state: StateId,
        index: usize,
        delay: Duration,
        tx: &Sender,
    ) -> Option<TimerId> {
        let Some(runtime) = &self.runtime else {
            warn!(state = %state, ?delay, "No runtime to arm delay timer on");
            return None;
        };

        let id = TimerId(self.next_id);
        self.next_id += 1;

        let tx = tx.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Envelope::Timer(id));
        });
        debug!(timer = %id, state = %state, ?delay, "Timer armed");

        self.timers.insert(
            id,
            ArmedTimer {
                state,
                index,
                delay,
                task,
            },
        );
        Some(id)
    }

    /// Cancel every timer armed for `state`.
    pub(crate) fn cancel_state(&mut self, state: StateId) -> usize {
        let owned: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.state == state)
            .map(|(id, _)| *id)
            .collect();

        for id in &owned {
            if let Some(timer) = self.timers.remove(id) {
                timer.task.abort();
                debug!(timer = %id, state = %state, "Timer cancelled");
            }
        }
        owned.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, timer) in std::mem::take(&mut self.timers) {
            timer.task.abort();
        }
    }

    /// Disarm a fired timer, returning its state and transition index.
    /// `None` if it was cancelled after firing.
    pub(crate) fn take(&mut self, id: TimerId) -> Option<(StateId, usize)> {
        self.timers
            .remove(&id)
            .map(|timer| (timer.state, timer.index))
    }

    /// Armed timers in arming order.
    pub(crate) fn armed(&self) -> impl Iterator<Item = (StateId, Duration)> + '_ {
        self.timers.values().map(|timer| (timer.state, timer.delay))
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.len()
    }
}
