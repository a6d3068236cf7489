//! Messages delivered to an interpreter's event queue.

use crate::core::Event;
use std::fmt;
use tokio::sync::mpsc;

/// Identifies one running invocation. Never reused within an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvocationId(pub(crate) u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation-{}", self.0)
    }
}

/// Identifies one armed delay timer. Never reused within an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) enum Envelope {
    /// An event from the host (`origin: None`) or from an invocation.
    Event {
        event: Event,
        origin: Option<InvocationId>,
    },
    /// A delay timer elapsed.
    Timer(TimerId),
    Stop,
}

pub(crate) type Sender = mpsc::UnboundedSender<Envelope>;
pub(crate) type Receiver = mpsc::UnboundedReceiver<Envelope>;

pub(crate) fn channel() -> (Sender, Receiver) {
    mpsc::unbounded_channel()
}
