//! The imperative shell around the core.
//!
//! A [`Machine`] binds a validated state tree to the host's actions and
//! services. An [`Interpreter`] runs one instance of it: it owns the context,
//! the event queue, running invocations and delay timers, and applies the
//! steps computed by [`crate::core`].

mod error;
mod implementations;
mod interpreter;
mod invocation;
mod machine;
mod queue;
mod scheduler;

pub use error::{ActionError, InterpreterError};
pub use implementations::{Action, Implementations, Service};
pub use interpreter::{Interpreter, MachineHandle, Snapshot, Status, Subscription};
pub use invocation::{Emitter, InvokeHandle};
pub use machine::Machine;
pub use queue::{InvocationId, TimerId};
