//! Statewise: a hierarchical statechart interpreter
//!
//! Statewise follows a "pure core, imperative shell" split. The core computes
//! what a step does (which transition handles an event, which states are
//! exited and entered, which actions run in what order) without touching
//! anything. The runtime applies those steps: it runs actions against a
//! context, starts and stops invoked services, and arms delay timers.
//!
//! # Core Concepts
//!
//! - **Definitions**: a machine is described as JSON or with fluent builders
//!   and validated as a whole before anything runs
//! - **State tree**: nested states with one active child each; the active
//!   configuration is a single root-to-leaf path
//! - **Steps**: an event is handled by the innermost active state that
//!   declares it; exits run innermost first, entries outermost first
//! - **Invocations and delays**: services and timers live exactly as long as
//!   the state that owns them
//! - **Run to completion**: events are processed one at a time, in order
//!
//! # Example
//!
//! ```rust
//! use statewise::builder::{MachineBuilder, StateBuilder, TransitionConfig};
//! use statewise::runtime::{Implementations, Interpreter};
//!
//! let machine = MachineBuilder::new("Door")
//!     .initial("closed")
//!     .state(StateBuilder::new("closed").on("open", "opened"))
//!     .state(
//!         StateBuilder::new("opened")
//!             .on("close", TransitionConfig::to("closed").action("creak")),
//!     )
//!     .build_machine(Implementations::new().action("creak", |creaks: &mut u32, _| {
//!         *creaks += 1;
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let mut door = Interpreter::new(machine, 0);
//! door.start().unwrap();
//! door.send("open").unwrap();
//! door.send("close").unwrap();
//!
//! assert!(door.snapshot().matches("closed"));
//! assert_eq!(*door.context(), 1);
//! ```

pub mod builder;
pub mod core;
pub mod runtime;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use crate::builder::{BuildError, MachineBuilder, MachineConfig, StateBuilder, TransitionConfig};
pub use crate::core::{Event, StateHistory};
pub use crate::runtime::{
    ActionError, Emitter, Implementations, InterpreterError, Interpreter, InvokeHandle, Machine,
    MachineHandle, Snapshot, Status,
};
