//! Core statechart types and logic.
//!
//! This module contains the pure functional core of the interpreter:
//! - The immutable state tree and its node types
//! - Active configurations and the hierarchy queries over them
//! - Transition selection and exit/entry planning
//! - Events and the bounded transition history
//!
//! Nothing in this module performs side effects; the `runtime` module applies
//! the steps computed here.

mod configuration;
mod event;
mod history;
mod state;
mod transition;

pub use configuration::{find_lca, resolve_initial_path, transition_domain, Configuration};
pub use event::{after_event_name, Event, INIT_EVENT, STOP_EVENT};
pub use history::{StateHistory, TransitionRecord, DEFAULT_HISTORY_LIMIT};
pub use state::{
    ActionId, Ancestors, Delay, InvokeSpec, ServiceId, StateId, StateNode, StateTree, Transition,
};
pub use transition::{plan, select, step, Step};
