//! Definitions and the construction pass that validates them.
//!
//! A machine is described by a serializable [`MachineConfig`], written by
//! hand as JSON or assembled with the fluent [`MachineBuilder`] and
//! [`StateBuilder`]. [`StateTree::build`](crate::core::StateTree::build)
//! turns a definition into an immutable tree, rejecting it as a whole when
//! anything is wrong.

pub mod config;
pub mod error;
pub mod machine;
pub mod state;
pub mod tree;

pub use config::{InvokeConfig, MachineConfig, OneOrMany, StateConfig, TransitionConfig};
pub use error::{BuildError, ConfigError};
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use tree::Catalog;
