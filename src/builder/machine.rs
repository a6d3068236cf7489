//! Builder for complete machine definitions.

use crate::builder::config::{MachineConfig, TransitionConfig};
use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::runtime::{Implementations, Machine};
use std::time::Duration;

/// Builder for machine definitions with a fluent API.
///
/// The root state is configured directly on the machine builder; nested
/// states are added with [`StateBuilder`].
///
/// # Example
///
/// ```rust
/// use statewise::builder::{MachineBuilder, StateBuilder};
///
/// let config = MachineBuilder::new("Light")
///     .initial("off")
///     .state(StateBuilder::new("off").on("flip", "on"))
///     .state(StateBuilder::new("on").on("flip", "off"))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.root.states.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct MachineBuilder {
    id: String,
    root: StateBuilder,
}

impl MachineBuilder {
    /// Create a builder for the machine `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root: StateBuilder::new(id.clone()),
            id,
        }
    }

    /// Set the initial top-level state.
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.root = self.root.initial(key);
        self
    }

    /// Add an action run when the machine starts.
    pub fn entry(mut self, action: impl Into<String>) -> Self {
        self.root = self.root.entry(action);
        self
    }

    /// Add an action run when the machine stops.
    pub fn exit(mut self, action: impl Into<String>) -> Self {
        self.root = self.root.exit(action);
        self
    }

    /// Add a machine-wide transition, handled when no active state handles
    /// `event` itself.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.root = self.root.on(event, transition);
        self
    }

    pub fn after(mut self, delay: Duration, transition: impl Into<TransitionConfig>) -> Self {
        self.root = self.root.after(delay, transition);
        self
    }

    /// Invoke a service for the whole lifetime of the machine.
    pub fn invoke(mut self, src: impl Into<String>) -> Self {
        self.root = self.root.invoke(src);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.root = self.root.description(description);
        self
    }

    /// Add a top-level state.
    pub fn state(mut self, state: StateBuilder) -> Self {
        self.root = self.root.state(state);
        self
    }

    /// Build the definition.
    /// Returns an error for defects visible without the implementation
    /// tables: duplicate state keys and duplicate delays.
    pub fn build(self) -> Result<MachineConfig, BuildError> {
        let mut errors = Vec::new();
        let root = self.root.finish(&self.id, &mut errors);
        if !errors.is_empty() {
            return Err(BuildError::Invalid(errors));
        }
        Ok(MachineConfig { id: self.id, root })
    }

    /// Build the definition and resolve it against `implementations`.
    pub fn build_machine<C>(
        self,
        implementations: Implementations<C>,
    ) -> Result<Machine<C>, BuildError> {
        Machine::new(&self.build()?, implementations)
    }
}
