//! Host-supplied action and service tables.

use crate::builder::Catalog;
use crate::core::Event;
use crate::runtime::error::ActionError;
use crate::runtime::invocation::{Emitter, InvokeHandle};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A side-effecting action. Receives the interpreter's context and the event
/// being processed.
pub type Action<C> = Arc<dyn Fn(&mut C, &Event) -> Result<(), ActionError> + Send + Sync>;

/// Factory for an invoked service. Called with an [`Emitter`] each time the
/// owning state is entered; the returned handle is stopped when it exits.
pub type Service = Arc<dyn Fn(Emitter) -> InvokeHandle + Send + Sync>;

/// Named actions and services a definition is resolved against.
///
/// # Example
///
/// ```rust
/// use statewise::runtime::{Implementations, InvokeHandle};
///
/// let implementations = Implementations::<u32>::new()
///     .action("count", |count, _event| {
///         *count += 1;
///         Ok(())
///     })
///     .service("ticker", |_emitter| InvokeHandle::noop());
/// ```
pub struct Implementations<C> {
    actions: HashMap<String, Action<C>>,
    services: HashMap<String, Service>,
}

impl<C> Implementations<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            services: HashMap::new(),
        }
    }

    /// Register an action under `name`, replacing any previous one.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut C, &Event) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Register a service factory under `name`, replacing any previous one.
    pub fn service<F>(mut self, name: impl Into<String>, service: F) -> Self
    where
        F: Fn(Emitter) -> InvokeHandle + Send + Sync + 'static,
    {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    pub(crate) fn get_action(&self, name: &str) -> Option<&Action<C>> {
        self.actions.get(name)
    }

    pub(crate) fn get_service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }
}

impl<C> Default for Implementations<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Catalog for Implementations<C> {
    fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

impl<C> fmt::Debug for Implementations<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementations")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
