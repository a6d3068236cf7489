//! Builder for a single state and its nested states.

use crate::builder::config::{InvokeConfig, OneOrMany, StateConfig, TransitionConfig};
use crate::builder::error::ConfigError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Builder for one state with a fluent API.
///
/// Nothing is validated until the enclosing [`MachineBuilder`] is built;
/// duplicate keys and delays are reported then, alongside every other defect.
///
/// [`MachineBuilder`]: crate::builder::MachineBuilder
#[derive(Clone, Debug)]
pub struct StateBuilder {
    key: String,
    initial: Option<String>,
    entry: Vec<String>,
    exit: Vec<String>,
    on: Vec<(String, TransitionConfig)>,
    after: Vec<(Duration, TransitionConfig)>,
    invoke: Vec<InvokeConfig>,
    description: Option<String>,
    states: Vec<StateBuilder>,
}

impl StateBuilder {
    /// Create a builder for the state named `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            initial: None,
            entry: Vec::new(),
            exit: Vec::new(),
            on: Vec::new(),
            after: Vec::new(),
            invoke: Vec::new(),
            description: None,
            states: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Set the initial child (required for compound states).
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Add an entry action.
    pub fn entry(mut self, action: impl Into<String>) -> Self {
        self.entry.push(action.into());
        self
    }

    /// Add an exit action.
    pub fn exit(mut self, action: impl Into<String>) -> Self {
        self.exit.push(action.into());
        self
    }

    /// Add a candidate transition for `event`. Candidates are tried in the
    /// order they are added.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.on.push((event.into(), transition.into()));
        self
    }

    /// Add a transition taken after `delay` in this state. Delays are kept
    /// in whole milliseconds; a finer `delay` fails the build with
    /// [`ConfigError::InvalidDelay`].
    pub fn after(mut self, delay: Duration, transition: impl Into<TransitionConfig>) -> Self {
        self.after.push((delay, transition.into()));
        self
    }

    /// Invoke the service `src` while this state is active.
    pub fn invoke(mut self, src: impl Into<String>) -> Self {
        self.invoke.push(InvokeConfig {
            src: src.into(),
            id: None,
        });
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Nest a child state.
    pub fn state(mut self, child: StateBuilder) -> Self {
        self.states.push(child);
        self
    }

    /// Convert into a definition, recording builder-level defects under the
    /// qualified id `id`.
    pub(crate) fn finish(self, id: &str, errors: &mut Vec<ConfigError>) -> StateConfig {
        let mut on: BTreeMap<String, OneOrMany<TransitionConfig>> = BTreeMap::new();
        for (event, transition) in self.on {
            on.entry(event).or_default().push(transition);
        }

        let mut after = BTreeMap::new();
        for (delay, transition) in self.after {
            if delay.subsec_nanos() % 1_000_000 != 0 {
                errors.push(ConfigError::InvalidDelay {
                    state: id.to_string(),
                    key: format!("{delay:?}"),
                });
                continue;
            }
            let millis = delay.as_millis();
            if after.insert(millis.to_string(), transition).is_some() {
                errors.push(ConfigError::DuplicateDelay {
                    state: id.to_string(),
                    delay_ms: u64::try_from(millis).unwrap_or(u64::MAX),
                });
            }
        }

        let mut states = BTreeMap::new();
        for child in self.states {
            let key = child.key.clone();
            let child_id = format!("{id}.{key}");
            let config = child.finish(&child_id, errors);
            if states.insert(key.clone(), config).is_some() {
                errors.push(ConfigError::DuplicateState {
                    parent: id.to_string(),
                    key,
                });
            }
        }

        StateConfig {
            initial: self.initial,
            states,
            entry: self.entry.into(),
            exit: self.exit.into(),
            on,
            after,
            invoke: self.invoke.into(),
            description: self.description,
        }
    }
}
