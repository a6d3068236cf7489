//! Construction pass from a [`MachineConfig`] to a validated [`StateTree`].
//!
//! Every defect is collected with `Validation` instead of stopping at the
//! first one, so a broken definition is reported in a single pass. A tree is
//! only returned when the whole definition is valid.

use crate::builder::config::{MachineConfig, StateConfig, TransitionConfig};
use crate::builder::error::{BuildError, ConfigError};
use crate::core::{
    after_event_name, ActionId, Delay, InvokeSpec, ServiceId, StateId, StateNode, StateTree,
    Transition,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Checked<T> = Validation<T, NonEmptyVec<ConfigError>>;

/// Names the host can resolve actions and services against.
pub trait Catalog {
    fn has_action(&self, name: &str) -> bool;
    fn has_service(&self, name: &str) -> bool;
}

impl StateTree {
    /// Build and validate a tree, resolving every target, action and service
    /// reference up front.
    pub fn build(config: &MachineConfig, catalog: &dyn Catalog) -> Result<StateTree, BuildError> {
        let mut builder = TreeBuilder::new(config, catalog);
        builder.allocate_all();
        builder.resolve_all();
        builder.finish()
    }
}

struct TreeBuilder<'c> {
    config: &'c MachineConfig,
    catalog: &'c dyn Catalog,
    nodes: Vec<StateNode>,
    sources: Vec<&'c StateConfig>,
    actions: Vec<String>,
    action_index: HashMap<String, ActionId>,
    services: Vec<String>,
    service_index: HashMap<String, ServiceId>,
    failures: Vec<Checked<()>>,
}

impl<'c> TreeBuilder<'c> {
    fn new(config: &'c MachineConfig, catalog: &'c dyn Catalog) -> Self {
        Self {
            config,
            catalog,
            nodes: Vec::new(),
            sources: Vec::new(),
            actions: Vec::new(),
            action_index: HashMap::new(),
            services: Vec::new(),
            service_index: HashMap::new(),
            failures: Vec::new(),
        }
    }

    /// Keep a successful value, remember a failure.
    fn check<T>(&mut self, validation: Checked<T>) -> Option<T> {
        match validation {
            Validation::Success(value) => Some(value),
            Validation::Failure(errors) => {
                self.failures.push(Validation::Failure(errors));
                None
            }
        }
    }

    fn reject(&mut self, error: ConfigError) {
        self.failures.push(Validation::fail(error));
    }

    fn allocate_all(&mut self) {
        let config = self.config;
        if !is_valid_key(&config.id) {
            self.reject(ConfigError::InvalidMachineId {
                id: config.id.clone(),
            });
        }
        self.allocate(None, &config.id, config.id.clone(), &config.root);
    }

    /// Lay nodes out in pre-order, wiring parents and children.
    fn allocate(
        &mut self,
        parent: Option<StateId>,
        key: &str,
        id: String,
        source: &'c StateConfig,
    ) -> StateId {
        let state = StateId(self.nodes.len());
        let depth = parent.map_or(0, |p| self.nodes[p.0].depth + 1);
        self.nodes.push(StateNode {
            key: key.to_string(),
            id,
            parent,
            children: Vec::new(),
            initial: None,
            depth,
            entry: Vec::new(),
            exit: Vec::new(),
            on: BTreeMap::new(),
            after: Vec::new(),
            invoke: Vec::new(),
            description: source.description.clone(),
        });
        self.sources.push(source);

        for (child_key, child) in &source.states {
            let parent_id = self.nodes[state.0].id.clone();
            if !is_valid_key(child_key) {
                self.reject(ConfigError::InvalidStateKey {
                    parent: parent_id.clone(),
                    key: child_key.clone(),
                });
            }
            let child_id = format!("{parent_id}.{child_key}");
            let child_state = self.allocate(Some(state), child_key, child_id, child);
            self.nodes[state.0].children.push(child_state);
        }
        state
    }

    fn resolve_all(&mut self) {
        for index in 0..self.nodes.len() {
            let state = StateId(index);
            let source = self.sources[index];

            let initial = self.resolve_initial(state, source);
            let entry = self.resolve_actions(state, source.entry.iter());
            let exit = self.resolve_actions(state, source.exit.iter());
            let on = self.resolve_on(state, source);
            let after = self.resolve_after(state, source);
            let invoke = self.resolve_invoke(state, source);

            let node = &mut self.nodes[index];
            node.initial = initial;
            node.entry = entry;
            node.exit = exit;
            node.on = on;
            node.after = after;
            node.invoke = invoke;
        }
    }

    fn resolve_initial(&mut self, state: StateId, source: &StateConfig) -> Option<StateId> {
        let node = &self.nodes[state.0];
        match (&source.initial, node.children.is_empty()) {
            (None, true) => None,
            (Some(initial), true) => {
                let error = ConfigError::InitialOnLeaf {
                    state: node.id.clone(),
                    initial: initial.clone(),
                };
                self.reject(error);
                None
            }
            (None, false) => {
                let error = ConfigError::MissingInitial {
                    state: node.id.clone(),
                };
                self.reject(error);
                None
            }
            (Some(initial), false) => {
                let found = self.child(state, initial);
                if found.is_none() {
                    let error = ConfigError::UnknownInitial {
                        state: node.id.clone(),
                        initial: initial.clone(),
                    };
                    self.reject(error);
                }
                found
            }
        }
    }

    fn resolve_actions<'a>(
        &mut self,
        state: StateId,
        names: impl Iterator<Item = &'a String>,
    ) -> Vec<ActionId> {
        names
            .filter_map(|name| {
                let checked = self.action(state, name);
                self.check(checked)
            })
            .collect()
    }

    fn resolve_on(
        &mut self,
        state: StateId,
        source: &StateConfig,
    ) -> BTreeMap<String, Vec<Transition>> {
        let mut on = BTreeMap::new();
        for (event, candidates) in &source.on {
            let transitions = candidates
                .iter()
                .filter_map(|candidate| self.transition(state, event, candidate))
                .collect();
            on.insert(event.clone(), transitions);
        }
        on
    }

    fn resolve_after(&mut self, state: StateId, source: &StateConfig) -> Vec<Delay> {
        let mut seen = BTreeSet::new();
        let mut after = Vec::new();
        for (key, candidate) in &source.after {
            let state_id = self.nodes[state.0].id.clone();
            let Ok(millis) = key.trim().parse::<u64>() else {
                self.reject(ConfigError::InvalidDelay {
                    state: state_id,
                    key: key.clone(),
                });
                continue;
            };
            if !seen.insert(millis) {
                self.reject(ConfigError::DuplicateDelay {
                    state: state_id,
                    delay_ms: millis,
                });
                continue;
            }
            let delay = Duration::from_millis(millis);
            let event = after_event_name(delay, &state_id);
            if let Some(transition) = self.transition(state, &event, candidate) {
                after.push(Delay {
                    delay,
                    event,
                    transition,
                });
            }
        }
        after.sort_by_key(|d| d.delay);
        after
    }

    fn resolve_invoke(&mut self, state: StateId, source: &StateConfig) -> Vec<InvokeSpec> {
        source
            .invoke
            .iter()
            .filter_map(|invoke| {
                let checked = self.service(state, &invoke.src);
                self.check(checked).map(|service| InvokeSpec {
                    id: invoke.id.clone().unwrap_or_else(|| invoke.src.clone()),
                    service,
                })
            })
            .collect()
    }

    fn transition(
        &mut self,
        state: StateId,
        event: &str,
        candidate: &TransitionConfig,
    ) -> Option<Transition> {
        let target = match &candidate.target {
            None => Some(None),
            Some(target) => {
                let checked = self.target(state, event, target);
                self.check(checked).map(Some)
            }
        };
        let actions = self.resolve_actions(state, candidate.actions.iter());
        let target = target?;
        if actions.len() != candidate.actions.len() {
            return None;
        }
        Some(Transition {
            source: state,
            target,
            actions,
            description: candidate.description.clone(),
        })
    }

    fn target(&self, state: StateId, event: &str, target: &str) -> Checked<StateId> {
        match self.lookup(state, target) {
            Some(found) => Validation::success(found),
            None => Validation::fail(ConfigError::UnresolvedTarget {
                state: self.nodes[state.0].id.clone(),
                event: event.to_string(),
                target: target.to_string(),
            }),
        }
    }

    /// Resolve a target string against the tree.
    ///
    /// `#Id.a.b` starts at the root, `.a` at the declaring state, anything
    /// else at the declaring state's parent (the root for the root itself).
    fn lookup(&self, state: StateId, target: &str) -> Option<StateId> {
        let root = StateId(0);
        if let Some(absolute) = target.strip_prefix('#') {
            let mut segments = absolute.split('.');
            if segments.next()? != self.config.id {
                return None;
            }
            self.descend(root, segments)
        } else if let Some(relative) = target.strip_prefix('.') {
            self.descend(state, relative.split('.'))
        } else {
            let base = self.nodes[state.0].parent.unwrap_or(root);
            self.descend(base, target.split('.'))
        }
    }

    fn descend<'s>(
        &self,
        from: StateId,
        segments: impl Iterator<Item = &'s str>,
    ) -> Option<StateId> {
        segments.fold(Some(from), |current, segment| self.child(current?, segment))
    }

    fn child(&self, parent: StateId, key: &str) -> Option<StateId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].key == key)
    }

    fn action(&mut self, state: StateId, name: &str) -> Checked<ActionId> {
        if let Some(id) = self.action_index.get(name) {
            return Validation::success(*id);
        }
        if !self.catalog.has_action(name) {
            return Validation::fail(ConfigError::UnknownAction {
                state: self.nodes[state.0].id.clone(),
                action: name.to_string(),
            });
        }
        let id = ActionId(self.actions.len());
        self.actions.push(name.to_string());
        self.action_index.insert(name.to_string(), id);
        Validation::success(id)
    }

    fn service(&mut self, state: StateId, name: &str) -> Checked<ServiceId> {
        if let Some(id) = self.service_index.get(name) {
            return Validation::success(*id);
        }
        if !self.catalog.has_service(name) {
            return Validation::fail(ConfigError::UnknownService {
                state: self.nodes[state.0].id.clone(),
                service: name.to_string(),
            });
        }
        let id = ServiceId(self.services.len());
        self.services.push(name.to_string());
        self.service_index.insert(name.to_string(), id);
        Validation::success(id)
    }

    fn finish(self) -> Result<StateTree, BuildError> {
        match Validation::all_vec(self.failures) {
            Validation::Success(_) => Ok(StateTree {
                machine_id: self.config.id.clone(),
                nodes: self.nodes,
                actions: self.actions,
                services: self.services,
            }),
            Validation::Failure(errors) => {
                Err(BuildError::Invalid(errors.iter().cloned().collect()))
            }
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('.') && !key.contains('#')
}
