//! A validated machine: the state tree plus its resolved implementations.

use crate::builder::{BuildError, ConfigError, MachineConfig};
use crate::core::{ActionId, ServiceId, StateTree};
use crate::runtime::implementations::{Action, Implementations, Service};
use std::fmt;

/// An immutable, validated machine ready to be interpreted.
///
/// Every action and service referenced by the tree has been resolved to a
/// callable, so interpreting it never looks anything up by name. A machine
/// can back any number of interpreters through an `Arc`.
pub struct Machine<C> {
    tree: StateTree,
    actions: Vec<Action<C>>,
    services: Vec<Service>,
}

impl<C> Machine<C> {
    /// Validate `config` and bind it to `implementations`.
    pub fn new(config: &MachineConfig, implementations: Implementations<C>) -> Result<Self, BuildError> {
        let tree = StateTree::build(config, &implementations)?;

        let actions = tree
            .action_names()
            .iter()
            .map(|name| {
                implementations.get_action(name).cloned().ok_or_else(|| {
                    ConfigError::UnknownAction {
                        state: tree.id().to_string(),
                        action: name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| BuildError::Invalid(vec![error]))?;

        let services = tree
            .service_names()
            .iter()
            .map(|name| {
                implementations.get_service(name).cloned().ok_or_else(|| {
                    ConfigError::UnknownService {
                        state: tree.id().to_string(),
                        service: name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| BuildError::Invalid(vec![error]))?;

        Ok(Self {
            tree,
            actions,
            services,
        })
    }

    /// Parse a JSON definition and bind it to `implementations`.
    pub fn from_json(json: &str, implementations: Implementations<C>) -> Result<Self, BuildError> {
        Self::new(&MachineConfig::from_json(json)?, implementations)
    }

    pub fn id(&self) -> &str {
        self.tree.id()
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub(crate) fn action(&self, id: ActionId) -> &Action<C> {
        &self.actions[id.0]
    }

    pub(crate) fn service(&self, id: ServiceId) -> &Service {
        &self.services[id.0]
    }
}

impl<C> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.tree.id())
            .field("states", &self.tree.len())
            .field("actions", &self.tree.action_names())
            .field("services", &self.tree.service_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{video_implementations, Recorder, VIDEO_JSON};

    #[test]
    fn binds_every_referenced_name() {
        let recorder = Recorder::default();
        let machine = Machine::from_json(VIDEO_JSON, video_implementations(&recorder)).unwrap();

        assert_eq!(machine.id(), "Video");
        assert_eq!(machine.actions.len(), 2);
        assert_eq!(machine.services.len(), 2);
    }

    #[test]
    fn missing_implementations_prevent_construction() {
        let result = Machine::from_json(VIDEO_JSON, Implementations::<()>::new());

        match result {
            Err(BuildError::Invalid(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("Expected invalid definition, got {other:?}"),
        }
    }

    #[test]
    fn unused_implementations_are_allowed() {
        let recorder = Recorder::default();
        let implementations = video_implementations(&recorder).action("unused", |_, _| Ok(()));

        assert!(Machine::from_json(VIDEO_JSON, implementations).is_ok());
    }
}
