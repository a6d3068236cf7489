//! Transition selection and exit/entry planning.
//!
//! Everything here is pure: given the tree, the current configuration and an
//! event, it computes what *would* happen. The interpreter applies the
//! resulting [`Step`].

use super::configuration::{resolve_initial_path, transition_domain, Configuration};
use super::state::{ActionId, StateId, StateTree, Transition};

/// The outcome of taking one transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// State that declared the transition.
    pub source: StateId,
    /// Deepest state left untouched; everything strictly below it is exited
    /// or entered.
    pub domain: StateId,
    /// Exited states, innermost first.
    pub exit: Vec<StateId>,
    /// Entered states, outermost first.
    pub entry: Vec<StateId>,
    /// Exit actions, then the transition's own actions, then entry actions.
    pub actions: Vec<ActionId>,
    /// Configuration after the step.
    pub configuration: Configuration,
}

impl Step {
    /// Whether the step exits or enters anything.
    pub fn changes_configuration(&self) -> bool {
        !self.exit.is_empty() || !self.entry.is_empty()
    }
}

/// Find the transition that handles `event`, searching from the innermost
/// active state outward. The first declared candidate wins.
pub fn select<'t>(
    tree: &'t StateTree,
    config: &Configuration,
    event: &str,
) -> Option<&'t Transition> {
    config
        .innermost_first()
        .find_map(|state| tree.node(state).transitions(event).first())
}

/// Compute exits, entries and the ordered action list for `transition`.
///
/// `transition.source()` must be active in `config`.
pub fn plan(tree: &StateTree, config: &Configuration, transition: &Transition) -> Step {
    let Some(target) = transition.target() else {
        return Step {
            source: transition.source(),
            domain: transition.source(),
            exit: Vec::new(),
            entry: Vec::new(),
            actions: transition.actions().to_vec(),
            configuration: config.clone(),
        };
    };

    let domain = transition_domain(tree, transition.source(), target);

    let exit: Vec<StateId> = config
        .innermost_first()
        .take_while(|state| *state != domain)
        .collect();

    let mut entry: Vec<StateId> = tree
        .ancestors(target)
        .take_while(|state| *state != domain)
        .collect();
    entry.reverse();
    entry.extend(resolve_initial_path(tree, target).into_iter().skip(1));

    let mut path: Vec<StateId> = config
        .states()
        .iter()
        .copied()
        .take_while(|state| *state != domain)
        .collect();
    path.push(domain);
    path.extend(entry.iter().copied());

    let mut actions = Vec::new();
    for state in &exit {
        actions.extend_from_slice(tree.node(*state).exit());
    }
    actions.extend_from_slice(transition.actions());
    for state in &entry {
        actions.extend_from_slice(tree.node(*state).entry());
    }

    Step {
        source: transition.source(),
        domain,
        exit,
        entry,
        actions,
        configuration: Configuration::new(path),
    }
}

/// Select and plan in one go. `None` means the event is not handled by any
/// active state.
pub fn step(tree: &StateTree, config: &Configuration, event: &str) -> Option<Step> {
    select(tree, config, event).map(|transition| plan(tree, config, transition))
}
