//! Active configurations and the hierarchy queries that bound a transition.

use super::state::{StateId, StateTree};

/// The active path of states, ordered from the root to the active leaf.
///
/// The machine has no orthogonal regions, so "the state" is always a single
/// root-to-leaf path rather than a set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    path: Vec<StateId>,
}

impl Configuration {
    pub(crate) fn new(path: Vec<StateId>) -> Self {
        Self { path }
    }

    /// The configuration a machine starts in.
    pub fn initial(tree: &StateTree) -> Self {
        Self::new(resolve_initial_path(tree, tree.root()))
    }

    /// Active states, root first.
    pub fn states(&self) -> &[StateId] {
        &self.path
    }

    pub fn leaf(&self) -> Option<StateId> {
        self.path.last().copied()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.path.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Active states, innermost first.
    pub fn innermost_first(&self) -> impl Iterator<Item = StateId> + '_ {
        self.path.iter().rev().copied()
    }

    /// Local keys of the active states below the root, e.g. `["full", "playing"]`.
    pub fn value(&self, tree: &StateTree) -> Vec<String> {
        self.path
            .iter()
            .skip(1)
            .map(|id| tree.node(*id).key().to_string())
            .collect()
    }

    /// Qualified ids of the active states, root first.
    pub fn ids<'t>(&self, tree: &'t StateTree) -> Vec<&'t str> {
        self.path.iter().map(|id| tree.node(*id).id()).collect()
    }
}

/// Descend from `node` through initial children until a leaf is reached.
///
/// The returned path starts with `node` itself.
pub fn resolve_initial_path(tree: &StateTree, node: StateId) -> Vec<StateId> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(initial) = tree.node(current).initial() {
        path.push(initial);
        current = initial;
    }
    path
}

/// Deepest state that is an ancestor of (or equal to) both `a` and `b`.
pub fn find_lca(tree: &StateTree, a: StateId, b: StateId) -> StateId {
    let (mut a, mut b) = (a, b);
    while tree.node(a).depth() > tree.node(b).depth() {
        a = parent_or_self(tree, a);
    }
    while tree.node(b).depth() > tree.node(a).depth() {
        b = parent_or_self(tree, b);
    }
    while a != b {
        a = parent_or_self(tree, a);
        b = parent_or_self(tree, b);
    }
    a
}

/// The state below which a transition from `source` to `target` exits and
/// enters.
///
/// When one end contains the other, the common ancestor is raised one level so
/// the outer end is exited and re-entered as well. The root is never exited.
pub fn transition_domain(tree: &StateTree, source: StateId, target: StateId) -> StateId {
    let lca = find_lca(tree, source, target);
    if lca == source || lca == target {
        parent_or_self(tree, lca)
    } else {
        lca
    }
}

fn parent_or_self(tree: &StateTree, id: StateId) -> StateId {
    tree.node(id).parent().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{nested_tree, video_tree};

    #[test]
    fn initial_configuration_bottoms_out_at_leaf() {
        let tree = video_tree();
        let config = Configuration::initial(&tree);

        assert_eq!(config.ids(&tree), vec!["Video", "Video.mini"]);
        assert_eq!(config.value(&tree), vec!["mini".to_string()]);
        assert_eq!(config.leaf(), tree.find("Video.mini"));
    }

    #[test]
    fn initial_path_descends_through_compound_states() {
        let tree = video_tree();
        let full = tree.find("Video.full").unwrap();
        let path = resolve_initial_path(&tree, full);
        let ids: Vec<&str> = path.iter().map(|id| tree.node(*id).id()).collect();

        assert_eq!(ids, vec!["Video.full", "Video.full.playing"]);
    }

    #[test]
    fn initial_path_of_leaf_is_itself() {
        let tree = video_tree();
        let mini = tree.find("Video.mini").unwrap();

        assert_eq!(resolve_initial_path(&tree, mini), vec![mini]);
    }

    #[test]
    fn lca_of_siblings_is_parent() {
        let tree = video_tree();
        let playing = tree.find("Video.full.playing").unwrap();
        let stopped = tree.find("Video.full.stopped").unwrap();

        assert_eq!(find_lca(&tree, playing, stopped), tree.find("Video.full").unwrap());
    }

    #[test]
    fn lca_across_depths() {
        let tree = nested_tree();
        let deep = tree.find("M.a.a1.a11").unwrap();
        let other = tree.find("M.a.a2").unwrap();

        assert_eq!(find_lca(&tree, deep, other), tree.find("M.a").unwrap());
        assert_eq!(find_lca(&tree, other, deep), tree.find("M.a").unwrap());
        assert_eq!(find_lca(&tree, deep, tree.find("M.b").unwrap()), tree.root());
    }

    #[test]
    fn lca_with_ancestor_is_ancestor() {
        let tree = nested_tree();
        let deep = tree.find("M.a.a1.a11").unwrap();
        let a = tree.find("M.a").unwrap();

        assert_eq!(find_lca(&tree, deep, a), a);
    }

    #[test]
    fn domain_of_self_transition_is_parent() {
        let tree = video_tree();
        let full = tree.find("Video.full").unwrap();

        assert_eq!(transition_domain(&tree, full, full), tree.root());
    }

    #[test]
    fn domain_of_transition_into_descendant_exits_source() {
        let tree = nested_tree();
        let a = tree.find("M.a").unwrap();
        let a12 = tree.find("M.a.a1.a12").unwrap();

        assert_eq!(transition_domain(&tree, a, a12), tree.root());
    }

    #[test]
    fn domain_of_siblings_is_their_parent() {
        let tree = nested_tree();
        let a11 = tree.find("M.a.a1.a11").unwrap();
        let a2 = tree.find("M.a.a2").unwrap();

        assert_eq!(transition_domain(&tree, a11, a2), tree.find("M.a").unwrap());
    }

    #[test]
    fn domain_never_rises_above_root() {
        let tree = nested_tree();
        let root = tree.root();
        let b = tree.find("M.b").unwrap();

        assert_eq!(transition_domain(&tree, root, b), root);
        assert_eq!(transition_domain(&tree, b, root), root);
    }
}
