//! The immutable state tree a machine is interpreted against.
//!
//! Nodes live in an arena owned by [`StateTree`]. Children are owned through
//! index lists and every node keeps a back-reference to its parent, so walking
//! up or down the hierarchy never re-parses a path string. Trees are built
//! once by [`StateTree::build`](crate::builder::tree) and never mutated
//! afterwards, which makes them safe to share between interpreters.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Index of a node inside its [`StateTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

/// Index of a resolved action in the machine's action table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) usize);

/// Index of a resolved service in the machine's service table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(pub(crate) usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A transition whose target has already been resolved to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub(crate) source: StateId,
    pub(crate) target: Option<StateId>,
    pub(crate) actions: Vec<ActionId>,
    pub(crate) description: Option<String>,
}

impl Transition {
    /// The state that declares this transition.
    pub fn source(&self) -> StateId {
        self.source
    }

    /// The resolved target, or `None` for a targetless transition that only
    /// runs its actions.
    pub fn target(&self) -> Option<StateId> {
        self.target
    }

    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_targetless(&self) -> bool {
        self.target.is_none()
    }
}

/// A delayed transition armed while its owning state is active.
#[derive(Clone, Debug, PartialEq)]
pub struct Delay {
    pub(crate) delay: Duration,
    pub(crate) event: String,
    pub(crate) transition: Transition,
}

impl Delay {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Name of the synthetic event delivered when the delay elapses.
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }
}

/// A service invoked for as long as the owning state stays active.
#[derive(Clone, Debug, PartialEq)]
pub struct InvokeSpec {
    pub(crate) id: String,
    pub(crate) service: ServiceId,
}

impl InvokeSpec {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }
}

/// One state of the machine.
#[derive(Clone, Debug)]
pub struct StateNode {
    pub(crate) key: String,
    pub(crate) id: String,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<StateId>,
    pub(crate) initial: Option<StateId>,
    pub(crate) depth: usize,
    pub(crate) entry: Vec<ActionId>,
    pub(crate) exit: Vec<ActionId>,
    pub(crate) on: BTreeMap<String, Vec<Transition>>,
    pub(crate) after: Vec<Delay>,
    pub(crate) invoke: Vec<InvokeSpec>,
    pub(crate) description: Option<String>,
}

impl StateNode {
    /// Local name, unique among siblings. The root's key is the machine id.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path-qualified name, e.g. `Video.full.playing`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Child states, ordered by key.
    pub fn children(&self) -> &[StateId] {
        &self.children
    }

    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_compound(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn entry(&self) -> &[ActionId] {
        &self.entry
    }

    pub fn exit(&self) -> &[ActionId] {
        &self.exit
    }

    /// Candidate transitions declared for `event`, in declaration order.
    pub fn transitions(&self, event: &str) -> &[Transition] {
        self.on.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the events this state handles itself.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.on.keys().map(String::as_str)
    }

    pub fn after(&self) -> &[Delay] {
        &self.after
    }

    pub fn invocations(&self) -> &[InvokeSpec] {
        &self.invoke
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Validated, immutable hierarchy of states.
#[derive(Clone, Debug)]
pub struct StateTree {
    pub(crate) machine_id: String,
    pub(crate) nodes: Vec<StateNode>,
    pub(crate) actions: Vec<String>,
    pub(crate) services: Vec<String>,
}

impl StateTree {
    /// The machine id, also the key of the root node.
    pub fn id(&self) -> &str {
        &self.machine_id
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    /// Look up a node. Ids are only ever handed out by this tree; use
    /// [`get`](Self::get) for an id that may belong to another tree.
    pub fn node(&self, id: StateId) -> &StateNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: StateId) -> Option<&StateNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = (StateId, &StateNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (StateId(i), n))
    }

    /// Find a node by its path-qualified id (`Video.full.playing`).
    pub fn find(&self, state_id: &str) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|n| n.id == state_id)
            .map(StateId)
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: StateId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Whether `id` is `ancestor` or lies below it.
    pub fn is_descendant(&self, id: StateId, ancestor: StateId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    pub fn action_name(&self, id: ActionId) -> &str {
        &self.actions[id.0]
    }

    pub fn service_name(&self, id: ServiceId) -> &str {
        &self.services[id.0]
    }

    /// Distinct action names referenced anywhere in the tree.
    pub fn action_names(&self) -> &[String] {
        &self.actions
    }

    /// Distinct service names referenced anywhere in the tree.
    pub fn service_names(&self) -> &[String] {
        &self.services
    }

    /// Whether any state declares an `after` transition.
    pub fn has_delays(&self) -> bool {
        self.nodes.iter().any(|n| !n.after.is_empty())
    }
}

/// Iterator returned by [`StateTree::ancestors`].
pub struct Ancestors<'t> {
    tree: &'t StateTree,
    next: Option<StateId>,
}

impl Iterator for Ancestors<'_> {
    type Item = StateId;

    fn next(&mut self) -> Option<StateId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}
