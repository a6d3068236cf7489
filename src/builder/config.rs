//! Serializable machine definitions.
//!
//! The shape follows the usual statechart literal: a machine `id`, an
//! `initial` child, nested `states`, and per state `entry`/`exit` actions,
//! `on` event transitions, `after` delayed transitions and `invoke`d
//! services. Definitions can be written by hand as JSON or produced by the
//! fluent builders in this module.

use crate::builder::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single value or a list of values.
// `Many` comes first: an untagged struct would otherwise accept a JSON array
// positionally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// `"a"` and `["a"]` describe the same thing.
impl<T: PartialEq> PartialEq for OneOrMany<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value, turning a single value into a list.
    pub fn push(&mut self, value: T) {
        let values = match std::mem::take(self) {
            Self::One(existing) => vec![existing, value],
            Self::Many(mut values) => {
                values.push(value);
                values
            }
        };
        *self = Self::Many(values);
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

/// A transition as written in a definition.
///
/// Deserializes from either a bare target string (`"stopped"`) or an object
/// with optional `target`, `actions` and `description`. Omitting `target`
/// declares a targetless transition that only runs its actions.
///
/// Targets are `#<machine id>.path` (absolute), `.child` (a child of the
/// declaring state) or `sibling` / `sibling.child` (relative to the declaring
/// state's parent).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransitionRepr")]
pub struct TransitionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub actions: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransitionRepr {
    Target(String),
    Full {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        actions: OneOrMany<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<TransitionRepr> for TransitionConfig {
    fn from(repr: TransitionRepr) -> Self {
        match repr {
            TransitionRepr::Target(target) => Self::to(target),
            TransitionRepr::Full {
                target,
                actions,
                description,
            } => Self {
                target,
                actions,
                description,
            },
        }
    }
}

impl TransitionConfig {
    /// Transition to `target` with no actions.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Transition that runs actions without changing state.
    pub fn targetless() -> Self {
        Self::default()
    }

    /// Add an action run between the exit and entry phases.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&str> for TransitionConfig {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

impl From<String> for TransitionConfig {
    fn from(target: String) -> Self {
        Self::to(target)
    }
}

/// A service invocation as written in a definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvokeConfig {
    /// Name of the service in the host's implementation table.
    pub src: String,
    /// Instance id; defaults to `src`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl From<&str> for InvokeConfig {
    fn from(src: &str) -> Self {
        Self {
            src: src.to_string(),
            id: None,
        }
    }
}

/// One state of a definition, possibly with nested states.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    /// Child states by key. Keys are kept sorted, so declaration order is
    /// not preserved.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<String, StateConfig>,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub entry: OneOrMany<String>,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub exit: OneOrMany<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, OneOrMany<TransitionConfig>>,
    /// Delayed transitions keyed by milliseconds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub after: BTreeMap<String, TransitionConfig>,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub invoke: OneOrMany<InvokeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A complete machine definition: an id plus the root state.
///
/// # Example
///
/// ```rust
/// use statewise::builder::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{
///     "id": "Light",
///     "initial": "off",
///     "states": {
///         "off": { "on": { "flip": "on" } },
///         "on":  { "on": { "flip": "off" }, "entry": "lamp" }
///     }
/// }"#).unwrap();
///
/// assert_eq!(config.id, "Light");
/// assert_eq!(config.root.states.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: String,
    #[serde(flatten)]
    pub root: StateConfig,
}

impl MachineConfig {
    /// Parse a definition from JSON. Structural validation happens later,
    /// when the definition is turned into a machine.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
