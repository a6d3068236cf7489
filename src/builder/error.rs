//! Errors raised while turning a definition into a machine.

use thiserror::Error;

/// A single defect found in a machine definition.
///
/// State names in these errors are path-qualified ids such as `Video.full`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Machine id '{id}' must be non-empty and contain no '.' or '#'")]
    InvalidMachineId { id: String },

    #[error("State key '{key}' under '{parent}' must be non-empty and contain no '.' or '#'")]
    InvalidStateKey { parent: String, key: String },

    #[error("State '{key}' is declared more than once under '{parent}'")]
    DuplicateState { parent: String, key: String },

    #[error("Compound state '{state}' has no initial child. Set `initial`")]
    MissingInitial { state: String },

    #[error("Initial child '{initial}' of '{state}' is not one of its states")]
    UnknownInitial { state: String, initial: String },

    #[error("Leaf state '{state}' declares an initial child '{initial}'")]
    InitialOnLeaf { state: String, initial: String },

    #[error("Transition on '{event}' in '{state}' targets unknown state '{target}'")]
    UnresolvedTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("Action '{action}' used by '{state}' has no implementation")]
    UnknownAction { state: String, action: String },

    #[error("Service '{service}' invoked by '{state}' has no implementation")]
    UnknownService { state: String, service: String },

    #[error("Delay '{key}' in '{state}' is not a whole number of milliseconds")]
    InvalidDelay { state: String, key: String },

    #[error("Delay of {delay_ms}ms is declared more than once in '{state}'")]
    DuplicateDelay { state: String, delay_ms: u64 },
}

/// Errors that prevent a machine from being built.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The definition is structurally invalid. Every defect found is listed.
    #[error("Invalid machine definition: {}", summarize(.0))]
    Invalid(Vec<ConfigError>),

    #[error("Failed to parse machine definition: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BuildError {
    /// The individual defects, empty for parse errors.
    pub fn errors(&self) -> &[ConfigError] {
        match self {
            Self::Invalid(errors) => errors,
            Self::Parse(_) => &[],
        }
    }
}

fn summarize(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
