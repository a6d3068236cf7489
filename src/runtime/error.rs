//! Errors surfaced by a running interpreter.

use thiserror::Error;

/// Failure reported by a host-supplied action.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Errors that can occur while driving a machine.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A host action failed. The configuration, invocations and timers
    /// already reflect the step; the remaining actions of the step were
    /// skipped.
    #[error("Action '{action}' failed while processing '{event}': {source}")]
    ActionFailed {
        action: String,
        event: String,
        #[source]
        source: ActionError,
    },

    #[error("Machine '{machine}' has delayed transitions but no tokio runtime is running")]
    NoRuntime { machine: String },

    #[error("Interpreter has not been started")]
    NotStarted,

    #[error("Interpreter has been stopped")]
    Terminated,
}
