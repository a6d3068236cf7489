//! Events delivered to a running machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Name of the event passed to entry actions when the machine starts.
pub const INIT_EVENT: &str = "@init";

/// Name of the event passed to exit actions when the machine stops.
pub const STOP_EVENT: &str = "@stop";

/// A named event with an optional JSON payload.
///
/// Events are either sent by the host, emitted by an invoked service, or
/// synthesized by the interpreter itself (start, stop, elapsed delays).
///
/// # Example
///
/// ```rust
/// use statewise::core::Event;
/// use serde_json::json;
///
/// let plain = Event::from("toggle");
/// assert_eq!(plain.name(), "toggle");
/// assert!(plain.payload().is_none());
///
/// let seek = Event::new("seek").with_payload(json!({ "seconds": 42 }));
/// assert_eq!(seek.payload().unwrap()["seconds"], 42);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl Event {
    /// Create an event without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// Attach a payload, replacing any previous one.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// The event delivered to actions when a delayed transition elapses.
    pub fn after(delay: Duration, state_id: &str) -> Self {
        Self::new(after_event_name(delay, state_id))
    }

    pub(crate) fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    pub(crate) fn stop() -> Self {
        Self::new(STOP_EVENT)
    }
}

/// Synthetic name of the delayed event owned by `state_id`.
pub fn after_event_name(delay: Duration, state_id: &str) -> String {
    format!("after({})#{}", delay.as_millis(), state_id)
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
