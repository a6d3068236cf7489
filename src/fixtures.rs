//! Machines and doubles shared by the unit tests.

use crate::builder::{Catalog, MachineBuilder, MachineConfig, StateBuilder, TransitionConfig};
use crate::core::{Event, StateTree};
use crate::runtime::{Emitter, Implementations, InvokeHandle, Machine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const VIDEO_JSON: &str = r##"{
    "id": "Video",
    "initial": "mini",
    "states": {
        "mini": {
            "description": "The video as a small thumbnail",
            "on": {
                "toggle": { "target": "full", "description": "User clicks video" }
            }
        },
        "full": {
            "description": "Video playing fullscreen",
            "entry": "playVideo",
            "exit": "pauseVideo",
            "invoke": [{ "src": "video.ended" }, { "src": "key.escape" }],
            "initial": "playing",
            "states": {
                "playing": {
                    "on": { "video.ended": "stopped" }
                },
                "stopped": {
                    "after": { "1000": { "target": "#Video.mini", "actions": [] } }
                }
            },
            "on": {
                "toggle": { "target": "mini", "description": "User clicks video" },
                "key.escape": "mini"
            }
        }
    }
}"##;

pub(crate) const VIDEO_ACTIONS: &[&str] = &["playVideo", "pauseVideo"];
pub(crate) const VIDEO_SERVICES: &[&str] = &["video.ended", "key.escape"];

pub(crate) const NESTED_ACTIONS: &[&str] = &[
    "enter_a", "exit_a", "enter_a1", "exit_a1", "enter_a11", "exit_a11", "enter_b", "exit_b",
    "on_out", "log",
];
pub(crate) const NESTED_SERVICES: &[&str] = &["watch"];

/// The video player, built with the fluent API. Equal to [`VIDEO_JSON`].
pub(crate) fn video_config() -> MachineConfig {
    MachineBuilder::new("Video")
        .initial("mini")
        .state(
            StateBuilder::new("mini")
                .description("The video as a small thumbnail")
                .on(
                    "toggle",
                    TransitionConfig::to("full").description("User clicks video"),
                ),
        )
        .state(
            StateBuilder::new("full")
                .description("Video playing fullscreen")
                .entry("playVideo")
                .exit("pauseVideo")
                .invoke("video.ended")
                .invoke("key.escape")
                .initial("playing")
                .state(StateBuilder::new("playing").on("video.ended", "stopped"))
                .state(StateBuilder::new("stopped").after(Duration::from_millis(1000), "#Video.mini"))
                .on(
                    "toggle",
                    TransitionConfig::to("mini").description("User clicks video"),
                )
                .on("key.escape", "mini"),
        )
        .build()
        .unwrap()
}

/// Three levels deep with handlers at every level:
///
/// ```text
/// M            reset -> b, next -> b
/// ├─ a         jump -> .a2
/// │  ├─ a1     ping (targetless, log), invokes watch
/// │  │  ├─ a11 next -> a12, again -> a11, out -> #M.b / on_out
/// │  │  └─ a12
/// │  └─ a2     up -> #M.a
/// └─ b         back -> a
/// ```
pub(crate) fn nested_config() -> MachineConfig {
    MachineBuilder::new("M")
        .initial("a")
        .on("reset", "b")
        .on("next", "b")
        .state(
            StateBuilder::new("a")
                .initial("a1")
                .entry("enter_a")
                .exit("exit_a")
                .on("jump", ".a2")
                .state(
                    StateBuilder::new("a1")
                        .initial("a11")
                        .entry("enter_a1")
                        .exit("exit_a1")
                        .invoke("watch")
                        .on("ping", TransitionConfig::targetless().action("log"))
                        .state(
                            StateBuilder::new("a11")
                                .entry("enter_a11")
                                .exit("exit_a11")
                                .on("next", "a12")
                                .on("again", "a11")
                                .on("out", TransitionConfig::to("#M.b").action("on_out")),
                        )
                        .state(StateBuilder::new("a12")),
                )
                .state(StateBuilder::new("a2").on("up", "#M.a")),
        )
        .state(
            StateBuilder::new("b")
                .entry("enter_b")
                .exit("exit_b")
                .on("back", "a"),
        )
        .build()
        .unwrap()
}

pub(crate) fn video_tree() -> StateTree {
    StateTree::build(&video_config(), &Permissive).unwrap()
}

pub(crate) fn nested_tree() -> StateTree {
    StateTree::build(&nested_config(), &Permissive).unwrap()
}

/// Accepts every name.
pub(crate) struct Permissive;

impl Catalog for Permissive {
    fn has_action(&self, _name: &str) -> bool {
        true
    }

    fn has_service(&self, _name: &str) -> bool {
        true
    }
}

/// Accepts only the listed names.
pub(crate) struct Named {
    actions: Vec<String>,
    services: Vec<String>,
}

impl Named {
    pub(crate) fn new(actions: &[&str], services: &[&str]) -> Self {
        Self {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Catalog for Named {
    fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a == name)
    }

    fn has_service(&self, name: &str) -> bool {
        self.services.iter().any(|s| s == name)
    }
}

/// Records action runs as `name` and service lifecycles as `start:name` and
/// `stop:name`, and keeps the latest emitter of each service.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
    emitters: Arc<Mutex<HashMap<String, Emitter>>>,
}

impl Recorder {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    /// Drain everything recorded so far.
    pub(crate) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    /// Drain, keeping only action runs.
    pub(crate) fn actions(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter(|entry| !entry.starts_with("start:") && !entry.starts_with("stop:"))
            .collect()
    }

    pub(crate) fn emitter(&self, service: &str) -> Option<Emitter> {
        self.emitters.lock().unwrap().get(service).cloned()
    }

    pub(crate) fn emit(&self, service: &str, event: impl Into<Event>) -> bool {
        self.emitter(service)
            .map(|emitter| emitter.emit(event))
            .unwrap_or(false)
    }

    pub(crate) fn implementations(&self, actions: &[&str], services: &[&str]) -> Implementations<()> {
        let mut implementations = Implementations::new();
        for name in actions {
            let recorder = self.clone();
            let name = name.to_string();
            implementations = implementations.action(name.clone(), move |_, _| {
                recorder.push(name.clone());
                Ok(())
            });
        }
        for name in services {
            let recorder = self.clone();
            let name = name.to_string();
            implementations = implementations.service(name.clone(), move |emitter| {
                recorder.push(format!("start:{name}"));
                recorder
                    .emitters
                    .lock()
                    .unwrap()
                    .insert(name.clone(), emitter);
                let recorder = recorder.clone();
                let name = name.clone();
                InvokeHandle::new(move || recorder.push(format!("stop:{name}")))
            });
        }
        implementations
    }
}

pub(crate) fn video_implementations(recorder: &Recorder) -> Implementations<()> {
    recorder.implementations(VIDEO_ACTIONS, VIDEO_SERVICES)
}

pub(crate) fn video_machine(recorder: &Recorder) -> Machine<()> {
    Machine::new(&video_config(), video_implementations(recorder)).unwrap()
}

pub(crate) fn nested_machine(recorder: &Recorder) -> Machine<()> {
    Machine::new(
        &nested_config(),
        recorder.implementations(NESTED_ACTIONS, NESTED_SERVICES),
    )
    .unwrap()
}
