//! End-to-end scenarios for the video player machine under paused tokio time.

use statewise::core::Event;
use statewise::runtime::{
    Emitter, Implementations, Interpreter, InterpreterError, InvokeHandle, Machine, Status,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const VIDEO: &str = r##"{
    "id": "Video",
    "initial": "mini",
    "states": {
        "mini": {
            "on": { "toggle": { "target": "full", "description": "User clicks video" } }
        },
        "full": {
            "entry": "playVideo",
            "exit": "pauseVideo",
            "invoke": [{ "src": "video.ended" }, { "src": "key.escape" }],
            "initial": "playing",
            "states": {
                "playing": { "on": { "video.ended": "stopped" } },
                "stopped": { "after": { "1000": { "target": "#Video.mini" } } }
            },
            "on": {
                "toggle": { "target": "mini", "description": "User clicks video" },
                "key.escape": "mini"
            }
        }
    }
}"##;

const VIDEO_LENGTH: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Default, PartialEq)]
struct Player {
    plays: u32,
    pauses: u32,
}

/// Stands in for the keyboard: holds the emitter of the running
/// `key.escape` invocation.
#[derive(Clone, Default)]
struct Keyboard(Arc<Mutex<Option<Emitter>>>);

impl Keyboard {
    fn press_escape(&self) -> bool {
        self.0
            .lock()
            .unwrap()
            .as_ref()
            .map(|emitter| emitter.emit("key.escape"))
            .unwrap_or(false)
    }
}

fn player(keyboard: &Keyboard) -> Interpreter<Player> {
    let keyboard = keyboard.clone();
    let implementations = Implementations::new()
        .action("playVideo", |player: &mut Player, _| {
            player.plays += 1;
            Ok(())
        })
        .action("pauseVideo", |player: &mut Player, _| {
            player.pauses += 1;
            Ok(())
        })
        .service("video.ended", |emitter| {
            InvokeHandle::task(tokio::spawn(async move {
                tokio::time::sleep(VIDEO_LENGTH).await;
                emitter.emit("video.ended");
            }))
        })
        .service("key.escape", move |emitter| {
            *keyboard.0.lock().unwrap() = Some(emitter);
            InvokeHandle::noop()
        });

    let machine = Machine::from_json(VIDEO, implementations).unwrap();
    Interpreter::new(machine, Player::default())
}

fn active(interpreter: &Interpreter<Player>) -> String {
    interpreter.snapshot().to_strings().join(" > ")
}

#[tokio::test(start_paused = true)]
async fn video_plays_to_the_end_and_returns_to_thumbnail() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    video.start().unwrap();
    assert_eq!(active(&video), "mini");

    video.send("toggle").unwrap();
    assert_eq!(active(&video), "full > full.playing");
    assert_eq!(video.running_invocations().len(), 2);

    // The video service reports the end of the video.
    video.next().await.unwrap();
    assert_eq!(active(&video), "full > full.stopped");

    // One second later the delayed transition fires.
    let stopped_at = tokio::time::Instant::now();
    video.next().await.unwrap();
    assert!(stopped_at.elapsed() >= Duration::from_millis(1000));
    assert_eq!(active(&video), "mini");

    assert_eq!(*video.context(), Player { plays: 1, pauses: 1 });
    assert!(video.running_invocations().is_empty());
    assert!(video.armed_timers().is_empty());

    let events: Vec<&str> = video
        .history()
        .transitions()
        .map(|record| record.event.as_str())
        .collect();
    assert_eq!(
        events,
        vec!["toggle", "video.ended", "after(1000)#Video.full.stopped"]
    );
}

#[tokio::test(start_paused = true)]
async fn escape_leaves_fullscreen_and_stops_the_video() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    video.start().unwrap();
    video.send("toggle").unwrap();

    assert!(keyboard.press_escape());
    video.process_pending().unwrap();
    assert_eq!(active(&video), "mini");

    // The aborted video task never reports the end.
    tokio::time::sleep(VIDEO_LENGTH * 2).await;
    video.process_pending().unwrap();
    assert_eq!(active(&video), "mini");
    assert!(!keyboard.press_escape());
    assert_eq!(video.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn toggle_from_a_nested_state_is_handled_by_the_parent() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    video.start().unwrap();
    video.send("toggle").unwrap();
    video.next().await.unwrap();
    assert_eq!(active(&video), "full > full.stopped");

    video.send("toggle").unwrap();

    assert_eq!(active(&video), "mini");
    assert_eq!(video.context().pauses, 1);
    assert!(video.armed_timers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timer_queued_behind_an_exiting_event_is_dropped() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    video.start().unwrap();
    video.send("toggle").unwrap();
    video.next().await.unwrap();
    assert_eq!(active(&video), "full > full.stopped");

    // `toggle` is queued first; the timer elapses while nothing is processed.
    let handle = video.handle();
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(handle.send("toggle"));
    tokio::time::sleep(Duration::from_millis(600)).await;

    video.process_pending().unwrap();

    assert_eq!(active(&video), "mini");
    assert_eq!(video.history().last().unwrap().event, "toggle");
    assert_eq!(video.history().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stop_pauses_and_releases_everything() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    video.subscribe(move |snapshot| {
        sink.lock().unwrap().push((snapshot.status, snapshot.value.clone()));
    });
    video.start().unwrap();
    video.send("toggle").unwrap();

    video.stop().unwrap();

    assert_eq!(video.status(), Status::Stopped);
    assert_eq!(video.context().pauses, 1);
    assert!(video.running_invocations().is_empty());
    assert!(!keyboard.press_escape());
    assert_eq!(
        seen.lock().unwrap().last().cloned(),
        Some((Status::Stopped, Vec::new()))
    );

    video.send(Event::new("toggle")).unwrap();
    assert_eq!(video.status(), Status::Stopped);
    assert!(matches!(video.next().await, Err(InterpreterError::Terminated)));
}

#[tokio::test(start_paused = true)]
async fn run_drives_the_machine_from_another_task() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);
    video.start().unwrap();
    let handle = video.handle();

    let driver = tokio::spawn(async move {
        handle.send("toggle");
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.stop();
    });

    video.run().await.unwrap();
    driver.await.unwrap();

    let events: Vec<&str> = video
        .history()
        .transitions()
        .map(|record| record.event.as_str())
        .collect();
    assert_eq!(
        events,
        vec!["toggle", "video.ended", "after(1000)#Video.full.stopped"]
    );
    assert_eq!(video.status(), Status::Stopped);
}

#[test]
fn starting_without_a_runtime_fails() {
    let keyboard = Keyboard::default();
    let mut video = player(&keyboard);

    let error = video.start().unwrap_err();

    assert!(matches!(error, InterpreterError::NoRuntime { ref machine } if machine == "Video"));
    assert_eq!(video.status(), Status::NotStarted);
}
