//! Video Player Statechart
//!
//! This example drives a nested machine with a delayed transition and two
//! invoked services.
//!
//! Key concepts:
//! - Events handled by a parent state while a child is active
//! - Invoked services that live as long as their state
//! - A delayed transition cancelled when its state exits
//! - Observing snapshots after every step
//!
//! Run with: RUST_LOG=debug cargo run --example video_player

use statewise::builder::{MachineBuilder, StateBuilder, TransitionConfig};
use statewise::runtime::{Implementations, Interpreter, InvokeHandle};
use std::time::Duration;

#[derive(Clone, Debug, Default)]
struct Player {
    plays: u32,
    pauses: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Video Player Statechart ===\n");

    let machine = MachineBuilder::new("Video")
        .initial("mini")
        .state(
            StateBuilder::new("mini")
                .description("The video as a small thumbnail")
                .on("toggle", TransitionConfig::to("full").description("User clicks video")),
        )
        .state(
            StateBuilder::new("full")
                .description("Video playing fullscreen")
                .entry("playVideo")
                .exit("pauseVideo")
                .invoke("video.ended")
                .initial("playing")
                .state(StateBuilder::new("playing").on("video.ended", "stopped"))
                .state(StateBuilder::new("stopped").after(Duration::from_millis(1000), "#Video.mini"))
                .on("toggle", TransitionConfig::to("mini").description("User clicks video")),
        )
        .build_machine(
            Implementations::new()
                .action("playVideo", |player: &mut Player, _| {
                    player.plays += 1;
                    println!("  > playing (play #{})", player.plays);
                    Ok(())
                })
                .action("pauseVideo", |player: &mut Player, _| {
                    player.pauses += 1;
                    println!("  > paused");
                    Ok(())
                })
                .service("video.ended", |emitter| {
                    InvokeHandle::task(tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(1500)).await;
                        emitter.emit("video.ended");
                    }))
                }),
        )
        .expect("video machine definition is valid");

    let mut video = Interpreter::new(machine, Player::default());
    video.subscribe(|snapshot| {
        let event = snapshot.event.as_ref().map(|e| e.name()).unwrap_or("-");
        println!("[{event}] {:?}", snapshot.to_strings());
    });

    video.start().expect("start");

    println!("\nClick the thumbnail, then watch to the end:");
    video.send("toggle").expect("toggle");

    let handle = video.handle();
    tokio::spawn(async move {
        // Video ends at 1.5s, the thumbnail returns at 2.5s.
        tokio::time::sleep(Duration::from_millis(3000)).await;
        println!("\nClick again and leave before the video ends:");
        handle.send("toggle");
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.send("toggle");
        tokio::time::sleep(Duration::from_millis(2000)).await;
        handle.stop();
    });

    video.run().await.expect("run");

    println!("\nHistory:");
    for record in video.history().transitions() {
        println!("  {:<32} {:?} -> {:?}", record.event, record.from, record.to);
    }
    println!(
        "\nPlayed {} times, paused {} times",
        video.context().plays,
        video.context().pauses
    );

    println!("\n=== Example Complete ===");
}
