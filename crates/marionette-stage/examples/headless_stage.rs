//! Headless stage demo -- two scenes, a clone spawner and a scene switch.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example headless_stage -p marionette-stage
//!
//! The project is loaded from JSON, run for a few seconds of simulated time,
//! and a screenshot of the last frame is printed.

use std::sync::{Arc, Mutex};

use marionette_stage::prelude::*;

const PROJECT: &str = r#"{
    "globals": { "visits": 0 },
    "scenes": [
        {
            "name": "meadow",
            "sprites": [
                {
                    "name": "sheep",
                    "looks": ["graze", "look_up"],
                    "position": [0.0, 0.0],
                    "scripts": [
                        {
                            "trigger": { "On": "Start" },
                            "actions": [
                                "FocusCamera",
                                { "Repeat": { "times": 3, "body": [
                                    "CreateClone",
                                    { "Wait": { "seconds": 0.5 } }
                                ] } },
                                { "TransitionToScene": { "scene": "barn", "stop_audio": true, "persist": true } }
                            ]
                        },
                        {
                            "trigger": { "On": "StartAsClone" },
                            "actions": [
                                { "GlideTo": { "x": 5.0, "y": 2.0, "seconds": 1.0 } },
                                "NextLook"
                            ]
                        }
                    ]
                }
            ]
        },
        {
            "name": "barn",
            "sprites": [
                {
                    "name": "door",
                    "scripts": [
                        {
                            "trigger": { "On": "Start" },
                            "actions": [
                                { "SetGlobal": { "name": "visits", "value": 1 } },
                                { "Wait": { "seconds": 1.0 } },
                                { "TransitionToScene": { "scene": "meadow", "stop_audio": false, "persist": false } }
                            ]
                        }
                    ]
                }
            ]
        }
    ]
}"#;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let project: ProjectDefinition = serde_json::from_str(PROJECT)?;
    let config = StageConfig::from_json_str(r#"{ "step_budget_ms": 4 }"#)?;
    let store = MemoryScreenshotStore::new();
    let mut stage = StageRuntime::new(project, config)?.with_screenshot_store(store.clone());

    let frame_dt = 1.0 / 60.0;
    for frame in 0..300 {
        let diag = stage.tick(frame_dt).clone();
        if frame % 60 == 0 {
            println!(
                "frame {frame:>3}: scene={} substeps={} divisor={}",
                stage.scene().name(),
                diag.substeps,
                diag.divisor_after
            );
        }
    }

    let outcome = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&outcome);
    stage.request_screenshot(
        MANUAL_SCREENSHOT,
        Box::new(move |result| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(result);
            }
        }),
    );
    stage.tick(frame_dt);

    println!("visits: {}", stage.global("visits"));
    println!("backups: {:?}", stage.backups().names());
    println!("screenshot: {:?}", outcome.lock().ok().and_then(|o| *o));
    if let Some(bytes) = store.get(MANUAL_SCREENSHOT) {
        print!("{}", String::from_utf8_lossy(&bytes));
    }
    println!("trace fingerprint: {}", stage.trace().fingerprint());

    stage.shutdown();
    Ok(())
}
