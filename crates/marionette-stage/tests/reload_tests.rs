//! Integration tests for reload, exit scripts, pause and shutdown.
//!
//! Exit scripts run when the reload is requested, against the intact runtime.
//! The teardown itself waits for the next tick.

use marionette_stage::prelude::*;

fn project() -> ProjectDefinition {
    let cat = SpriteDefinition::new("cat")
        .with_physics(PhysicsBody::dynamic_circle(0.5))
        .with_script(Script::on(
            EventId::Start,
            vec![
                Action::PlaySound {
                    path: "intro.ogg".into(),
                },
                Action::Forever {
                    body: vec![Action::ChangeVariable {
                        name: "n".into(),
                        by: 1.0,
                    }],
                },
            ],
        ))
        .with_script(Script::on_exit(vec![
            Action::SetGlobal {
                name: "sentinel".into(),
                value: 1.0,
            },
            Action::ChangeVariable {
                name: "exits".into(),
                by: 1.0,
            },
            Action::Broadcast {
                message: "ignored".into(),
            },
        ]));
    ProjectDefinition::new(vec![
        SceneDefinition::new("a").with_sprite(cat),
        SceneDefinition::new("b").with_sprite(SpriteDefinition::new("dog")),
    ])
    .with_global("score", 3.0)
}

fn stage() -> StageRuntime {
    StageRuntime::new(project(), StageConfig::default())
        .unwrap()
        .with_clock(ManualClock::new())
}

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

#[test]
fn exit_scripts_run_before_teardown() {
    let mut rt = stage();
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();
    let clone = rt.spawn_clone(cat, None).unwrap();
    let world = rt.scene().physics().id();

    assert!(rt.request_reload());
    // Exit scripts ran on the live runtime: nothing is torn down yet.
    assert_eq!(rt.global("sentinel"), 1.0);
    assert!(rt.is_reload_pending());
    assert!(!rt.scene().physics().is_disposed());
    assert_eq!(rt.scene().physics().id(), world);
    assert!(rt.sprite(clone).is_some());

    let diag = rt.tick(0.1).clone();
    assert!(diag.reloaded);
    assert!(!rt.is_reload_pending());
    assert_ne!(rt.scene().physics().id(), world);
    assert!(rt.sprite(clone).is_none());
    assert_eq!(rt.clone_registry().count(), 0);
    assert_eq!(rt.global("sentinel"), 0.0);
    assert_eq!(rt.global("score"), 3.0);
    assert!(rt.sound().playing().is_empty());
}

#[test]
fn reload_leaves_the_stage_paused_and_cold() {
    let mut rt = stage();
    rt.tick(0.1);
    rt.request_reload();
    rt.tick(0.1);

    assert!(rt.is_paused());
    assert!(rt.scene().is_first_activation());
    let cat = rt.sprite_id("cat").unwrap();
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 0.0);

    rt.set_paused(false);
    rt.tick(0.1);
    assert!(!rt.scene().is_first_activation());
    assert!(rt.sprite(cat).unwrap().variable("n") > 0.0);
}

#[test]
fn reload_restarts_the_divisor() {
    let mut rt = stage();
    rt.run_ticks(5, 0.1);
    assert_eq!(rt.divisor(), 15.0);

    rt.request_reload();
    let diag = rt.tick(0.1).clone();
    assert_eq!(rt.divisor(), 10.0);
    assert_eq!(diag.divisor_before, 10.0);
    assert_eq!(diag.divisor_after, 10.0);
}

#[test]
fn duplicate_reload_request_is_swallowed() {
    let mut rt = stage();
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();
    assert!(rt.request_reload());
    assert!(!rt.request_reload());
    assert_eq!(
        rt.sprite(cat).unwrap().variable("exits"),
        1.0,
        "exit scripts must not run twice"
    );
}

#[test]
fn reload_returns_to_start_scene_and_drops_backups() {
    let mut rt = stage();
    rt.tick(0.1);
    rt.transition_to("b", false, true);
    assert!(rt.has_backup("a"));

    rt.request_reload();
    rt.tick(0.1);
    assert_eq!(rt.scene().name(), "a");
    assert!(rt.backups().is_empty());
    assert_eq!(rt.live_sprite_count(), 1);
}

#[test]
fn pause_and_resume_are_ignored_while_reload_is_pending() {
    let mut rt = stage();
    rt.tick(0.1);
    rt.request_reload();

    rt.set_paused(true);
    assert!(!rt.is_paused());

    rt.tick(0.1);
    assert!(rt.is_paused());
    rt.set_paused(false);
    assert!(!rt.is_paused());
}

// ---------------------------------------------------------------------------
// Exit scripts and shutdown
// ---------------------------------------------------------------------------

#[test]
fn exit_scripts_can_be_run_directly() {
    let mut rt = stage();
    rt.tick(0.1);
    assert_eq!(rt.execute_exit_scripts(), 1);
    assert_eq!(rt.global("sentinel"), 1.0);
    assert!(!rt.is_reload_pending());
}

#[test]
fn endless_exit_script_is_bounded() {
    let looper = SpriteDefinition::new("looper").with_script(Script::on_exit(vec![
        Action::Forever {
            body: vec![Action::ChangeVariable {
                name: "spins".into(),
                by: 1.0,
            }],
        },
    ]));
    let config = StageConfig {
        exit_script_step_limit: 25,
        ..Default::default()
    };
    let mut rt = StageRuntime::new(
        ProjectDefinition::new(vec![SceneDefinition::new("main").with_sprite(looper)]),
        config,
    )
    .unwrap();
    rt.tick(0.01);

    assert_eq!(rt.execute_exit_scripts(), 1);
    let looper = rt.sprite_id("looper").unwrap();
    assert_eq!(rt.sprite(looper).unwrap().variable("spins"), 25.0);
}

#[test]
fn shutdown_runs_exit_scripts_then_releases_everything() {
    let mut rt = stage();
    rt.tick(0.1);
    rt.transition_to("b", false, true);
    rt.transition_to("a", false, true);

    rt.shutdown();
    assert_eq!(rt.global("sentinel"), 1.0);
    assert!(rt.is_shut_down());
    assert!(rt.is_finished());
    assert_eq!(rt.live_sprite_count(), 0);
    assert!(rt.backups().is_empty());
    assert!(rt.scene().physics().is_disposed());
}

#[test]
fn finished_stage_stops_simulating() {
    let mut rt = stage();
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();
    rt.finish();
    rt.run_ticks(3, 0.1);
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 10.0);
    assert!(rt.sound().is_paused());
}
