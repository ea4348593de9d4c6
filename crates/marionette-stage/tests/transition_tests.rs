//! Integration tests for scene transitions and backups.
//!
//! A persisted scene must come back exactly as it was left: same sprites and
//! ids, same in-flight sequences, same divisor, flags, peripherals, camera
//! focus and sound positions.

use marionette_stage::prelude::*;

fn project() -> ProjectDefinition {
    let cat = SpriteDefinition::new("cat").with_script(Script::on(
        EventId::Start,
        vec![
            Action::PlaySound {
                path: "theme.ogg".into(),
            },
            Action::SetFlash { on: true },
            Action::FocusCamera,
            Action::Forever {
                body: vec![Action::ChangeVariable {
                    name: "n".into(),
                    by: 1.0,
                }],
            },
        ],
    ));
    ProjectDefinition::new(vec![
        SceneDefinition::new("a").with_sprite(cat),
        SceneDefinition::new("b").with_sprite(SpriteDefinition::new("dog")),
    ])
}

fn stage(project: ProjectDefinition) -> StageRuntime {
    StageRuntime::new(project, StageConfig::default())
        .unwrap()
        .with_clock(ManualClock::new())
}

// ---------------------------------------------------------------------------
// Resume from backup
// ---------------------------------------------------------------------------

#[test]
fn persisted_scene_resumes_where_it_was_left() {
    let mut rt = stage(project());
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 10.0);
    let position = rt.sound().playing()[0].position;
    assert!(position > 0.0);
    assert_eq!(rt.divisor(), 11.0);

    assert!(rt.transition_to("b", true, true));
    assert_eq!(rt.scene().name(), "b");
    assert!(rt.has_backup("a"));
    assert!(rt.sound().playing().is_empty(), "outgoing audio must stop");
    assert!(!rt.peripherals().flash_on(), "flash is turned off on capture");
    assert_eq!(rt.camera().focus(), None);

    assert_eq!(rt.divisor(), 10.0, "a cold scene starts from the initial divisor");
    rt.tick(0.1);
    rt.tick(0.1);
    assert_eq!(rt.divisor(), 12.0);

    assert!(rt.transition_to("a", false, false));
    assert_eq!(rt.scene().name(), "a");
    assert!(!rt.has_backup("a"), "a backup is consumed when restored");
    assert_eq!(rt.sprite_id("cat"), Some(cat));
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 10.0);
    assert_eq!(rt.divisor(), 11.0);
    assert_eq!(rt.sound().playing().len(), 1);
    assert_eq!(rt.sound().playing()[0].position, position);
    assert!(rt.peripherals().flash_on());
    assert_eq!(rt.camera().focus(), Some(cat));

    // The loop carries on instead of restarting.
    rt.tick(0.1);
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 21.0);
    assert!((rt.sound().playing()[0].position - (position + 0.1)).abs() < 1e-9);
}

#[test]
fn leaving_without_persist_disposes_the_scene() {
    let mut rt = stage(project());
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();

    assert!(rt.transition_to("b", false, false));
    assert!(!rt.has_backup("a"));
    assert!(rt.sprite(cat).is_none());
    assert_eq!(rt.live_sprite_count(), 1);
    assert!(rt.scene().is_first_activation());
}

#[test]
fn transition_without_backup_cold_starts() {
    let mut rt = stage(project());
    rt.tick(0.1);
    rt.transition_to("b", false, false);
    rt.transition_to("a", false, false);

    let cat = rt.sprite_id("cat").unwrap();
    assert!(rt.scene().is_first_activation());
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 0.0);
    assert_eq!(rt.divisor(), 10.0);
    rt.tick(0.1);
    assert_eq!(rt.sprite(cat).unwrap().variable("n"), 10.0);
}

#[test]
fn fresh_entry_resets_the_divisor_but_resume_keeps_it() {
    let mut rt = stage(project());
    rt.run_ticks(5, 0.1);
    assert_eq!(rt.divisor(), 15.0);

    assert!(rt.transition_to("b", false, true));
    assert_eq!(rt.divisor(), 10.0);
    rt.tick(0.1);

    assert!(rt.transition_to("a", false, true));
    assert_eq!(rt.divisor(), 15.0, "the backup carries the learned divisor");

    assert!(rt.start_scene("a", false, false));
    assert_eq!(rt.divisor(), 10.0);
}

#[test]
fn stage_flags_come_back_with_the_backup() {
    let mut rt = stage(project());
    rt.tick(0.1);
    rt.set_paused(true);

    rt.transition_to("b", false, true);
    assert!(rt.is_paused(), "a fresh scene keeps the current flag");
    rt.set_paused(false);
    assert!(!rt.sound().is_paused());

    rt.transition_to("a", false, true);
    assert!(rt.is_paused());
    assert!(rt.sound().is_paused());
    assert!(rt.has_backup("b"));
}

// ---------------------------------------------------------------------------
// Start scene
// ---------------------------------------------------------------------------

#[test]
fn start_scene_discards_the_backup() {
    let mut rt = stage(project());
    rt.tick(0.1);
    let old_cat = rt.sprite_id("cat").unwrap();
    rt.transition_to("b", false, true);

    assert!(rt.start_scene("a", false, false));
    assert!(!rt.has_backup("a"));
    let cat = rt.sprite_id("cat").unwrap();
    assert_ne!(cat, old_cat);
    assert!(rt.scene().is_first_activation());
    assert_eq!(rt.live_sprite_count(), 1);
}

#[test]
fn start_scene_by_id_uses_declaration_order() {
    let mut rt = stage(project());
    assert!(rt.start_scene_by_id(1, false, false));
    assert_eq!(rt.scene().name(), "b");
    assert!(!rt.start_scene_by_id(7, false, false));
    assert_eq!(rt.scene().name(), "b");
}

#[test]
fn clear_scene_backup_releases_its_sprites() {
    let mut rt = stage(project());
    rt.tick(0.1);
    rt.transition_to("b", false, true);
    assert_eq!(rt.live_sprite_count(), 2);

    assert!(rt.clear_scene_backup("a"));
    assert!(!rt.clear_scene_backup("a"));
    assert_eq!(rt.live_sprite_count(), 1);
    assert!(rt.backups().is_empty());
}

#[test]
fn backed_up_clones_stay_alive_until_the_backup_goes() {
    let mut rt = stage(project());
    rt.tick(0.1);
    let cat = rt.sprite_id("cat").unwrap();
    rt.spawn_clone(cat, None).unwrap();
    assert_eq!(rt.live_clone_count(), 1);

    rt.transition_to("b", false, true);
    assert_eq!(rt.live_clone_count(), 1);
    assert!(rt.clear_scene_backup("a"));
    assert_eq!(rt.live_clone_count(), 0);
    assert_eq!(rt.live_sprite_count(), 1);
}

#[test]
fn unknown_scene_is_ignored() {
    let mut rt = stage(project());
    rt.tick(0.1);
    assert!(!rt.transition_to("nowhere", true, true));
    assert!(!rt.start_scene("nowhere", true, true));
    assert_eq!(rt.scene().name(), "a");
    assert!(rt.backups().is_empty());
    assert_eq!(rt.sound().playing().len(), 1);
}

// ---------------------------------------------------------------------------
// Script-issued transitions
// ---------------------------------------------------------------------------

#[test]
fn script_transition_ends_the_frame_early() {
    let door = SpriteDefinition::new("door").with_script(Script::on(
        EventId::Start,
        vec![
            Action::TransitionToScene {
                scene: "b".into(),
                stop_audio: false,
                persist: true,
            },
            Action::SetVariable {
                name: "after".into(),
                value: 1.0,
            },
        ],
    ));
    let project = ProjectDefinition::new(vec![
        SceneDefinition::new("a").with_sprite(door),
        SceneDefinition::new("b").with_sprite(SpriteDefinition::new("dog")),
    ]);
    let mut rt = stage(project);

    let diag = rt.tick(0.1).clone();
    assert_eq!(diag.substeps, 1);
    assert_eq!(rt.scene().name(), "b");
    assert!(rt.scene().is_first_activation());
    assert_eq!(rt.trace().frames()[0].substeps, 1);

    let backup = rt.backups().get("a").unwrap();
    let door = backup.scene().sprite_by_name("door").unwrap();
    assert_eq!(door.variable("after"), 1.0);
}

#[test]
fn script_start_scene_restarts_target() {
    let hopper = |to: &str| {
        SpriteDefinition::new("hopper").with_script(Script::on(
            EventId::Broadcast("hop".into()),
            vec![Action::StartScene {
                scene: to.into(),
                stop_audio: true,
                persist: true,
            }],
        ))
    };
    let project = ProjectDefinition::new(vec![
        SceneDefinition::new("a").with_sprite(hopper("b")),
        SceneDefinition::new("b").with_sprite(hopper("a")),
    ]);
    let mut rt = stage(project);
    rt.tick(0.01);

    rt.broadcast_event(Event::broadcast("hop"));
    rt.tick(0.01);
    assert_eq!(rt.scene().name(), "b");
    assert!(rt.has_backup("a"));

    rt.tick(0.01);
    rt.broadcast_event(Event::broadcast("hop"));
    rt.tick(0.01);
    assert_eq!(rt.scene().name(), "a");
    assert!(rt.scene().is_first_activation(), "start scene never resumes");
    assert!(rt.has_backup("b"));
    assert!(!rt.has_backup("a"));
}
