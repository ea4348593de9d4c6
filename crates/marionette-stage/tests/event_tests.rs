//! Integration tests for event routing: host input, broadcasts between
//! sprites and condition triggers.

use marionette_stage::prelude::*;

fn set(name: &str, value: f64) -> Action {
    Action::SetVariable {
        name: name.into(),
        value,
    }
}

fn stage(sprites: Vec<SpriteDefinition>) -> StageRuntime {
    let scene = sprites
        .into_iter()
        .fold(SceneDefinition::new("main"), SceneDefinition::with_sprite);
    let mut rt = StageRuntime::new(ProjectDefinition::new(vec![scene]), StageConfig::default())
        .unwrap()
        .with_clock(ManualClock::new());
    rt.tick(0.01);
    rt
}

#[test]
fn host_events_reach_only_their_listeners() {
    let player = SpriteDefinition::new("player")
        .with_script(Script::on(
            EventId::Gamepad(GamepadButton::A),
            vec![set("jumped", 1.0)],
        ))
        .with_script(Script::on(EventId::BackPressed, vec![set("back", 1.0)]));
    let mut rt = stage(vec![player]);
    let player = rt.sprite_id("player").unwrap();

    rt.broadcast_event(Event::gamepad(GamepadButton::A));
    rt.tick(0.01);
    let sprite = rt.sprite(player).unwrap();
    assert_eq!(sprite.variable("jumped"), 1.0);
    assert_eq!(sprite.variable("back"), 0.0);

    rt.broadcast_event(EventId::BackPressed);
    rt.tick(0.01);
    assert_eq!(rt.sprite(player).unwrap().variable("back"), 1.0);
}

#[test]
fn broadcast_from_a_script_reaches_other_sprites_next_substep() {
    let sender = SpriteDefinition::new("sender").with_script(Script::on(
        EventId::Start,
        vec![Action::Broadcast {
            message: "ping".into(),
        }],
    ));
    let receiver = SpriteDefinition::new("receiver").with_script(Script::on(
        EventId::Broadcast("ping".into()),
        vec![Action::ChangeVariable {
            name: "pings".into(),
            by: 1.0,
        }],
    ));
    let rt = stage(vec![sender, receiver]);
    let receiver = rt.sprite_id("receiver").unwrap();
    assert_eq!(rt.sprite(receiver).unwrap().variable("pings"), 1.0);
}

#[test]
fn firing_again_restarts_the_script() {
    let walker = SpriteDefinition::new("walker").with_script(Script::on(
        EventId::Broadcast("walk".into()),
        vec![
            set("progress", 0.0),
            Action::Wait { seconds: 1.0 },
            set("progress", 1.0),
        ],
    ));
    let mut rt = stage(vec![walker]);
    let walker = rt.sprite_id("walker").unwrap();

    rt.broadcast_event(Event::broadcast("walk"));
    rt.tick(0.6);
    rt.broadcast_event(Event::broadcast("walk"));
    rt.tick(0.6);
    assert_eq!(rt.sprite(walker).unwrap().variable("progress"), 0.0);
    assert_eq!(rt.sprite(walker).unwrap().active_sequence_count(), 1);

    rt.tick(0.6);
    assert_eq!(rt.sprite(walker).unwrap().variable("progress"), 1.0);
}

#[test]
fn disabled_scripts_never_start() {
    let sprite = SpriteDefinition::new("cat")
        .with_script(Script::on(EventId::Start, vec![set("ran", 1.0)]).disabled());
    let rt = stage(vec![sprite]);
    let cat = rt.sprite_id("cat").unwrap();
    assert_eq!(rt.sprite(cat).unwrap().variable("ran"), 0.0);
}

#[test]
fn condition_scripts_fire_on_rising_edge() {
    let sprite = SpriteDefinition::new("cat")
        .with_script(Script::on(
            EventId::Broadcast("grow".into()),
            vec![Action::ChangeVariable {
                name: "size".into(),
                by: 1.0,
            }],
        ))
        .with_script(Script::new(
            Trigger::When(Condition::new("size", Comparison::GreaterOrEqual, 2.0)),
            vec![Action::ChangeVariable {
                name: "big".into(),
                by: 1.0,
            }],
        ));
    let mut rt = stage(vec![sprite]);
    let cat = rt.sprite_id("cat").unwrap();

    rt.broadcast_event(Event::broadcast("grow"));
    rt.tick(0.01);
    assert_eq!(rt.sprite(cat).unwrap().variable("big"), 0.0);

    for _ in 0..3 {
        rt.broadcast_event(Event::broadcast("grow"));
        rt.tick(0.01);
    }
    assert_eq!(rt.sprite(cat).unwrap().variable("size"), 4.0);
    assert_eq!(rt.sprite(cat).unwrap().variable("big"), 1.0);
}

#[test]
fn failing_script_is_cancelled_and_reported() {
    let sprite = SpriteDefinition::new("cat")
        .with_looks(["only"])
        .with_script(Script::on(
            EventId::Start,
            vec![Action::SwitchLook { index: 3 }, set("after", 1.0)],
        ))
        .with_script(Script::on(EventId::Start, vec![set("other", 1.0)]));
    let scene = SceneDefinition::new("main").with_sprite(sprite);
    let mut rt = StageRuntime::new(ProjectDefinition::new(vec![scene]), StageConfig::default())
        .unwrap()
        .with_clock(ManualClock::new());

    let diag = rt.tick(0.01).clone();
    assert_eq!(diag.script_failures, 1);
    let cat = rt.sprite_id("cat").unwrap();
    assert_eq!(rt.sprite(cat).unwrap().variable("after"), 0.0);
    assert_eq!(rt.sprite(cat).unwrap().variable("other"), 1.0);
}

#[test]
fn listeners_lists_every_matching_script() {
    let a = SpriteDefinition::new("a")
        .with_script(Script::on(EventId::BackPressed, vec![]))
        .with_script(Script::on(EventId::Start, vec![]))
        .with_script(Script::on(EventId::BackPressed, vec![]).disabled());
    let b = SpriteDefinition::new("b").with_script(Script::on(EventId::BackPressed, vec![]));
    let rt = stage(vec![a, b]);

    let found = listeners(&EventId::BackPressed, rt.scene().sprites());
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].script_index, 0);
    assert_eq!(found[1].sprite, rt.sprite_id("b").unwrap());
}
