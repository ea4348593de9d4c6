//! Sprites: scripted actors.
//!
//! A [`Sprite`] owns its [`Look`], its local variables, and one
//! [`ActionSequence`] slot per script. Script definitions are shared behind
//! [`Arc`], so a clone carries the same script graph as its source while
//! getting fresh sequences and its own variable copy.

use std::sync::Arc;

use crate::command::StageCommandBuffer;
use crate::event::EventId;
use crate::look::Look;
use crate::script::{Script, Variables};
use crate::sequence::{ActionSequence, ScriptContext};
use crate::sprite_id::SpriteId;
use crate::ScriptError;

/// A scripted actor.
#[derive(Debug, Clone)]
pub struct Sprite {
    id: SpriteId,
    name: String,
    look: Look,
    scripts: Vec<Arc<Script>>,
    variables: Variables,
    sequences: Vec<ActionSequence>,
    /// Last observed value of each `When` condition, indexed like `scripts`.
    condition_states: Vec<bool>,
    original: Option<SpriteId>,
    invalidated: bool,
}

impl Sprite {
    pub fn new(
        id: SpriteId,
        name: impl Into<String>,
        look: Look,
        scripts: Vec<Arc<Script>>,
        variables: Variables,
    ) -> Self {
        let condition_states = vec![false; scripts.len()];
        Self {
            id,
            name: name.into(),
            look,
            scripts,
            variables,
            sequences: Vec::new(),
            condition_states,
            original: None,
            invalidated: false,
        }
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn look(&self) -> &Look {
        &self.look
    }

    pub fn look_mut(&mut self) -> &mut Look {
        &mut self.look
    }

    pub fn scripts(&self) -> &[Arc<Script>] {
        &self.scripts
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn variable(&self, name: &str) -> f64 {
        self.variables.get(name).copied().unwrap_or(0.0)
    }

    pub fn sequences(&self) -> &[ActionSequence] {
        &self.sequences
    }

    /// Number of sequences that are neither completed nor cancelled.
    pub fn active_sequence_count(&self) -> usize {
        self.sequences.iter().filter(|s| !s.is_finished()).count()
    }

    pub fn is_clone(&self) -> bool {
        self.original.is_some()
    }

    /// The root sprite this clone descends from. `None` for non-clones.
    pub fn original(&self) -> Option<SpriteId> {
        self.original
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    // -- scripts ------------------------------------------------------------

    /// Start every script listening to `event`. A script that already has a
    /// sequence is restarted from its first action. Returns how many scripts
    /// were started.
    pub fn fire(&mut self, event: &EventId) -> usize {
        if self.invalidated {
            return 0;
        }
        let mut started = 0;
        for index in 0..self.scripts.len() {
            if self.scripts[index].listens_to(event) {
                self.arm(index);
                started += 1;
            }
        }
        started
    }

    /// Record the current value of every `When` condition without starting
    /// anything, so that only a later false-to-true edge fires the script.
    /// Conditions already true at initialization start right away.
    pub fn init_condition_triggers(&mut self) {
        for index in 0..self.scripts.len() {
            let Some(condition) = self.scripts[index].condition() else {
                continue;
            };
            let holds = condition.evaluate(&self.variables);
            self.condition_states[index] = holds;
            if holds {
                self.arm(index);
            }
        }
    }

    /// Start `When` scripts whose condition just became true.
    pub fn check_conditions(&mut self) -> usize {
        if self.invalidated {
            return 0;
        }
        let mut started = 0;
        for index in 0..self.scripts.len() {
            let Some(condition) = self.scripts[index].condition() else {
                continue;
            };
            let holds = condition.evaluate(&self.variables);
            let was = std::mem::replace(&mut self.condition_states[index], holds);
            if holds && !was {
                self.arm(index);
                started += 1;
            }
        }
        started
    }

    fn arm(&mut self, script_index: usize) {
        if let Some(existing) = self
            .sequences
            .iter_mut()
            .find(|s| s.script_index() == script_index)
        {
            existing.restart();
        } else {
            self.sequences.push(ActionSequence::new(
                Arc::clone(&self.scripts[script_index]),
                script_index,
            ));
        }
    }

    /// Step every unfinished sequence by `dt`.
    ///
    /// A sequence that fails is cancelled and its error collected; the other
    /// sequences still run. Finished sequences are dropped afterwards.
    pub fn advance(
        &mut self,
        dt: f64,
        globals: &mut Variables,
        commands: &mut StageCommandBuffer,
    ) -> Vec<ScriptError> {
        let mut errors = Vec::new();
        if self.invalidated {
            return errors;
        }
        let mut ctx = ScriptContext {
            sprite: self.id,
            look: &mut self.look,
            variables: &mut self.variables,
            globals,
            commands,
        };
        for sequence in self.sequences.iter_mut() {
            if sequence.is_finished() {
                continue;
            }
            if let Err(err) = sequence.step(dt, &mut ctx) {
                tracing::debug!(
                    sprite = %ctx.sprite,
                    script = sequence.script_index(),
                    error = %err,
                    "script failed, sequence cancelled"
                );
                sequence.cancel();
                errors.push(err);
            }
        }
        self.sequences.retain(|s| !s.is_finished());
        errors
    }

    /// Cancel every in-flight sequence.
    pub fn cancel_all(&mut self) {
        for sequence in self.sequences.iter_mut() {
            sequence.cancel();
        }
        self.sequences.clear();
    }

    /// Force-run every enabled exit script to completion.
    ///
    /// Each exit script gets a fresh sequence stepped with an unbounded delta;
    /// see [`ActionSequence::run_to_completion`]. Returns how many exit
    /// scripts ran, plus the errors of those that failed.
    pub fn run_exit_scripts(
        &mut self,
        globals: &mut Variables,
        commands: &mut StageCommandBuffer,
        step_limit: u32,
    ) -> (usize, Vec<ScriptError>) {
        let mut ran = 0;
        let mut errors = Vec::new();
        if self.invalidated {
            return (ran, errors);
        }
        let mut ctx = ScriptContext {
            sprite: self.id,
            look: &mut self.look,
            variables: &mut self.variables,
            globals,
            commands,
        };
        for (index, script) in self.scripts.iter().enumerate() {
            if !script.is_exit() {
                continue;
            }
            let mut sequence = ActionSequence::new(Arc::clone(script), index);
            ran += 1;
            if let Err(err) = sequence.run_to_completion(&mut ctx, step_limit) {
                errors.push(err);
            }
        }
        (ran, errors)
    }

    /// Build a clone of this sprite with identity `id`.
    ///
    /// The clone shares script definitions, copies variables and the look
    /// (including the current frame), and starts with no sequences. Its
    /// original is this sprite's original when this sprite is itself a clone,
    /// so ancestry is always one hop.
    pub fn make_clone(&self, id: SpriteId, name: impl Into<String>) -> Sprite {
        let mut look = self.look.duplicate();
        if let Some(frame) = self.look.current_frame() {
            // Same frame list, so the index is always in range.
            let _ = look.set_frame(frame);
        }
        Sprite {
            id,
            name: name.into(),
            look,
            scripts: self.scripts.clone(),
            variables: self.variables.clone(),
            sequences: Vec::new(),
            condition_states: self.condition_states.clone(),
            original: Some(self.original.unwrap_or(self.id)),
            invalidated: false,
        }
    }

    /// Release the look and mark the sprite unusable. Idempotent.
    pub fn invalidate(&mut self) {
        self.cancel_all();
        self.look.dispose();
        self.invalidated = true;
    }

    /// Drop all sequences, show the first look frame and forget condition
    /// edges. Used when a scene is cold-started.
    pub fn reset_runtime_state(&mut self) {
        self.cancel_all();
        self.look.reset_to_first_frame();
        self.condition_states.iter_mut().for_each(|s| *s = false);
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::StageCommand;
    use crate::look::LookFlags;
    use crate::script::{Action, Comparison, Condition, Trigger};

    fn sprite(scripts: Vec<Script>) -> Sprite {
        Sprite::new(
            SpriteId::new(0, 0),
            "cat",
            Look::new(
                vec!["a".into(), "b".into(), "c".into()],
                0.0,
                0.0,
                LookFlags::default(),
            ),
            scripts.into_iter().map(Arc::new).collect(),
            Variables::new(),
        )
    }

    fn set(name: &str, value: f64) -> Action {
        Action::SetVariable {
            name: name.to_owned(),
            value,
        }
    }

    #[test]
    fn fire_starts_only_matching_scripts() {
        let mut s = sprite(vec![
            Script::on(EventId::Start, vec![set("a", 1.0)]),
            Script::on(EventId::BackPressed, vec![set("b", 1.0)]),
        ]);
        assert_eq!(s.fire(&EventId::Start), 1);
        let mut globals = Variables::new();
        let mut cmds = StageCommandBuffer::new();
        assert!(s.advance(0.1, &mut globals, &mut cmds).is_empty());
        assert_eq!(s.variable("a"), 1.0);
        assert_eq!(s.variable("b"), 0.0);
        assert_eq!(s.active_sequence_count(), 0);
    }

    #[test]
    fn firing_again_restarts_the_running_sequence() {
        let mut s = sprite(vec![Script::on(
            EventId::Start,
            vec![
                Action::Wait { seconds: 1.0 },
                Action::ChangeVariable {
                    name: "n".into(),
                    by: 1.0,
                },
            ],
        )]);
        let mut globals = Variables::new();
        let mut cmds = StageCommandBuffer::new();
        s.fire(&EventId::Start);
        s.advance(0.8, &mut globals, &mut cmds);
        s.fire(&EventId::Start);
        s.advance(0.8, &mut globals, &mut cmds);
        assert_eq!(s.variable("n"), 0.0, "restart discards the elapsed wait");
        assert_eq!(s.sequences().len(), 1);
        s.advance(0.3, &mut globals, &mut cmds);
        assert_eq!(s.variable("n"), 1.0);
    }

    #[test]
    fn condition_scripts_fire_on_rising_edge() {
        let mut s = sprite(vec![
            Script::on(EventId::Start, vec![set("hp", 5.0)]),
            Script::new(
                Trigger::When(Condition::new("hp", Comparison::Greater, 3.0)),
                vec![Action::ChangeVariable {
                    name: "hits".into(),
                    by: 1.0,
                }],
            ),
        ]);
        let mut globals = Variables::new();
        let mut cmds = StageCommandBuffer::new();
        s.init_condition_triggers();
        s.fire(&EventId::Start);
        s.advance(0.1, &mut globals, &mut cmds);
        assert_eq!(s.check_conditions(), 1);
        s.advance(0.1, &mut globals, &mut cmds);
        assert_eq!(s.check_conditions(), 0, "still true, no new edge");
        assert_eq!(s.variable("hits"), 1.0);
    }

    #[test]
    fn failing_sequence_is_cancelled_others_continue() {
        let mut s = sprite(vec![
            Script::on(EventId::Start, vec![Action::SwitchLook { index: 7 }]),
            Script::on(EventId::Start, vec![set("ok", 1.0)]),
        ]);
        let mut globals = Variables::new();
        let mut cmds = StageCommandBuffer::new();
        s.fire(&EventId::Start);
        let errors = s.advance(0.1, &mut globals, &mut cmds);
        assert_eq!(errors.len(), 1);
        assert_eq!(s.variable("ok"), 1.0);
        assert_eq!(s.active_sequence_count(), 0);
    }

    #[test]
    fn exit_scripts_run_to_completion_ignoring_waits() {
        let mut s = sprite(vec![
            Script::on_exit(vec![
                Action::Wait { seconds: 60.0 },
                Action::SetGlobal {
                    name: "sentinel".into(),
                    value: 1.0,
                },
                Action::Broadcast {
                    message: "bye".into(),
                },
            ]),
            Script::on_exit(vec![set("x", 1.0)]).disabled(),
        ]);
        let mut globals = Variables::new();
        let mut cmds = StageCommandBuffer::new();
        let (ran, errors) = s.run_exit_scripts(&mut globals, &mut cmds, 100);
        assert_eq!(ran, 1);
        assert!(errors.is_empty());
        assert_eq!(globals.get("sentinel"), Some(&1.0));
        assert_eq!(s.variable("x"), 0.0);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(
            cmds.commands()[0].command,
            StageCommand::Broadcast { .. }
        ));
    }

    #[test]
    fn clone_of_clone_points_at_root() {
        let mut root = sprite(vec![Script::on(EventId::Start, Vec::new())]);
        root.look_mut().set_frame(2).unwrap();
        root.variables_mut().insert("speed".into(), 4.0);

        let first = root.make_clone(SpriteId::new(1, 0), "cat-c1");
        let second = first.make_clone(SpriteId::new(2, 0), "cat-c2");

        assert_eq!(first.original(), Some(root.id()));
        assert_eq!(second.original(), Some(root.id()));
        assert!(!root.is_clone());
        assert_eq!(second.look().current_frame(), Some(2));
        assert_eq!(second.variable("speed"), 4.0);
        assert!(Arc::ptr_eq(&root.scripts()[0], &second.scripts()[0]));
        assert!(second.sequences().is_empty());
    }

    #[test]
    fn invalidated_sprite_ignores_events() {
        let mut s = sprite(vec![Script::on(EventId::Start, vec![set("a", 1.0)])]);
        s.invalidate();
        s.invalidate();
        assert!(s.is_invalidated());
        assert!(s.look().is_disposed());
        assert_eq!(s.fire(&EventId::Start), 0);
    }
}
