//! Resumable execution of one script.
//!
//! An [`ActionSequence`] is an explicit state machine: a stack of loop frames
//! (each holding a program counter into its block) plus an optional timer for
//! the time-consuming action in progress. [`ActionSequence::step`] advances it
//! by a virtual time delta and returns promptly with a [`StepStatus`]; nothing
//! ever blocks the calling thread.
//!
//! Rules:
//!
//! - Instant actions run back to back within one step.
//! - `Wait` and `GlideTo` consume virtual time. Any delta left over after they
//!   finish is carried into the following actions of the same step.
//! - Loops yield ([`StepStatus::Running`]) at the end of every iteration, so a
//!   `Forever` loop without waits still hands control back once per step.

use std::sync::Arc;

use crate::command::{StageCommand, StageCommandBuffer};
use crate::look::Look;
use crate::script::{Action, Script, Variables};
use crate::sprite_id::SpriteId;
use crate::ScriptError;

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// Lifecycle state of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Armed but not stepped yet.
    Idle,
    Running,
    /// Blocked on a timer; resumes when stepped with more time.
    Waiting,
    Completed,
    /// Discarded by teardown or reset before completing.
    Cancelled,
}

/// Result of one [`ActionSequence::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Yielded at a loop iteration boundary.
    Running,
    /// Blocked on a timer that needs more virtual time.
    Waiting,
    Completed,
}

/// Everything an action may touch while its sequence is stepped.
pub struct ScriptContext<'a> {
    pub sprite: SpriteId,
    pub look: &'a mut Look,
    pub variables: &'a mut Variables,
    pub globals: &'a mut Variables,
    pub commands: &'a mut StageCommandBuffer,
}

// ---------------------------------------------------------------------------
// Cursor internals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopCounter {
    /// The script's top-level block.
    Once,
    Times(u32),
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    pc: usize,
    counter: LoopCounter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Timer {
    Wait {
        remaining: f64,
    },
    Glide {
        from: (f64, f64),
        to: (f64, f64),
        duration: f64,
        elapsed: f64,
    },
}

impl Timer {
    /// Consume up to `budget` seconds. Returns `(consumed, finished)`.
    fn advance(&mut self, budget: f64, look: &mut Look) -> (f64, bool) {
        match self {
            Timer::Wait { remaining } => {
                let consumed = budget.min(*remaining).max(0.0);
                *remaining -= consumed;
                (consumed, *remaining <= 0.0)
            }
            Timer::Glide {
                from,
                to,
                duration,
                elapsed,
            } => {
                if *duration <= 0.0 {
                    look.set_position(to.0, to.1);
                    return (0.0, true);
                }
                let remaining = *duration - *elapsed;
                let consumed = budget.min(remaining).max(0.0);
                *elapsed = if consumed >= remaining {
                    *duration
                } else {
                    *elapsed + consumed
                };
                let t = (*elapsed / *duration).min(1.0);
                look.set_position(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
                (consumed, *elapsed >= *duration)
            }
        }
    }
}

/// Walk the frame stack down to the block the innermost frame executes.
fn block_at<'s>(actions: &'s [Action], frames: &[Frame]) -> Option<&'s [Action]> {
    let mut block = actions;
    for frame in &frames[..frames.len().saturating_sub(1)] {
        block = block.get(frame.pc)?.body()?;
    }
    Some(block)
}

// ---------------------------------------------------------------------------
// ActionSequence
// ---------------------------------------------------------------------------

/// A resumable run of one script on one sprite.
#[derive(Debug, Clone)]
pub struct ActionSequence {
    script: Arc<Script>,
    script_index: usize,
    frames: Vec<Frame>,
    timer: Option<Timer>,
    state: SequenceState,
}

impl ActionSequence {
    /// Arm a new sequence for the script at `script_index` of its sprite.
    pub fn new(script: Arc<Script>, script_index: usize) -> Self {
        Self {
            script,
            script_index,
            frames: vec![Frame {
                pc: 0,
                counter: LoopCounter::Once,
            }],
            timer: None,
            state: SequenceState::Idle,
        }
    }

    pub fn script_index(&self) -> usize {
        self.script_index
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Completed or cancelled.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            SequenceState::Completed | SequenceState::Cancelled
        )
    }

    /// Rewind to the first action and re-arm.
    pub fn restart(&mut self) {
        self.frames.clear();
        self.frames.push(Frame {
            pc: 0,
            counter: LoopCounter::Once,
        });
        self.timer = None;
        self.state = SequenceState::Idle;
    }

    /// Discard the sequence. In-flight waits are dropped.
    pub fn cancel(&mut self) {
        if !self.is_finished() {
            self.state = SequenceState::Cancelled;
        }
        self.timer = None;
    }

    /// Advance by `dt` seconds of virtual time.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScriptError`] raised by an action. The sequence is
    /// left where it failed; the caller decides whether to cancel it.
    pub fn step(
        &mut self,
        dt: f64,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<StepStatus, ScriptError> {
        if self.is_finished() {
            return Ok(StepStatus::Completed);
        }
        self.state = SequenceState::Running;
        let script = Arc::clone(&self.script);
        let mut budget = dt.max(0.0);

        loop {
            if let Some(timer) = self.timer.as_mut() {
                let (consumed, finished) = timer.advance(budget, ctx.look);
                budget -= consumed;
                if !finished {
                    self.state = SequenceState::Waiting;
                    return Ok(StepStatus::Waiting);
                }
                self.timer = None;
                self.advance_pc();
                continue;
            }

            let Some(block) = block_at(&script.actions, &self.frames) else {
                // The cursor no longer matches the script shape.
                self.state = SequenceState::Completed;
                return Ok(StepStatus::Completed);
            };
            let depth = self.frames.len() - 1;
            let frame = self.frames[depth];

            if frame.pc >= block.len() {
                match frame.counter {
                    LoopCounter::Once => {
                        self.state = SequenceState::Completed;
                        return Ok(StepStatus::Completed);
                    }
                    LoopCounter::Times(left) if left > 1 => {
                        self.frames[depth] = Frame {
                            pc: 0,
                            counter: LoopCounter::Times(left - 1),
                        };
                    }
                    LoopCounter::Forever => self.frames[depth].pc = 0,
                    LoopCounter::Times(_) => {
                        self.frames.pop();
                        self.advance_pc();
                    }
                }
                return Ok(StepStatus::Running);
            }

            match &block[frame.pc] {
                Action::Wait { seconds } => {
                    self.timer = Some(Timer::Wait {
                        remaining: seconds.max(0.0),
                    });
                }
                Action::GlideTo { x, y, seconds } => {
                    self.timer = Some(Timer::Glide {
                        from: ctx.look.position(),
                        to: (*x, *y),
                        duration: *seconds,
                        elapsed: 0.0,
                    });
                }
                Action::Repeat { times, .. } => {
                    if *times == 0 {
                        self.advance_pc();
                    } else {
                        self.frames.push(Frame {
                            pc: 0,
                            counter: LoopCounter::Times(*times),
                        });
                    }
                }
                Action::Forever { .. } => {
                    self.frames.push(Frame {
                        pc: 0,
                        counter: LoopCounter::Forever,
                    });
                }
                Action::DeleteThisClone => {
                    ctx.commands.push(ctx.sprite, StageCommand::DeleteThisClone);
                    self.state = SequenceState::Completed;
                    return Ok(StepStatus::Completed);
                }
                instant => {
                    run_instant(instant, ctx)?;
                    self.advance_pc();
                }
            }
        }
    }

    /// Force the sequence to completion with an unbounded time delta.
    ///
    /// Loop yields are stepped through until the sequence completes or
    /// `step_limit` steps have run; a sequence still running after that (an
    /// endless loop) is treated as complete. Returns the number of steps used.
    pub fn run_to_completion(
        &mut self,
        ctx: &mut ScriptContext<'_>,
        step_limit: u32,
    ) -> Result<u32, ScriptError> {
        let mut steps = 0;
        while steps < step_limit.max(1) {
            steps += 1;
            match self.step(f64::MAX, ctx)? {
                StepStatus::Running => continue,
                StepStatus::Waiting | StepStatus::Completed => break,
            }
        }
        self.state = SequenceState::Completed;
        self.timer = None;
        Ok(steps)
    }

    fn advance_pc(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc += 1;
        }
    }
}

/// Execute an action that takes no virtual time.
fn run_instant(action: &Action, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
    let sprite = ctx.sprite;
    match action {
        Action::SetVariable { name, value } => {
            ctx.variables.insert(name.clone(), *value);
        }
        Action::ChangeVariable { name, by } => {
            *ctx.variables.entry(name.clone()).or_insert(0.0) += by;
        }
        Action::SetGlobal { name, value } => {
            ctx.globals.insert(name.clone(), *value);
        }
        Action::MoveBy { dx, dy } => {
            let (x, y) = ctx.look.position();
            ctx.look.set_position(x + dx, y + dy);
        }
        Action::SetPosition { x, y } => ctx.look.set_position(*x, *y),
        Action::SwitchLook { index } => ctx.look.set_frame(*index)?,
        Action::NextLook => ctx.look.next_frame(),
        Action::Show => ctx.look.set_visible(true),
        Action::Hide => ctx.look.set_visible(false),
        Action::Broadcast { message } => ctx.commands.push(
            sprite,
            StageCommand::Broadcast {
                message: message.clone(),
            },
        ),
        Action::CreateClone => ctx.commands.push(sprite, StageCommand::CreateClone),
        Action::CreateCloneOf { sprite: name } => ctx.commands.push(
            sprite,
            StageCommand::CreateCloneOf {
                sprite_name: name.clone(),
            },
        ),
        Action::PlaySound { path } => ctx
            .commands
            .push(sprite, StageCommand::PlaySound { path: path.clone() }),
        Action::StopAllSounds => ctx.commands.push(sprite, StageCommand::StopAllSounds),
        Action::Vibrate { seconds } => ctx.commands.push(
            sprite,
            StageCommand::Vibrate {
                seconds: *seconds,
            },
        ),
        Action::SetFlash { on } => ctx.commands.push(sprite, StageCommand::SetFlash { on: *on }),
        Action::SetCameraPreview { on } => ctx
            .commands
            .push(sprite, StageCommand::SetCameraPreview { on: *on }),
        Action::FocusCamera => ctx.commands.push(sprite, StageCommand::FocusCamera),
        Action::TransitionToScene {
            scene,
            stop_audio,
            persist,
        } => ctx.commands.push(
            sprite,
            StageCommand::TransitionToScene {
                scene: scene.clone(),
                stop_audio: *stop_audio,
                persist: *persist,
            },
        ),
        Action::StartScene {
            scene,
            stop_audio,
            persist,
        } => ctx.commands.push(
            sprite,
            StageCommand::StartScene {
                scene: scene.clone(),
                stop_audio: *stop_audio,
                persist: *persist,
            },
        ),
        Action::Wait { .. }
        | Action::GlideTo { .. }
        | Action::Repeat { .. }
        | Action::Forever { .. }
        | Action::DeleteThisClone => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
