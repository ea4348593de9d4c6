//! Deferred stage commands issued by scripts.
//!
//! An action sequence only has mutable access to its own sprite. Everything
//! that reaches beyond it (spawning clones, broadcasting, switching scenes,
//! sound, peripherals) is queued in a [`StageCommandBuffer`] and applied by
//! the stage after the script phase of the current substep, in FIFO order.
//! This keeps the substep ordering guarantee: a broadcast issued in substep
//! *k* is delivered to every sprite before substep *k + 1* begins.

use serde::{Deserialize, Serialize};

use crate::sprite_id::SpriteId;

// ---------------------------------------------------------------------------
// StageCommand
// ---------------------------------------------------------------------------

/// A runtime-level effect requested by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageCommand {
    /// Fire a broadcast event at every sprite of the active scene.
    Broadcast { message: String },
    /// Spawn a clone of the issuing sprite.
    CreateClone,
    /// Spawn a clone of the first sprite in the active scene with this name.
    CreateCloneOf { sprite_name: String },
    /// Destroy the issuing sprite if it is a clone.
    DeleteThisClone,
    PlaySound { path: String },
    StopAllSounds,
    Vibrate { seconds: f64 },
    SetFlash { on: bool },
    SetCameraPreview { on: bool },
    /// Make the camera follow the issuing sprite.
    FocusCamera,
    TransitionToScene {
        scene: String,
        stop_audio: bool,
        persist: bool,
    },
    StartScene {
        scene: String,
        stop_audio: bool,
        persist: bool,
    },
}

/// A queued command together with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCommand {
    /// Position in the buffer since it was last drained.
    pub command_index: u64,
    /// The sprite whose script issued the command.
    pub issued_by: SpriteId,
    pub command: StageCommand,
}

// ---------------------------------------------------------------------------
// StageCommandBuffer
// ---------------------------------------------------------------------------

/// FIFO queue of [`IssuedCommand`]s.
#[derive(Debug, Default)]
pub struct StageCommandBuffer {
    commands: Vec<IssuedCommand>,
    next_index: u64,
}

impl StageCommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issued_by: SpriteId, command: StageCommand) {
        let command_index = self.next_index;
        self.next_index += 1;
        self.commands.push(IssuedCommand {
            command_index,
            issued_by,
            command,
        });
    }

    pub fn commands(&self) -> &[IssuedCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take every queued command in issue order and reset the index counter.
    pub fn drain(&mut self) -> Vec<IssuedCommand> {
        self.next_index = 0;
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }
}
