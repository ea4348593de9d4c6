//! Sound playback bookkeeping.
//!
//! The [`SoundMixer`] does not decode audio. It tracks which sounds are
//! playing, for which sprite, and at what position, advancing positions with
//! simulated time. That is exactly what a backup needs to resume playback at
//! the recorded position after a scene switch.

use serde::{Deserialize, Serialize};

use marionette_script::sprite_id::SpriteId;

/// One playing sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingSound {
    pub path: String,
    /// The sprite whose script started the sound.
    pub sprite: SpriteId,
    /// Playback position in seconds.
    pub position: f64,
}

/// Tracks playing sounds and the global pause state.
#[derive(Debug, Default)]
pub struct SoundMixer {
    playing: Vec<PlayingSound>,
    paused: bool,
}

impl SoundMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) `path` for `sprite` from the beginning.
    pub fn play(&mut self, path: impl Into<String>, sprite: SpriteId) {
        self.play_at(path, sprite, 0.0);
    }

    /// Start `path` for `sprite` at `position` seconds. A sound with the same
    /// path and sprite that is already playing is replaced.
    pub fn play_at(&mut self, path: impl Into<String>, sprite: SpriteId, position: f64) {
        let path = path.into();
        self.playing
            .retain(|s| !(s.path == path && s.sprite == sprite));
        self.playing.push(PlayingSound {
            path,
            sprite,
            position: position.max(0.0),
        });
    }

    /// Advance every playing sound by `dt` seconds unless paused.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || dt <= 0.0 {
            return;
        }
        for sound in self.playing.iter_mut() {
            sound.position += dt;
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop everything. The pause state is left as is.
    pub fn clear(&mut self) {
        self.playing.clear();
    }

    /// Stop the sounds started by `sprite`.
    pub fn stop_sprite(&mut self, sprite: SpriteId) {
        self.playing.retain(|s| s.sprite != sprite);
    }

    pub fn playing(&self) -> &[PlayingSound] {
        &self.playing
    }

    /// Snapshot of the playing sounds and their positions.
    pub fn capture(&self) -> Vec<PlayingSound> {
        self.playing.clone()
    }
}
