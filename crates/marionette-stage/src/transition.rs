//! Scene transitions and backups.
//!
//! Leaving a scene with `persist` moves the whole live scene into a
//! [`Backup`] together with everything the stage needs to bring it back
//! exactly: camera focus, peripheral state, playing sounds and their
//! positions, the substep divisor and the stage flags. Capturing quiesces the
//! peripherals and resets the camera.
//!
//! Two ways in:
//!
//! - [`StageRuntime::transition_to`] resumes the target from its backup if
//!   there is one (the backup is consumed), otherwise cold-starts it.
//! - [`StageRuntime::start_scene`] always cold-starts the target and throws
//!   its backup away.
//!
//! With `stop_audio`, sounds of the outgoing scene stop once it is left. They
//! still are part of its backup and resume at their recorded positions.

use std::collections::HashMap;

use marionette_script::sprite_id::{SpriteId, SpriteRoster};

use crate::peripherals::PeripheralBackup;
use crate::runtime::{locate, StageRuntime};
use crate::scene::{Scene, SceneDefinition};
use crate::sound::PlayingSound;

/// Everything needed to resume a scene where it was left.
#[derive(Debug)]
pub struct Backup {
    pub(crate) scene: Scene,
    pub(crate) camera_focus: Option<SpriteId>,
    pub(crate) peripherals: PeripheralBackup,
    pub(crate) sounds: Vec<PlayingSound>,
    pub(crate) divisor: f64,
    pub(crate) paused: bool,
    pub(crate) finished: bool,
    pub(crate) reload_pending: bool,
}

impl Backup {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera_focus(&self) -> Option<SpriteId> {
        self.camera_focus
    }

    pub fn peripherals(&self) -> &PeripheralBackup {
        &self.peripherals
    }

    pub fn sounds(&self) -> &[PlayingSound] {
        &self.sounds
    }

    pub fn divisor(&self) -> f64 {
        self.divisor
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Release the backed-up scene for good.
    pub(crate) fn discard(mut self, roster: &mut SpriteRoster) {
        tracing::debug!(scene = self.scene.name(), "backup discarded");
        self.scene.dispose(roster);
    }
}

/// Backups keyed by scene name. At most one per scene.
#[derive(Debug, Default)]
pub struct BackupStore {
    backups: HashMap<String, Backup>,
}

impl BackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `backup` under its scene's name, returning the one it replaces.
    pub fn insert(&mut self, backup: Backup) -> Option<Backup> {
        self.backups.insert(backup.scene.name().to_owned(), backup)
    }

    pub fn remove(&mut self, scene: &str) -> Option<Backup> {
        self.backups.remove(scene)
    }

    pub fn get(&self, scene: &str) -> Option<&Backup> {
        self.backups.get(scene)
    }

    pub fn contains(&self, scene: &str) -> bool {
        self.backups.contains_key(scene)
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    /// Names of the backed-up scenes, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Take every backup out of the store.
    pub fn drain(&mut self) -> Vec<Backup> {
        self.backups.drain().map(|(_, backup)| backup).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Restore from backup when there is one.
    Resume,
    /// Always cold-start.
    Restart,
}

impl StageRuntime {
    /// Switch to scene `name`, resuming it from its backup when one exists.
    ///
    /// Returns `false` (and changes nothing) if the project has no such scene.
    pub fn transition_to(&mut self, name: &str, stop_audio: bool, persist: bool) -> bool {
        let Some(target) = self.project.scene_by_name(name).cloned() else {
            tracing::warn!(scene = name, "transition to unknown scene ignored");
            return false;
        };
        self.switch_scene(&target, stop_audio, persist, Entry::Resume);
        true
    }

    /// Switch to scene `name` and cold-start it, discarding its backup.
    ///
    /// Returns `false` (and changes nothing) if the project has no such scene.
    pub fn start_scene(&mut self, name: &str, stop_audio: bool, persist: bool) -> bool {
        let Some(target) = self.project.scene_by_name(name).cloned() else {
            tracing::warn!(scene = name, "start of unknown scene ignored");
            return false;
        };
        self.switch_scene(&target, stop_audio, persist, Entry::Restart);
        true
    }

    /// [`start_scene`](Self::start_scene) by declaration index.
    pub fn start_scene_by_id(&mut self, id: usize, stop_audio: bool, persist: bool) -> bool {
        let Some(target) = self.project.scene_by_id(id).cloned() else {
            tracing::warn!(scene_id = id, "start of unknown scene ignored");
            return false;
        };
        self.switch_scene(&target, stop_audio, persist, Entry::Restart);
        true
    }

    /// Drop the backup of scene `name`. Returns whether there was one.
    pub fn clear_scene_backup(&mut self, name: &str) -> bool {
        match self.backups.remove(name) {
            Some(backup) => {
                backup.discard(&mut self.roster);
                true
            }
            None => false,
        }
    }

    pub fn has_backup(&self, name: &str) -> bool {
        self.backups.contains(name)
    }

    fn switch_scene(&mut self, target: &SceneDefinition, stop_audio: bool, persist: bool, entry: Entry) {
        let outgoing = self.scene.name().to_owned();

        // Leave the outgoing scene.
        if persist {
            let backup = self.capture_backup();
            if let Some(stale) = self.backups.insert(backup) {
                stale.discard(&mut self.roster);
            }
        } else {
            let mut scene = std::mem::replace(&mut self.scene, Scene::detached());
            scene.dispose(&mut self.roster);
            self.camera.reset();
        }
        if stop_audio {
            self.sound.clear();
        }
        self.commands.clear();

        // Enter the target.
        let backup = match entry {
            Entry::Resume => self.backups.remove(&target.name),
            Entry::Restart => {
                if let Some(stale) = self.backups.remove(&target.name) {
                    stale.discard(&mut self.roster);
                }
                None
            }
        };
        let restored = backup.is_some();
        match backup {
            Some(backup) => self.restore_backup(backup),
            None => {
                let world_id = self.allocate_world_id();
                self.scene = Scene::instantiate(target, &mut self.roster, world_id);
                // A cold scene re-converges from the configured divisor.
                self.divisor = self.config.initial_divisor;
            }
        }

        if self.paused {
            self.sound.pause();
        } else {
            self.sound.resume();
        }
        tracing::info!(
            from = %outgoing,
            to = %target.name,
            persist,
            stop_audio,
            restored,
            "scene switched"
        );
    }

    fn capture_backup(&mut self) -> Backup {
        let scene = std::mem::replace(&mut self.scene, Scene::detached());
        Backup {
            scene,
            camera_focus: self.camera.capture(),
            peripherals: self.peripherals.capture(),
            sounds: self.sound.capture(),
            divisor: self.divisor,
            paused: self.paused,
            finished: self.finished,
            reload_pending: self.reload_pending,
        }
    }

    fn restore_backup(&mut self, backup: Backup) {
        let Backup {
            scene,
            camera_focus,
            peripherals,
            sounds,
            divisor,
            paused,
            finished,
            reload_pending,
        } = backup;

        self.scene = scene;
        self.paused = paused;
        self.finished = finished;
        self.reload_pending = reload_pending;
        self.divisor = divisor;
        self.peripherals.restore(&peripherals);
        let scene = &self.scene;
        self.camera.restore(camera_focus, |id| locate(scene, id));
        for sound in sounds {
            self.sound.play_at(sound.path, sound.sprite, sound.position);
        }
    }
}
