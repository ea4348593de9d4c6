//! Clone lifecycle.
//!
//! A clone is a runtime copy of a sprite. It shares the source's script
//! definitions, copies its variables and look, and gets its own id, its own
//! sequences and (if the source has one) its own physics body. Clones are
//! named `<root>-c<n>` where `<root>` is the name of the authored sprite the
//! lineage starts from and `n` is a stage-wide counter.
//! [`StageRuntime::find_all_clones_of`] recognises clones by that suffix alone.

use marionette_script::event::EventId;
use marionette_script::sprite::Sprite;
use marionette_script::sprite_id::SpriteId;

use crate::runtime::StageRuntime;
use crate::StageError;

/// Marker between a root sprite name and the clone counter.
const CLONE_SUFFIX: &str = "-c";

/// Stage-wide clone counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneRegistry {
    counter: u64,
}

impl CloneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next clone number. The first clone gets `1`.
    pub fn next_suffix(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Number of clones named so far.
    pub fn count(&self) -> u64 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// `name` without one trailing `-c<digits>` suffix.
pub fn strip_clone_suffix(name: &str) -> &str {
    match name.rfind(CLONE_SUFFIX) {
        Some(at) => {
            let digits = &name[at + CLONE_SUFFIX.len()..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                &name[..at]
            } else {
                name
            }
        }
        None => name,
    }
}

/// Clone name for clone number `n` of the sprite named `root`.
pub fn clone_name(root: &str, n: u64) -> String {
    format!("{root}{CLONE_SUFFIX}{n}")
}

impl StageRuntime {
    /// Create a clone of `source` in the active scene.
    ///
    /// The clone is appended to the scene's sprites and drawn directly behind
    /// its source. Only the clone receives the start-as-clone event. Without an
    /// explicit name it is named after the root of the source's lineage.
    /// Returns `None` if `source` is not a live sprite of the active scene.
    pub fn spawn_clone(&mut self, source: SpriteId, name: Option<&str>) -> Option<SpriteId> {
        let Some(src) = self.scene.sprite(source).filter(|s| !s.is_invalidated()) else {
            tracing::debug!(sprite = %source, "clone source not in active scene");
            return None;
        };

        let number = self.clones.next_suffix();
        let name = match name {
            Some(name) => name.to_owned(),
            None => clone_name(root_name(&self.scene.sprites, src), number),
        };
        let id = self.roster.enroll_clone(source);
        let mut clone = src.make_clone(id, name);

        if let Some(body) = self.scene.bodies.get(&source).cloned() {
            let (x, y) = clone.look().position();
            self.scene.physics.register_sprite(id, x, y, &body);
            self.scene.bodies.insert(id, body);
        }

        let actors = &mut self.scene.actors;
        let at = match actors.iter().position(|a| *a == source) {
            Some(at) => at,
            None => {
                actors.push(source);
                actors.len() - 1
            }
        };
        actors.insert(at, id);

        self.router.fire_to(&EventId::StartAsClone, &mut clone);
        clone.init_condition_triggers();
        tracing::debug!(clone = %id, name = clone.name(), source = %source, "clone spawned");
        self.scene.sprites.push(clone);
        Some(id)
    }

    /// Remove clone `id` from the active scene: its sequences are cancelled,
    /// its look, physics body and sounds released, its id freed.
    ///
    /// # Errors
    ///
    /// - [`StageError::SpriteNotFound`] if `id` is not in the active scene,
    ///   including a clone that was already destroyed.
    /// - [`StageError::NotAClone`] if `id` is an authored sprite.
    pub fn destroy_clone(&mut self, id: SpriteId) -> Result<(), StageError> {
        let index = self
            .scene
            .sprites
            .iter()
            .position(|s| s.id() == id)
            .ok_or(StageError::SpriteNotFound { sprite: id })?;
        if !self.scene.sprites[index].is_clone() {
            return Err(StageError::NotAClone { sprite: id });
        }

        let mut clone = self.scene.sprites.remove(index);
        clone.invalidate();
        self.scene.actors.retain(|a| *a != id);
        if self.scene.bodies.remove(&id).is_some() {
            self.scene.physics.unregister_sprite(id);
        }
        self.sound.stop_sprite(id);
        self.roster.retire(id);
        tracing::debug!(clone = %id, name = clone.name(), "clone destroyed");
        Ok(())
    }

    /// Every live clone in the active scene named `<source name>-c<n>`, in
    /// registration order. Empty if `source` is unknown.
    ///
    /// The match is by name only. Clones are named after their lineage root,
    /// so querying with a clone as `source` finds nothing unless a clone was
    /// explicitly given a name derived from it.
    pub fn find_all_clones_of(&self, source: SpriteId) -> Vec<SpriteId> {
        let Some(src) = self.scene.sprite(source) else {
            return Vec::new();
        };
        self.scene
            .sprites
            .iter()
            .filter(|s| {
                s.is_clone()
                    && !s.is_invalidated()
                    && s.id() != source
                    && strip_clone_suffix(s.name()) == src.name()
            })
            .map(Sprite::id)
            .collect()
    }

    /// Destroy every clone of the active scene and restart clone numbering.
    pub fn remove_all_clones(&mut self) -> usize {
        let clones: Vec<SpriteId> = self
            .scene
            .sprites
            .iter()
            .filter(|s| s.is_clone())
            .map(Sprite::id)
            .collect();
        let removed = clones
            .into_iter()
            .filter(|&id| self.destroy_clone(id).is_ok())
            .count();
        self.clones.reset();
        removed
    }

    pub fn clone_registry(&self) -> &CloneRegistry {
        &self.clones
    }
}

/// Name of the authored sprite `sprite`'s lineage starts from.
fn root_name<'a>(sprites: &'a [Sprite], sprite: &'a Sprite) -> &'a str {
    match sprite.original() {
        Some(original) => sprites
            .iter()
            .find(|s| s.id() == original)
            .map(Sprite::name)
            .unwrap_or_else(|| strip_clone_suffix(sprite.name())),
        None => sprite.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_numeric_suffix() {
        assert_eq!(strip_clone_suffix("cat-c3"), "cat");
        assert_eq!(strip_clone_suffix("cat-c3-c4"), "cat-c3");
        assert_eq!(strip_clone_suffix("cat"), "cat");
        assert_eq!(strip_clone_suffix("cat-c"), "cat-c");
        assert_eq!(strip_clone_suffix("cat-cx1"), "cat-cx1");
        assert_eq!(strip_clone_suffix("my-cat"), "my-cat");
    }

    #[test]
    fn counter_starts_at_one_and_resets() {
        let mut registry = CloneRegistry::new();
        assert_eq!(registry.next_suffix(), 1);
        assert_eq!(registry.next_suffix(), 2);
        assert_eq!(registry.count(), 2);
        registry.reset();
        assert_eq!(registry.next_suffix(), 1);
    }

    #[test]
    fn clone_name_round_trips_through_strip() {
        assert_eq!(strip_clone_suffix(&clone_name("dog", 12)), "dog");
    }
}
