//! Project and scene definitions, and the live scene built from them.
//!
//! Definitions are plain serde data: what a project *is*. A [`Scene`] is what
//! a definition becomes while it is active: live [`Sprite`]s with fresh ids, an
//! actor z-order, and a [`PhysicsWorld`] holding their bodies.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use marionette_script::event::EventId;
use marionette_script::look::{Look, LookFlags};
use marionette_script::script::{Script, Variables};
use marionette_script::sprite::Sprite;
use marionette_script::sprite_id::{SpriteId, SpriteRoster};

use crate::physics::{PhysicsBody, PhysicsWorld};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A sprite as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteDefinition {
    pub name: String,
    /// Look frame names, in order.
    #[serde(default)]
    pub looks: Vec<String>,
    #[serde(default)]
    pub position: (f64, f64),
    #[serde(default)]
    pub physics: Option<PhysicsBody>,
    #[serde(default)]
    pub pinned_to_camera: bool,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl SpriteDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            looks: Vec::new(),
            position: (0.0, 0.0),
            physics: None,
            pinned_to_camera: false,
            variables: Variables::new(),
            scripts: Vec::new(),
        }
    }

    pub fn with_looks<I, S>(mut self, looks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.looks = looks.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = (x, y);
        self
    }

    pub fn with_physics(mut self, body: PhysicsBody) -> Self {
        self.physics = Some(body);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned_to_camera = true;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: f64) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.scripts.push(script);
        self
    }
}

/// A scene as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    pub name: String,
    #[serde(default)]
    pub gravity: (f64, f64),
    #[serde(default)]
    pub sprites: Vec<SpriteDefinition>,
}

impl SceneDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gravity: (0.0, 0.0),
            sprites: Vec::new(),
        }
    }

    pub fn with_gravity(mut self, x: f64, y: f64) -> Self {
        self.gravity = (x, y);
        self
    }

    pub fn with_sprite(mut self, sprite: SpriteDefinition) -> Self {
        self.sprites.push(sprite);
        self
    }
}

/// A whole project. The first scene is the start scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectDefinition {
    pub scenes: Vec<SceneDefinition>,
    /// Initial values of the project-wide variables, restored on reload.
    #[serde(default)]
    pub globals: Variables,
}

impl ProjectDefinition {
    pub fn new(scenes: Vec<SceneDefinition>) -> Self {
        Self {
            scenes,
            globals: Variables::new(),
        }
    }

    pub fn with_global(mut self, name: impl Into<String>, value: f64) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    pub fn start_scene(&self) -> Option<&SceneDefinition> {
        self.scenes.first()
    }

    pub fn scene_by_name(&self, name: &str) -> Option<&SceneDefinition> {
        self.scenes.iter().find(|s| s.name == name)
    }

    /// Scenes are numbered from 0 in declaration order.
    pub fn scene_by_id(&self, id: usize) -> Option<&SceneDefinition> {
        self.scenes.get(id)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A live scene: sprites, actor z-order, and physics.
#[derive(Debug)]
pub struct Scene {
    name: String,
    /// Registration order; clones are appended.
    pub(crate) sprites: Vec<Sprite>,
    /// Draw order, back to front. A clone is drawn directly behind its source.
    pub(crate) actors: Vec<SpriteId>,
    /// Body descriptors of physics-enabled sprites, used to give clones a body.
    pub(crate) bodies: HashMap<SpriteId, PhysicsBody>,
    pub(crate) physics: PhysicsWorld,
    pub(crate) first_activation: bool,
}

impl Scene {
    /// Build a fresh scene from its definition, enrolling every
    /// sprite. The scene starts with `first_activation` set.
    pub fn instantiate(
        definition: &SceneDefinition,
        roster: &mut SpriteRoster,
        world_id: u64,
    ) -> Self {
        let mut physics = PhysicsWorld::new(world_id, definition.gravity);
        let mut sprites = Vec::with_capacity(definition.sprites.len());
        let mut bodies = HashMap::new();

        for def in &definition.sprites {
            let id = roster.enroll();
            let flags = LookFlags {
                has_physics: def.physics.is_some(),
                pinned_to_camera: def.pinned_to_camera,
            };
            let look = Look::new(def.looks.clone(), def.position.0, def.position.1, flags);
            let scripts = def.scripts.iter().cloned().map(Arc::new).collect();
            if let Some(body) = &def.physics {
                physics.register_sprite(id, def.position.0, def.position.1, body);
                bodies.insert(id, body.clone());
            }
            sprites.push(Sprite::new(
                id,
                def.name.clone(),
                look,
                scripts,
                def.variables.clone(),
            ));
        }

        let actors = sprites.iter().map(Sprite::id).collect();
        Self {
            name: definition.name.clone(),
            sprites,
            actors,
            bodies,
            physics,
            first_activation: true,
        }
    }

    /// An empty, already disposed scene. Only ever held while the active
    /// scene is being moved into a backup.
    pub(crate) fn detached() -> Self {
        let mut physics = PhysicsWorld::new(u64::MAX, (0.0, 0.0));
        physics.dispose();
        Self {
            name: String::new(),
            sprites: Vec::new(),
            actors: Vec::new(),
            bodies: HashMap::new(),
            physics,
            first_activation: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.id() == id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|s| s.id() == id)
    }

    /// First sprite with this name, preferring non-clones.
    pub fn sprite_by_name(&self, name: &str) -> Option<&Sprite> {
        self.sprites
            .iter()
            .find(|s| s.name() == name && !s.is_clone())
            .or_else(|| self.sprites.iter().find(|s| s.name() == name))
    }

    /// Sprite ids in draw order, back to front.
    pub fn actors(&self) -> &[SpriteId] {
        &self.actors
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn is_first_activation(&self) -> bool {
        self.first_activation
    }

    /// Start-event initialization on first activation: every sprite shows
    /// its first frame, arms its condition triggers and starts its start
    /// scripts. Clears the flag. Returns the number of scripts started.
    pub fn activate(&mut self) -> usize {
        let mut started = 0;
        for sprite in self.sprites.iter_mut() {
            sprite.reset_runtime_state();
            started += sprite.fire(&EventId::Start);
            sprite.init_condition_triggers();
        }
        self.first_activation = false;
        started
    }

    /// Number of sequences still running across all sprites.
    pub fn active_sequence_count(&self) -> usize {
        self.sprites.iter().map(Sprite::active_sequence_count).sum()
    }

    /// Tear the scene down: cancel every sequence, release looks and the
    /// physics world, and free all sprite ids. Safe to call more than once.
    pub fn dispose(&mut self, roster: &mut SpriteRoster) {
        for sprite in self.sprites.iter_mut() {
            sprite.invalidate();
            roster.retire(sprite.id());
        }
        self.physics.dispose();
    }
}
