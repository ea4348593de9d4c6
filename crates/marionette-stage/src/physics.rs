//! Per-scene rapier2d physics world.
//!
//! Each [`Scene`](crate::scene::Scene) owns one [`PhysicsWorld`]. Sprites whose
//! definition carries a [`PhysicsBody`] get a rapier rigid body keyed by their
//! [`SpriteId`]. Every substep the runtime:
//!
//! 1. pushes positions of looks that scripts moved into rapier,
//! 2. steps the world by the substep size,
//! 3. reads dynamic body positions back into the looks.
//!
//! Worlds carry a numeric id that is unique within a runtime, so a restored
//! backup can be checked to hand back the very world that was captured.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with the integral
//! substep schedule and sorted readback, stepping is deterministic on the same
//! platform.

use std::collections::HashMap;
use std::fmt;

use marionette_script::sprite_id::SpriteId;
use rapier2d::prelude::*;

// ---------------------------------------------------------------------------
// Body descriptors
// ---------------------------------------------------------------------------

/// How rapier treats a body.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PhysicsBodyType {
    /// Fully simulated.
    Dynamic,
    /// Moved only by scripts.
    Kinematic,
    /// Immovable.
    Static,
}

/// Collider shape.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box with half-extents.
    Box { half_width: f64, half_height: f64 },
    Circle { radius: f64 },
}

/// Physics description attached to a sprite definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhysicsBody {
    pub body_type: PhysicsBodyType,
    pub collider: ColliderShape,
    /// Coefficient of restitution. 0.0 = no bounce, 1.0 = perfect bounce.
    #[serde(default)]
    pub restitution: f64,
    #[serde(default)]
    pub is_sensor: bool,
    /// Initial linear velocity `(dx, dy)`.
    #[serde(default)]
    pub velocity: (f64, f64),
}

impl PhysicsBody {
    /// A dynamic circle at rest.
    pub fn dynamic_circle(radius: f64) -> Self {
        Self {
            body_type: PhysicsBodyType::Dynamic,
            collider: ColliderShape::Circle { radius },
            restitution: 0.0,
            is_sensor: false,
            velocity: (0.0, 0.0),
        }
    }
}

/// A collision between two sprites that started during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub sprite_a: SpriteId,
    pub sprite_b: SpriteId,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// A rapier2d simulation keyed by [`SpriteId`].
pub struct PhysicsWorld {
    id: u64,
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    sprite_to_body: HashMap<SpriteId, RigidBodyHandle>,
    collider_to_sprite: HashMap<ColliderHandle, SpriteId>,
    step_count: u64,
    disposed: bool,
}

impl PhysicsWorld {
    /// Create a world with the given id and gravity.
    pub fn new(id: u64, gravity: (f64, f64)) -> Self {
        Self {
            id,
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.0 as Real, gravity.1 as Real],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            sprite_to_body: HashMap::new(),
            collider_to_sprite: HashMap::new(),
            step_count: 0,
            disposed: false,
        }
    }

    /// Identity of this world within its runtime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Give `sprite` a body at `(x, y)`. No-op if it already has one or the
    /// world is disposed.
    pub fn register_sprite(&mut self, sprite: SpriteId, x: f64, y: f64, body: &PhysicsBody) {
        if self.disposed || self.sprite_to_body.contains_key(&sprite) {
            return;
        }

        let translation = vector![x as Real, y as Real];
        let linvel = vector![body.velocity.0 as Real, body.velocity.1 as Real];
        let rb = match body.body_type {
            PhysicsBodyType::Dynamic => RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(linvel)
                .build(),
            PhysicsBodyType::Kinematic => RigidBodyBuilder::kinematic_position_based()
                .translation(translation)
                .build(),
            PhysicsBodyType::Static => RigidBodyBuilder::fixed().translation(translation).build(),
        };
        let body_handle = self.rigid_body_set.insert(rb);
        self.sprite_to_body.insert(sprite, body_handle);

        let shape = match &body.collider {
            ColliderShape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(*half_width as Real, *half_height as Real),
            ColliderShape::Circle { radius } => SharedShape::ball(*radius as Real),
        };
        let collider = ColliderBuilder::new(shape)
            .restitution(body.restitution as Real)
            .sensor(body.is_sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        self.collider_to_sprite.insert(collider_handle, sprite);
    }

    /// Remove the body of `sprite`. No-op if it has none.
    pub fn unregister_sprite(&mut self, sprite: SpriteId) {
        if let Some(body_handle) = self.sprite_to_body.remove(&sprite) {
            self.rigid_body_set.remove(
                body_handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
            self.collider_to_sprite.retain(|_, s| *s != sprite);
        }
    }

    /// Teleport the body of `sprite`, typically after a script moved its look.
    pub fn set_position(&mut self, sprite: SpriteId, x: f64, y: f64) {
        let Some(&handle) = self.sprite_to_body.get(&sprite) else {
            return;
        };
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            let translation = vector![x as Real, y as Real];
            if rb.is_kinematic() {
                rb.set_next_kinematic_translation(translation);
            }
            rb.set_translation(translation, true);
        }
    }

    /// Advance the simulation by `dt` seconds. Returns the collisions that
    /// started, sorted by sprite id. A disposed world does nothing.
    pub fn step(&mut self, dt: f64) -> Vec<CollisionPair> {
        if self.disposed || dt <= 0.0 {
            return Vec::new();
        }
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );
        self.step_count += 1;

        let mut collisions = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                let a = self.collider_to_sprite.get(&h1).copied();
                let b = self.collider_to_sprite.get(&h2).copied();
                if let (Some(sprite_a), Some(sprite_b)) = (a, b) {
                    collisions.push(CollisionPair { sprite_a, sprite_b });
                }
            }
        }
        // Channel delivery order is not stable across runs.
        collisions.sort_by_key(|c| (c.sprite_a.min(c.sprite_b), c.sprite_a.max(c.sprite_b)));
        collisions
    }

    /// Positions of all dynamic bodies, sorted by sprite id.
    pub fn read_positions(&self) -> Vec<(SpriteId, f64, f64)> {
        let mut results: Vec<_> = self
            .sprite_to_body
            .iter()
            .filter_map(|(&sprite, &handle)| {
                let rb = self.rigid_body_set.get(handle)?;
                if !rb.is_dynamic() {
                    return None;
                }
                let t = rb.translation();
                Some((sprite, t.x as f64, t.y as f64))
            })
            .collect();
        results.sort_by_key(|(sprite, _, _)| *sprite);
        results
    }

    pub fn position_of(&self, sprite: SpriteId) -> Option<(f64, f64)> {
        let handle = self.sprite_to_body.get(&sprite)?;
        let t = self.rigid_body_set.get(*handle)?.translation();
        Some((t.x as f64, t.y as f64))
    }

    pub fn has_sprite(&self, sprite: SpriteId) -> bool {
        self.sprite_to_body.contains_key(&sprite)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Number of successful steps since creation.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Drop every body and stop stepping.
    ///
    /// Returns `true` the first time, `false` on every later call.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let sprites: Vec<SpriteId> = self.sprite_to_body.keys().copied().collect();
        for sprite in sprites {
            self.unregister_sprite(sprite);
        }
        self.disposed = true;
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("id", &self.id)
            .field("bodies", &self.sprite_to_body.len())
            .field("step_count", &self.step_count)
            .field("disposed", &self.disposed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
