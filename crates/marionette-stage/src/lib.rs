//! Marionette Stage -- the runtime that plays a project's scenes.
//!
//! This crate builds on [`marionette_script`] to drive a project frame by
//! frame: an adaptive substep scheduler that trades simulation granularity
//! for a per-frame time budget, scene transitions that can suspend a scene
//! into a backup and resume it exactly, a clone lifecycle, event routing,
//! synchronous exit scripts, pause/resume, reload and screenshots.
//!
//! # Quick Start
//!
//! ```
//! use marionette_stage::prelude::*;
//!
//! let project = ProjectDefinition::new(vec![
//!     SceneDefinition::new("main").with_sprite(
//!         SpriteDefinition::new("cat").with_script(Script::on(
//!             EventId::Start,
//!             vec![Action::Forever {
//!                 body: vec![Action::MoveBy { dx: 1.0, dy: 0.0 }],
//!             }],
//!         )),
//!     ),
//! ]);
//!
//! let mut stage = StageRuntime::new(project, StageConfig::default())
//!     .unwrap()
//!     .with_clock(ManualClock::new());
//! let diag = stage.tick(0.1);
//! assert_eq!(diag.substeps, 10);
//!
//! let cat = stage.sprite_id("cat").unwrap();
//! assert_eq!(stage.sprite(cat).unwrap().look().position(), (10.0, 0.0));
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod clock;
pub mod clone;
pub mod config;
pub mod peripherals;
pub mod physics;
pub mod render;
pub mod router;
pub mod runtime;
pub mod scene;
pub mod screenshot;
pub mod sound;
pub mod trace;
pub mod transition;

use marionette_script::sprite_id::SpriteId;

/// Re-export the script crate for convenience.
pub use marionette_script;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the stage runtime.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A project needs at least one scene to start.
    #[error("project has no scenes")]
    EmptyProject,

    /// The sprite is not part of the active scene.
    #[error("sprite {sprite} not found in the active scene")]
    SpriteNotFound { sprite: SpriteId },

    /// Only clones can be destroyed.
    #[error("sprite {sprite} is not a clone")]
    NotAClone { sprite: SpriteId },

    #[error("failed to parse stage config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid stage config: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common stage usage.
pub mod prelude {
    pub use marionette_script::prelude::*;

    pub use crate::camera::CameraPositioner;
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::clone::{strip_clone_suffix, CloneRegistry};
    pub use crate::config::StageConfig;
    pub use crate::peripherals::{PeripheralBackup, Peripherals};
    pub use crate::physics::{
        ColliderShape, CollisionPair, PhysicsBody, PhysicsBodyType, PhysicsWorld,
    };
    pub use crate::render::{DrawCommand, HeadlessRenderer, RenderFrame, Renderer};
    pub use crate::router::{listeners, EventRouter, Listener};
    pub use crate::runtime::{next_divisor, substep_count, StageRuntime};
    pub use crate::scene::{ProjectDefinition, Scene, SceneDefinition, SpriteDefinition};
    pub use crate::screenshot::{
        DirScreenshotStore, MemoryScreenshotStore, ScreenshotCallback, ScreenshotOutcome,
        ScreenshotRequest, ScreenshotStore, AUTOMATIC_SCREENSHOT, MANUAL_SCREENSHOT,
    };
    pub use crate::sound::{PlayingSound, SoundMixer};
    pub use crate::trace::{FrameSchedule, ScheduleTrace, TickDiagnostics};
    pub use crate::transition::{Backup, BackupStore};
    pub use crate::StageError;
}
