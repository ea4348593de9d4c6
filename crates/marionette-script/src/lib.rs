//! Marionette Script -- the actor side of the stage runtime.
//!
//! This crate models what a stage drives: [`Sprite`](sprite::Sprite)s with
//! their [`Look`](look::Look)s, the scripts they carry, and the resumable
//! [`ActionSequence`](sequence::ActionSequence) state machine that executes a
//! script cooperatively against a virtual time delta. Effects that reach
//! beyond one sprite are queued as [`StageCommand`](command::StageCommand)s
//! for the stage to apply.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use marionette_script::prelude::*;
//!
//! let script = Script::on(
//!     EventId::Start,
//!     vec![Action::SetVariable { name: "ready".into(), value: 1.0 }],
//! );
//! let look = Look::new(vec!["idle".into()], 0.0, 0.0, LookFlags::default());
//! let mut sprite = Sprite::new(
//!     SpriteId::new(0, 0),
//!     "cat",
//!     look,
//!     vec![Arc::new(script)],
//!     Variables::new(),
//! );
//!
//! let mut globals = Variables::new();
//! let mut commands = StageCommandBuffer::new();
//! sprite.fire(&EventId::Start);
//! sprite.advance(1.0 / 60.0, &mut globals, &mut commands);
//! assert_eq!(sprite.variable("ready"), 1.0);
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod event;
pub mod look;
pub mod script;
pub mod sequence;
pub mod sprite;
pub mod sprite_id;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while executing scripts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// A look switch referenced a frame the look does not have.
    #[error("look index {index} out of range ({available} frames available)")]
    LookIndexOutOfRange { index: usize, available: usize },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{IssuedCommand, StageCommand, StageCommandBuffer};
    pub use crate::event::{Event, EventId, EventPayload, GamepadButton};
    pub use crate::look::{Look, LookFlags};
    pub use crate::script::{Action, Comparison, Condition, Script, Trigger, Variables};
    pub use crate::sequence::{ActionSequence, ScriptContext, SequenceState, StepStatus};
    pub use crate::sprite::Sprite;
    pub use crate::sprite_id::{Lineage, SpriteId, SpriteRoster};
    pub use crate::ScriptError;
}
