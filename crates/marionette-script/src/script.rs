//! Script definitions: triggers, conditions, and actions.
//!
//! Scripts are immutable once built. A sprite holds them behind [`Arc`] so a
//! clone can carry the same script graph without copying it; every clone
//! still gets its own [`ActionSequence`](crate::sequence::ActionSequence)s.
//!
//! [`Arc`]: std::sync::Arc

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventId;

/// Sprite-local or global numeric variables, keyed by name.
pub type Variables = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// How a variable is compared against a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

/// A predicate over one sprite-local variable. A missing variable reads as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub variable: String,
    pub comparison: Comparison,
    pub value: f64,
}

impl Condition {
    pub fn new(variable: impl Into<String>, comparison: Comparison, value: f64) -> Self {
        Self {
            variable: variable.into(),
            comparison,
            value,
        }
    }

    pub fn evaluate(&self, variables: &Variables) -> bool {
        let current = variables.get(&self.variable).copied().unwrap_or(0.0);
        match self.comparison {
            Comparison::Less => current < self.value,
            Comparison::LessOrEqual => current <= self.value,
            Comparison::Equal => current == self.value,
            Comparison::NotEqual => current != self.value,
            Comparison::GreaterOrEqual => current >= self.value,
            Comparison::Greater => current > self.value,
        }
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// What starts a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trigger {
    /// Started (or restarted) whenever the event fires at the sprite.
    On(EventId),
    /// Started each time the condition turns from false to true.
    When(Condition),
    /// Run to completion synchronously before the stage reloads or shuts down.
    Exit,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Wait for the given amount of virtual time.
    Wait { seconds: f64 },
    SetVariable { name: String, value: f64 },
    ChangeVariable { name: String, by: f64 },
    /// Set a project-wide variable.
    SetGlobal { name: String, value: f64 },
    MoveBy { dx: f64, dy: f64 },
    SetPosition { x: f64, y: f64 },
    /// Move linearly to `(x, y)` over `seconds` of virtual time.
    GlideTo { x: f64, y: f64, seconds: f64 },
    SwitchLook { index: usize },
    NextLook,
    Show,
    Hide,
    Broadcast { message: String },
    CreateClone,
    CreateCloneOf { sprite: String },
    /// Delete the running sprite if it is a clone. Ends the script.
    DeleteThisClone,
    PlaySound { path: String },
    StopAllSounds,
    Vibrate { seconds: f64 },
    SetFlash { on: bool },
    SetCameraPreview { on: bool },
    /// Make the camera follow the running sprite.
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
    /// Run `body` `times` times, yielding after each iteration.
    Repeat { times: u32, body: Vec<Action> },
    /// Run `body` forever, yielding after each iteration.
    Forever { body: Vec<Action> },
}

impl Action {
    /// The nested block of a loop action.
    pub fn body(&self) -> Option<&[Action]> {
        match self {
            Action::Repeat { body, .. } | Action::Forever { body } => Some(body),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// A trigger plus the actions it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub trigger: Trigger,
    pub actions: Vec<Action>,
    /// Disabled (commented-out) scripts never start.
    #[serde(default)]
    pub disabled: bool,
}

impl Script {
    pub fn new(trigger: Trigger, actions: Vec<Action>) -> Self {
        Self {
            trigger,
            actions,
            disabled: false,
        }
    }

    /// Shorthand for `Script::new(Trigger::On(event), actions)`.
    pub fn on(event: EventId, actions: Vec<Action>) -> Self {
        Self::new(Trigger::On(event), actions)
    }

    /// Shorthand for an exit script.
    pub fn on_exit(actions: Vec<Action>) -> Self {
        Self::new(Trigger::Exit, actions)
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn listens_to(&self, event: &EventId) -> bool {
        !self.disabled && matches!(&self.trigger, Trigger::On(id) if id == event)
    }

    pub fn is_exit(&self) -> bool {
        !self.disabled && self.trigger == Trigger::Exit
    }

    pub fn condition(&self) -> Option<&Condition> {
        match &self.trigger {
            Trigger::When(condition) if !self.disabled => Some(condition),
            _ => None,
        }
    }
}
