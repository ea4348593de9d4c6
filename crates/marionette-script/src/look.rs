//! The renderable side of a sprite.
//!
//! A [`Look`] holds the frame list, the current frame, the transform, and a
//! small set of capability flags. Physics-enabled and camera-pinned looks are
//! not separate types: the stage reads [`LookFlags`] and treats the look
//! accordingly.

use serde::{Deserialize, Serialize};

use crate::ScriptError;

/// Orthogonal capabilities of a look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LookFlags {
    /// Position is driven by a body in the scene's physics world.
    pub has_physics: bool,
    /// Drawn in screen space; the camera does not move it.
    pub pinned_to_camera: bool,
}

/// Visual representation and transform of a sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct Look {
    frames: Vec<String>,
    current: Option<usize>,
    x: f64,
    y: f64,
    visible: bool,
    flags: LookFlags,
    /// Set when a script moved a physics-enabled look; the stage pushes the
    /// new position into the physics body after the script phase.
    physics_dirty: bool,
    disposed: bool,
}

impl Look {
    /// Create a visible look positioned at `(x, y)`, showing the first frame
    /// if there is one.
    pub fn new(frames: Vec<String>, x: f64, y: f64, flags: LookFlags) -> Self {
        let current = if frames.is_empty() { None } else { Some(0) };
        Self {
            frames,
            current,
            x,
            y,
            visible: true,
            flags,
            physics_dirty: false,
            disposed: false,
        }
    }

    /// Copy this look for a freshly spawned clone: same frames, transform,
    /// visibility and flags, never disposed.
    pub fn duplicate(&self) -> Self {
        Self {
            frames: self.frames.clone(),
            current: self.current,
            x: self.x,
            y: self.y,
            visible: self.visible,
            flags: self.flags,
            physics_dirty: false,
            disposed: false,
        }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Index of the frame currently shown, `None` when the look has no frames.
    pub fn current_frame(&self) -> Option<usize> {
        self.current
    }

    pub fn current_frame_name(&self) -> Option<&str> {
        self.current.map(|i| self.frames[i].as_str())
    }

    /// Show frame `index`.
    ///
    /// # Errors
    ///
    /// [`ScriptError::LookIndexOutOfRange`] if the look has no such frame.
    pub fn set_frame(&mut self, index: usize) -> Result<(), ScriptError> {
        if index >= self.frames.len() {
            return Err(ScriptError::LookIndexOutOfRange {
                index,
                available: self.frames.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }

    /// Advance to the next frame, wrapping around. No-op without frames.
    pub fn next_frame(&mut self) {
        if let Some(current) = self.current {
            self.current = Some((current + 1) % self.frames.len());
        }
    }

    /// Show the first frame again, if any.
    pub fn reset_to_first_frame(&mut self) {
        self.current = if self.frames.is_empty() { None } else { Some(0) };
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Move the look. Physics-enabled looks remember that their body needs
    /// to follow.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        if self.flags.has_physics {
            self.physics_dirty = true;
        }
    }

    /// Take a position computed by the physics step. Does not mark the look
    /// dirty.
    pub fn sync_from_physics(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Returns whether a script moved this look since the last call, and
    /// clears the flag.
    pub fn take_physics_dirty(&mut self) -> bool {
        std::mem::take(&mut self.physics_dirty)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn flags(&self) -> LookFlags {
        self.flags
    }

    /// Release the renderable resources of this look.
    ///
    /// Returns `true` the first time, `false` on every later call.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.visible = false;
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
