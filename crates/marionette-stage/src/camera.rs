//! Camera following a focused sprite.

use marionette_script::sprite_id::SpriteId;

/// Keeps the camera centered on the focused sprite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraPositioner {
    focus: Option<SpriteId>,
    position: (f64, f64),
}

impl CameraPositioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> Option<SpriteId> {
        self.focus
    }

    pub fn set_focus(&mut self, sprite: Option<SpriteId>) {
        self.focus = sprite;
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Move the camera onto the focused sprite. `locate` returns the position
    /// of a live sprite; a focus that no longer resolves is dropped.
    pub fn update(&mut self, locate: impl Fn(SpriteId) -> Option<(f64, f64)>) {
        let Some(focus) = self.focus else {
            return;
        };
        match locate(focus) {
            Some(position) => self.position = position,
            None => self.focus = None,
        }
    }

    /// Record the focus for a backup and reset the camera.
    pub fn capture(&mut self) -> Option<SpriteId> {
        let focus = self.focus;
        self.reset();
        focus
    }

    /// Restore a captured focus and snap the camera onto it right away.
    pub fn restore(
        &mut self,
        focus: Option<SpriteId>,
        locate: impl Fn(SpriteId) -> Option<(f64, f64)>,
    ) {
        self.focus = focus;
        self.update(locate);
    }

    /// Origin, no focus.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
