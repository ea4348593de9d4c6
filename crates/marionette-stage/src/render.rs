//! Renderer seam.
//!
//! The stage does not rasterize anything. Each frame it extracts a
//! [`RenderFrame`] (one [`DrawCommand`] per visible sprite, in actor z-order,
//! plus the camera position) and hands it to a [`Renderer`]. Renderer failures
//! are opaque to the stage: they come back as [`anyhow::Error`], are logged,
//! and the frame loop carries on.

use std::fmt::Write as _;

use marionette_script::sprite_id::SpriteId;

/// One sprite to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub sprite: SpriteId,
    /// Name of the look frame, `None` for looks without frames.
    pub frame: Option<String>,
    pub x: f64,
    pub y: f64,
    /// Drawn in screen space, ignoring the camera.
    pub pinned_to_camera: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    /// Back to front.
    pub draw_commands: Vec<DrawCommand>,
    pub camera: (f64, f64),
}

/// Rasterization backend.
pub trait Renderer: Send {
    /// Draw one frame.
    fn render(&mut self, frame: &RenderFrame) -> anyhow::Result<()>;

    /// Encoded pixels of the last rendered frame, for screenshots.
    fn capture_pixels(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// A renderer that draws nothing and remembers the last frame.
///
/// Used in headless mode and in tests. Captured "pixels" are a one-line-per-
/// sprite text dump of the last frame.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    last_frame: Option<RenderFrame>,
    frames_rendered: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.last_frame.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        self.last_frame = Some(frame.clone());
        self.frames_rendered += 1;
        Ok(())
    }

    fn capture_pixels(&mut self) -> anyhow::Result<Vec<u8>> {
        let frame = self
            .last_frame
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no frame rendered yet"))?;
        let mut out = String::new();
        for cmd in &frame.draw_commands {
            writeln!(
                out,
                "{} {} {:.3} {:.3}",
                cmd.sprite,
                cmd.frame.as_deref().unwrap_or("-"),
                cmd.x,
                cmd.y
            )?;
        }
        Ok(out.into_bytes())
    }
}
