//! Screenshot requests and storage.
//!
//! A project keeps at most two screenshots: a *manual* one the user asked for
//! and an *automatic* one the stage takes on its own. The manual screenshot
//! always wins:
//!
//! - an automatic request is skipped once a manual screenshot exists,
//! - after any capture, if both exist the automatic one is deleted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use crate::render::Renderer;

/// File name of the screenshot the user took.
pub const MANUAL_SCREENSHOT: &str = "manual_screenshot.png";
/// File name of the screenshot the stage took by itself.
pub const AUTOMATIC_SCREENSHOT: &str = "automatic_screenshot.png";

/// How a screenshot request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    Saved,
    /// Capture or write failed; details were logged.
    Failed,
    /// A manual screenshot already exists, nothing was captured.
    Skipped,
}

/// Callback invoked exactly once with the outcome of a request.
pub type ScreenshotCallback = Box<dyn FnOnce(ScreenshotOutcome) + Send>;

/// A pending screenshot.
pub struct ScreenshotRequest {
    pub name: String,
    pub callback: ScreenshotCallback,
}

impl ScreenshotRequest {
    pub fn new(name: impl Into<String>, callback: ScreenshotCallback) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl fmt::Debug for ScreenshotRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenshotRequest")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Where screenshots are written.
pub trait ScreenshotStore: Send {
    fn exists(&self, name: &str) -> bool;
    fn save(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()>;
    /// Deleting a missing screenshot is not an error.
    fn delete(&mut self, name: &str) -> anyhow::Result<()>;
}

/// Screenshots as files in one directory.
#[derive(Debug, Clone)]
pub struct DirScreenshotStore {
    dir: PathBuf,
}

impl DirScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ScreenshotStore for DirScreenshotStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn save(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating screenshot dir {}", self.dir.display()))?;
        let path = self.path(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("writing screenshot {}", path.display()))
    }

    fn delete(&mut self, name: &str) -> anyhow::Result<()> {
        let path = self.path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("deleting screenshot {}", path.display()))
            }
        }
    }
}

/// Screenshots kept in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryScreenshotStore {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryScreenshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes of `name`, if any.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScreenshotStore for MemoryScreenshotStore {
    fn exists(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn save(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.lock().insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> anyhow::Result<()> {
        self.lock().remove(name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Servicing
// ---------------------------------------------------------------------------

/// Capture and save one request, then enforce manual-over-automatic
/// precedence. The callback is invoked before returning.
pub fn service_request(
    request: ScreenshotRequest,
    renderer: Option<&mut (dyn Renderer + 'static)>,
    store: &mut dyn ScreenshotStore,
) -> ScreenshotOutcome {
    let ScreenshotRequest { name, callback } = request;

    let outcome = if !store.exists(MANUAL_SCREENSHOT) || name == MANUAL_SCREENSHOT {
        match capture_and_save(&name, renderer, store) {
            Ok(()) => {
                tracing::info!(screenshot = %name, "screenshot saved");
                ScreenshotOutcome::Saved
            }
            Err(err) => {
                tracing::warn!(screenshot = %name, error = %format!("{err:#}"), "screenshot failed");
                ScreenshotOutcome::Failed
            }
        }
    } else {
        tracing::debug!(screenshot = %name, "manual screenshot exists, skipping capture");
        ScreenshotOutcome::Skipped
    };

    if store.exists(MANUAL_SCREENSHOT) && store.exists(AUTOMATIC_SCREENSHOT) {
        if let Err(err) = store.delete(AUTOMATIC_SCREENSHOT) {
            tracing::warn!(error = %format!("{err:#}"), "could not delete automatic screenshot");
        }
    }

    callback(outcome);
    outcome
}

fn capture_and_save(
    name: &str,
    renderer: Option<&mut (dyn Renderer + 'static)>,
    store: &mut dyn ScreenshotStore,
) -> anyhow::Result<()> {
    let renderer = renderer.context("no renderer attached")?;
    let pixels = renderer.capture_pixels()?;
    store.save(name, &pixels)
}
