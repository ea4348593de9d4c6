//! The stage runtime and its frame scheduler.
//!
//! [`StageRuntime::tick`] runs one frame:
//!
//! 1. A pending reload is carried out (teardown and rebuild of the start
//!    scene; exit scripts already ran when the reload was requested).
//! 2. A scene that was never activated fires its start scripts and arms its
//!    condition triggers.
//! 3. Unless paused or finished, the simulation phase runs `round(divisor)`
//!    substeps of `dt / divisor`. Each substep steps physics first, then every
//!    action sequence, then applies the stage commands the scripts issued.
//!    The phase is timed; within budget the divisor grows by one, over budget
//!    it shrinks by one, clamped to the configured bounds.
//! 4. The scene is rendered. Renderer errors are logged and swallowed.
//! 5. A pending screenshot request is serviced.
//! 6. The camera follows its focused sprite.
//!
//! Scene transitions live in [`transition`](crate::transition), clone
//! lifecycle in [`clone`](crate::clone); both are `impl StageRuntime` blocks
//! operating on the same state.

use std::time::Duration;

use marionette_script::command::{StageCommand, StageCommandBuffer};
use marionette_script::event::{Event, EventId};
use marionette_script::script::Variables;
use marionette_script::sprite::Sprite;
use marionette_script::sprite_id::{SpriteId, SpriteRoster};

use crate::camera::CameraPositioner;
use crate::clock::{Clock, SystemClock};
use crate::clone::CloneRegistry;
use crate::config::StageConfig;
use crate::peripherals::Peripherals;
use crate::render::{DrawCommand, HeadlessRenderer, RenderFrame, Renderer};
use crate::router::EventRouter;
use crate::scene::{ProjectDefinition, Scene};
use crate::screenshot::{
    service_request, MemoryScreenshotStore, ScreenshotCallback, ScreenshotOutcome,
    ScreenshotRequest, ScreenshotStore,
};
use crate::sound::SoundMixer;
use crate::trace::{FrameSchedule, ScheduleTrace, TickDiagnostics};
use crate::transition::BackupStore;
use crate::StageError;

// ---------------------------------------------------------------------------
// Divisor controller
// ---------------------------------------------------------------------------

/// One step of the divisor controller.
///
/// Within budget the divisor grows by exactly one (finer substeps), over
/// budget it shrinks by exactly one, regardless of how far off the measured
/// time was. The result is clamped to `[min, max]`.
pub fn next_divisor(current: f64, elapsed: Duration, budget: Duration, min: f64, max: f64) -> f64 {
    let next = if elapsed <= budget {
        current + 1.0
    } else {
        current - 1.0
    };
    next.clamp(min, max)
}

/// Number of substeps a frame of `dt` seconds runs at `divisor`.
///
/// Zero for non-positive or non-finite deltas.
pub fn substep_count(dt: f64, divisor: f64) -> u32 {
    if dt > 0.0 && dt.is_finite() {
        divisor.round().max(1.0) as u32
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// StageRuntime
// ---------------------------------------------------------------------------

/// Owns the active scene, the backups, and every stage-wide subsystem.
pub struct StageRuntime {
    pub(crate) config: StageConfig,
    pub(crate) project: ProjectDefinition,
    pub(crate) scene: Scene,
    pub(crate) backups: BackupStore,
    pub(crate) roster: SpriteRoster,
    pub(crate) globals: Variables,
    pub(crate) clones: CloneRegistry,
    pub(crate) router: EventRouter,
    pub(crate) commands: StageCommandBuffer,
    pub(crate) sound: SoundMixer,
    pub(crate) peripherals: Peripherals,
    pub(crate) camera: CameraPositioner,
    pub(crate) divisor: f64,
    pub(crate) paused: bool,
    pub(crate) finished: bool,
    pub(crate) reload_pending: bool,
    renderer: Option<Box<dyn Renderer>>,
    screenshots: Box<dyn ScreenshotStore>,
    pending_screenshot: Option<ScreenshotRequest>,
    clock: Box<dyn Clock>,
    next_world_id: u64,
    tick_counter: u64,
    shut_down: bool,
    last_diagnostics: TickDiagnostics,
    trace: ScheduleTrace,
}

impl StageRuntime {
    /// Create a runtime showing the project's start scene.
    ///
    /// The runtime starts unpaused with the configured initial divisor. It
    /// measures with the [`SystemClock`], renders through a
    /// [`HeadlessRenderer`] (none at all in headless mode) and keeps
    /// screenshots in memory; use the `with_*` builders to replace them.
    ///
    /// # Errors
    ///
    /// [`StageError::EmptyProject`] if the project has no scene.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`StageConfig::validate`].
    pub fn new(project: ProjectDefinition, config: StageConfig) -> Result<Self, StageError> {
        if let Err(err) = config.validate() {
            panic!("invalid stage config: {err}");
        }
        let start = project.start_scene().ok_or(StageError::EmptyProject)?;
        let mut roster = SpriteRoster::new();
        let scene = Scene::instantiate(start, &mut roster, 0);
        let renderer: Option<Box<dyn Renderer>> = if config.headless {
            None
        } else {
            Some(Box::new(HeadlessRenderer::new()))
        };

        Ok(Self {
            divisor: config.initial_divisor,
            globals: project.globals.clone(),
            config,
            project,
            scene,
            backups: BackupStore::new(),
            roster,
            clones: CloneRegistry::new(),
            router: EventRouter::new(),
            commands: StageCommandBuffer::new(),
            sound: SoundMixer::new(),
            peripherals: Peripherals::new(),
            camera: CameraPositioner::new(),
            paused: false,
            finished: false,
            reload_pending: false,
            renderer,
            screenshots: Box::new(MemoryScreenshotStore::new()),
            pending_screenshot: None,
            clock: Box::new(SystemClock::new()),
            next_world_id: 1,
            tick_counter: 0,
            shut_down: false,
            last_diagnostics: TickDiagnostics::default(),
            trace: ScheduleTrace::new(),
        })
    }

    /// Measure the simulation phase with `clock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Render through `renderer`. Ignored in headless mode.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        if !self.config.headless {
            self.renderer = Some(Box::new(renderer));
        }
        self
    }

    /// Write screenshots to `store`.
    pub fn with_screenshot_store(mut self, store: impl ScreenshotStore + 'static) -> Self {
        self.screenshots = Box::new(store);
        self
    }

    // -- frame loop ---------------------------------------------------------

    /// Run one frame with a wall-clock delta of `frame_dt` seconds.
    pub fn tick(&mut self, frame_dt: f64) -> &TickDiagnostics {
        let mut diag = TickDiagnostics {
            divisor_before: self.divisor,
            divisor_after: self.divisor,
            ..Default::default()
        };
        if self.shut_down {
            self.last_diagnostics = diag;
            return &self.last_diagnostics;
        }

        // Phase 1: pending reload.
        if self.reload_pending {
            self.perform_reload();
            diag.reloaded = true;
            diag.divisor_before = self.divisor;
        }

        if !self.finished {
            // Phase 2: first activation.
            if self.scene.first_activation {
                let started = self.scene.activate();
                tracing::debug!(scene = self.scene.name(), started, "scene activated");
                self.router.deliver_pending(&mut self.scene.sprites);
            }

            // Phase 3: simulation.
            if !self.paused {
                self.simulate(frame_dt, &mut diag);
            }

            // Phase 4: render.
            self.render_frame(&mut diag);
        }

        // Phase 5: screenshot.
        if let Some(request) = self.pending_screenshot.take() {
            service_request(
                request,
                self.renderer.as_deref_mut(),
                self.screenshots.as_mut(),
            );
        }

        // Phase 6: camera follow.
        let scene = &self.scene;
        self.camera.update(|id| locate(scene, id));

        self.tick_counter += 1;
        diag.divisor_after = self.divisor;
        self.last_diagnostics = diag;
        &self.last_diagnostics
    }

    /// Run `count` frames of `frame_dt` seconds each.
    pub fn run_ticks(&mut self, count: u64, frame_dt: f64) {
        for _ in 0..count {
            self.tick(frame_dt);
        }
    }

    fn simulate(&mut self, dt: f64, diag: &mut TickDiagnostics) {
        self.router.deliver_pending(&mut self.scene.sprites);

        let divisor = self.divisor;
        let substeps = substep_count(dt, divisor);
        let substep_dt = if substeps > 0 { dt / divisor } else { 0.0 };

        let started = self.clock.now();
        let mut ran = 0;
        while ran < substeps {
            ran += 1;
            if self.substep(substep_dt, diag) {
                // The rest of the frame belonged to the scene just left.
                break;
            }
        }
        let elapsed = self.clock.now().saturating_sub(started);

        self.divisor = next_divisor(
            self.divisor,
            elapsed,
            self.config.step_budget(),
            self.config.min_divisor,
            self.config.max_divisor,
        );
        tracing::trace!(substeps = ran, ?elapsed, divisor = self.divisor, "simulation phase done");

        diag.substeps = ran;
        diag.substep_dt = substep_dt;
        diag.step_time = elapsed;
        self.trace.record(FrameSchedule {
            divisor_before: divisor,
            substeps: ran,
            substep_dt,
            divisor_after: self.divisor,
        });
    }

    /// One substep. Returns `true` if a script switched scenes.
    fn substep(&mut self, dt: f64, diag: &mut TickDiagnostics) -> bool {
        // Physics first.
        let scene = &mut self.scene;
        for sprite in scene.sprites.iter_mut() {
            if sprite.look_mut().take_physics_dirty() {
                let (x, y) = sprite.look().position();
                scene.physics.set_position(sprite.id(), x, y);
            }
        }
        diag.collisions += scene.physics.step(dt).len();
        for (id, x, y) in scene.physics.read_positions() {
            if let Some(sprite) = scene.sprites.iter_mut().find(|s| s.id() == id) {
                sprite.look_mut().sync_from_physics(x, y);
            }
        }

        // Then scripts.
        for sprite in scene.sprites.iter_mut() {
            let errors = sprite.advance(dt, &mut self.globals, &mut self.commands);
            for err in &errors {
                tracing::warn!(sprite = %sprite.id(), name = sprite.name(), error = %err, "script failed");
            }
            diag.script_failures += errors.len();
        }
        for sprite in scene.sprites.iter_mut() {
            sprite.check_conditions();
        }
        self.sound.advance(dt);
        self.peripherals.advance(dt);

        self.apply_commands()
    }

    /// Apply queued stage commands in issue order. Returns `true` if one of
    /// them switched scenes; commands queued after it are dropped.
    fn apply_commands(&mut self) -> bool {
        let issued = self.commands.drain();
        let total = issued.len();
        for (applied, cmd) in issued.into_iter().enumerate() {
            let issuer = cmd.issued_by;
            let switched = match cmd.command {
                StageCommand::Broadcast { message } => {
                    self.router
                        .fire_to_all(&EventId::Broadcast(message), &mut self.scene.sprites);
                    false
                }
                StageCommand::CreateClone => {
                    self.spawn_clone(issuer, None);
                    false
                }
                StageCommand::CreateCloneOf { sprite_name } => {
                    match self.scene.sprite_by_name(&sprite_name).map(Sprite::id) {
                        Some(source) => {
                            self.spawn_clone(source, None);
                        }
                        None => tracing::debug!(sprite = %sprite_name, "clone source not found"),
                    }
                    false
                }
                StageCommand::DeleteThisClone => {
                    if let Err(err) = self.destroy_clone(issuer) {
                        tracing::debug!(sprite = %issuer, error = %err, "delete clone ignored");
                    }
                    false
                }
                StageCommand::PlaySound { path } => {
                    self.sound.play(path, issuer);
                    false
                }
                StageCommand::StopAllSounds => {
                    self.sound.clear();
                    false
                }
                StageCommand::Vibrate { seconds } => {
                    self.peripherals.vibrate(seconds);
                    false
                }
                StageCommand::SetFlash { on } => {
                    self.peripherals.set_flash(on);
                    false
                }
                StageCommand::SetCameraPreview { on } => {
                    self.peripherals.set_camera_preview(on);
                    false
                }
                StageCommand::FocusCamera => {
                    self.camera.set_focus(Some(issuer));
                    false
                }
                StageCommand::TransitionToScene {
                    scene,
                    stop_audio,
                    persist,
                } => self.transition_to(&scene, stop_audio, persist),
                StageCommand::StartScene {
                    scene,
                    stop_audio,
                    persist,
                } => self.start_scene(&scene, stop_audio, persist),
            };
            if switched {
                let dropped = total - applied - 1;
                if dropped > 0 {
                    tracing::debug!(dropped, "commands after scene switch dropped");
                }
                return true;
            }
        }
        false
    }

    fn render_frame(&mut self, diag: &mut TickDiagnostics) {
        if self.renderer.is_none() {
            return;
        }
        let frame = self.extract_frame();
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(err) = renderer.render(&frame) {
                tracing::warn!(tick = self.tick_counter, error = %format!("{err:#}"), "render failed");
                diag.render_failed = true;
            }
        }
    }

    /// Draw commands for every visible sprite in actor order.
    pub fn extract_frame(&self) -> RenderFrame {
        let draw_commands = self
            .scene
            .actors
            .iter()
            .filter_map(|&id| self.scene.sprite(id))
            .filter(|s| s.look().is_visible() && !s.is_invalidated())
            .map(|s| {
                let (x, y) = s.look().position();
                DrawCommand {
                    sprite: s.id(),
                    frame: s.look().current_frame_name().map(str::to_owned),
                    x,
                    y,
                    pinned_to_camera: s.look().flags().pinned_to_camera,
                }
            })
            .collect();
        RenderFrame {
            draw_commands,
            camera: self.camera.position(),
        }
    }

    // -- reload and exit scripts ---------------------------------------------

    /// Run every enabled exit script of the active scene to completion,
    /// ignoring the step budget. Commands the exit scripts issue are
    /// discarded. Returns the number of exit scripts run.
    pub fn execute_exit_scripts(&mut self) -> usize {
        let limit = self.config.exit_script_step_limit;
        let mut ran = 0;
        for sprite in self.scene.sprites.iter_mut() {
            let (count, errors) = sprite.run_exit_scripts(&mut self.globals, &mut self.commands, limit);
            ran += count;
            for err in &errors {
                tracing::warn!(sprite = %sprite.id(), error = %err, "exit script failed");
            }
        }
        let discarded = self.commands.drain().len();
        tracing::info!(ran, discarded, "exit scripts executed");
        ran
    }

    /// Ask for a project reload.
    ///
    /// Exit scripts run right away against the still intact runtime; the
    /// teardown happens at the start of the next tick. Returns `false` (and
    /// does nothing) if a reload is already pending or the runtime is shut
    /// down.
    pub fn request_reload(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        if self.reload_pending {
            tracing::debug!("reload already pending, request ignored");
            return false;
        }
        self.execute_exit_scripts();
        self.reload_pending = true;
        true
    }

    pub fn is_reload_pending(&self) -> bool {
        self.reload_pending
    }

    fn perform_reload(&mut self) {
        tracing::info!(
            scene = self.scene.name(),
            backups = ?self.backups.names(),
            "reloading project"
        );

        for backup in self.backups.drain() {
            backup.discard(&mut self.roster);
        }
        self.remove_all_clones();
        self.scene.dispose(&mut self.roster);

        let world_id = self.allocate_world_id();
        // The project is never empty, `new` checked it.
        if let Some(start) = self.project.start_scene() {
            self.scene = Scene::instantiate(start, &mut self.roster, world_id);
        }

        self.sound.clear();
        self.peripherals.reset();
        self.camera.reset();
        self.globals = self.project.globals.clone();
        self.divisor = self.config.initial_divisor;
        self.commands.clear();
        self.router.clear();

        self.paused = true;
        self.sound.pause();
        self.reload_pending = false;
        tracing::info!(scene = self.scene.name(), world = world_id, "project reloaded");
    }

    // -- pause, finish, shutdown -----------------------------------------------

    /// Pause or resume simulation and sound.
    ///
    /// Pausing is ignored once finished or while a reload is pending; resuming
    /// is ignored while a reload is pending.
    pub fn set_paused(&mut self, paused: bool) {
        if self.shut_down || self.reload_pending || (paused && self.finished) {
            return;
        }
        self.paused = paused;
        if paused {
            self.sound.pause();
            self.peripherals.pause_vibration();
        } else {
            self.sound.resume();
            self.peripherals.resume_vibration();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop simulating and rendering for good. Sound is paused.
    pub fn finish(&mut self) {
        self.finished = true;
        self.sound.pause();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run exit scripts, then release every sprite, the physics world and all
    /// backups. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.execute_exit_scripts();
        self.remove_all_clones();
        self.scene.dispose(&mut self.roster);
        for backup in self.backups.drain() {
            backup.discard(&mut self.roster);
        }
        self.sound.clear();
        self.peripherals.reset();
        self.finished = true;
        self.shut_down = true;
        tracing::info!("stage shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // -- events and screenshots ---------------------------------------------

    /// Fire `event` at every sprite of the active scene.
    ///
    /// Sequences are armed immediately and start running with the next
    /// substep. Before the scene's first activation (or while a reload is
    /// pending) the event is queued instead and delivered once the scene is
    /// live.
    pub fn broadcast_event(&mut self, event: impl Into<Event>) {
        let event = event.into();
        if self.shut_down {
            return;
        }
        if self.scene.first_activation || self.reload_pending {
            self.router.enqueue(event);
        } else {
            self.router.fire_to_all(&event.id, &mut self.scene.sprites);
        }
    }

    /// Ask for a screenshot after the next render. A later request replaces
    /// an earlier one, whose callback receives [`ScreenshotOutcome::Skipped`].
    pub fn request_screenshot(&mut self, name: impl Into<String>, callback: ScreenshotCallback) {
        let request = ScreenshotRequest::new(name, callback);
        if let Some(previous) = self.pending_screenshot.replace(request) {
            tracing::debug!(screenshot = %previous.name, "screenshot request replaced");
            (previous.callback)(ScreenshotOutcome::Skipped);
        }
    }

    pub fn has_pending_screenshot(&self) -> bool {
        self.pending_screenshot.is_some()
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn project(&self) -> &ProjectDefinition {
        &self.project
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.scene.sprite(id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.scene.sprite_mut(id)
    }

    /// Id of the first sprite named `name` in the active scene, preferring
    /// non-clones.
    pub fn sprite_id(&self, name: &str) -> Option<SpriteId> {
        self.scene.sprite_by_name(name).map(Sprite::id)
    }

    /// Current substep divisor.
    pub fn divisor(&self) -> f64 {
        self.divisor
    }

    pub fn globals(&self) -> &Variables {
        &self.globals
    }

    /// A global variable, `0.0` when unset.
    pub fn global(&self, name: &str) -> f64 {
        self.globals.get(name).copied().unwrap_or(0.0)
    }

    pub fn sound(&self) -> &SoundMixer {
        &self.sound
    }

    pub fn peripherals(&self) -> &Peripherals {
        &self.peripherals
    }

    pub fn camera(&self) -> &CameraPositioner {
        &self.camera
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Sprites alive across the active scene and every backup.
    pub fn live_sprite_count(&self) -> usize {
        self.roster.live_count()
    }

    /// Clones alive across the active scene and every backup.
    pub fn live_clone_count(&self) -> usize {
        self.roster.live_clone_count()
    }

    /// The number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    pub fn trace(&self) -> &ScheduleTrace {
        &self.trace
    }

    pub(crate) fn allocate_world_id(&mut self) -> u64 {
        let id = self.next_world_id;
        self.next_world_id += 1;
        id
    }
}

/// Position of a live sprite of `scene`.
pub(crate) fn locate(scene: &Scene, id: SpriteId) -> Option<(f64, f64)> {
    scene
        .sprite(id)
        .filter(|s| !s.is_invalidated())
        .map(|s| s.look().position())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
