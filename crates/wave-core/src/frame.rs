//! Per-frame driver tying the store, synthesis, the render surface and the
//! exporter together on one timeline.
//!
//! Structural store changes are turned into a new program (and a compile
//! attempt) before the next uniform push, so the names pushed each frame
//! match the bound program except across a failed compile, where the
//! surface drops the names it does not know.

use glam::Vec2;

use crate::animation::AnimationState;
use crate::constants::FieldParams;
use crate::error::Result;
use crate::export::{ExportJob, OffscreenExporter, PixelBuffer};
use crate::input::{InputController, InputOutcome, PointerEvent};
use crate::surface::{ProgramStatus, RenderSurface, ShaderBackend};
use crate::synth::{synthesize, DisplayMode, ProgramSource};
use crate::uniforms::{bind_uniforms, UniformValues};
use crate::wavevector::{StoreEvent, WavevectorStore};

pub struct FrameContext<B: ShaderBackend> {
    store: WavevectorStore,
    input: InputController,
    mode: DisplayMode,
    animation: AnimationState,
    program: ProgramSource,
    surface: RenderSurface<B>,
    exporter: OffscreenExporter,
    width: u32,
    height: u32,
    frames: u64,
}

impl<B: ShaderBackend> FrameContext<B> {
    pub fn new(backend: B, width: u32, height: u32, params: FieldParams) -> Self {
        let store = WavevectorStore::new(width, height, params);
        let mode = DisplayMode::default();
        let animation = AnimationState::default();
        let program = synthesize(&store.snapshot(), mode, animation.time_active());
        let mut ctx = Self {
            store,
            input: InputController::new(),
            mode,
            animation,
            program,
            surface: RenderSurface::new(backend, width, height),
            exporter: OffscreenExporter::new(),
            width,
            height,
            frames: 0,
        };
        if let Err(e) = ctx.apply_program() {
            log::error!("[frame] initial program rejected: {}", e);
        }
        ctx
    }

    pub fn store(&self) -> &WavevectorStore {
        &self.store
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Most recently synthesized program, whether or not it compiled.
    pub fn program(&self) -> &ProgramSource {
        &self.program
    }

    pub fn surface(&self) -> &RenderSurface<B> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut RenderSurface<B> {
        &mut self.surface
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    // ---------------- Input ----------------

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<InputOutcome> {
        let outcome = self.input.handle(&mut self.store, event);
        self.sync_program()?;
        outcome
    }

    pub fn pointer_down(&mut self, position: Vec2) -> Result<InputOutcome> {
        self.handle_pointer(PointerEvent::Down(position))
    }

    pub fn pointer_move(&mut self, position: Vec2) -> Result<InputOutcome> {
        self.handle_pointer(PointerEvent::Move(position))
    }

    pub fn pointer_up(&mut self, position: Vec2) -> Result<InputOutcome> {
        self.handle_pointer(PointerEvent::Up(position))
    }

    // ---------------- Display controls ----------------

    /// Swaps the colour mapping; the summation body is reused.
    pub fn set_mode(&mut self, mode: DisplayMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.mode = mode;
        self.program = self.program.with_mode(mode);
        self.apply_program().map(|_| ())
    }

    pub fn set_time_active(&mut self, active: bool) -> Result<()> {
        if !self.animation.set_time_active(active) {
            return Ok(());
        }
        self.resynthesize()
    }

    /// Only the `time_rate` uniform changes; no resynthesis.
    pub fn set_time_rate(&mut self, rate: f32) -> Result<()> {
        self.animation.set_time_rate(rate)
    }

    /// Remove every wavevector.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear();
        self.input.reset();
        self.sync_program()
    }

    /// Updates the `resolution` uniform and the store's mapping; never
    /// resynthesizes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.store.set_canvas_size(width, height);
        self.surface.resize(width, height);
    }

    // ---------------- Frame ----------------

    /// Uniform values for a frame at clock time `now`.
    pub fn uniform_values(&self, now: f64) -> UniformValues {
        bind_uniforms(
            &self.store.snapshot(),
            &self.animation,
            now as f32,
            self.surface.resolution(),
        )
    }

    /// One clock tick: catch up on structural changes, then push uniforms
    /// and draw. Compile failures are logged and the last good program
    /// keeps drawing.
    pub fn frame(&mut self, now: f64) -> std::result::Result<(), B::DrawError> {
        if let Err(e) = self.sync_program() {
            log::warn!("[frame] {}", e);
        }
        let values = self.uniform_values(now);
        self.frames += 1;
        self.surface.draw(&values)
    }

    // ---------------- Export ----------------

    /// Reserve the exporter. Defaults to the canvas size.
    pub fn begin_export(&self, size: Option<(u32, u32)>) -> Result<ExportJob> {
        let (w, h) = size.unwrap_or((self.width, self.height));
        self.exporter.begin(w, h)
    }

    /// Render an export job of the current program against the live store.
    pub fn finish_export(&mut self, job: ExportJob) -> Result<PixelBuffer> {
        let wavevectors = self.store.snapshot();
        job.run(self.surface.backend_mut(), &self.program, &wavevectors)
    }

    pub fn export_image(&mut self, size: Option<(u32, u32)>) -> Result<PixelBuffer> {
        let job = self.begin_export(size)?;
        self.finish_export(job)
    }

    pub fn export_in_progress(&self) -> bool {
        self.exporter.is_busy()
    }

    // ---------------- Program sync ----------------

    /// Resynthesize if the store reported a structural change since the
    /// last call.
    pub fn sync_program(&mut self) -> Result<()> {
        let events = self.store.drain_events();
        if events.contains(&StoreEvent::SetChanged) {
            self.resynthesize()?;
        }
        Ok(())
    }

    fn resynthesize(&mut self) -> Result<()> {
        self.program = synthesize(
            &self.store.snapshot(),
            self.mode,
            self.animation.time_active(),
        );
        self.apply_program().map(|_| ())
    }

    fn apply_program(&mut self) -> Result<ProgramStatus> {
        self.surface.set_program(&self.program)
    }
}
