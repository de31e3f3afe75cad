//! Compiled-program ownership with rollback on compile failure.

use glam::Vec2;

use crate::error::{Result, WaveError};
use crate::export::PixelBuffer;
use crate::synth::ProgramSource;
use crate::uniforms::{UniformLayout, UniformValues};

/// What a compiled program will be drawn into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    /// The presentable surface.
    Surface,
    /// An `Rgba8Unorm` texture read back to host memory.
    Offscreen,
}

/// GPU (or CPU) implementation behind [`RenderSurface`] and the exporter.
pub trait ShaderBackend {
    type Program;
    type DrawError;

    /// Build a drawable program. The error is a printable diagnostic.
    fn compile(
        &mut self,
        source: &ProgramSource,
        layout: &UniformLayout,
        target: RenderTarget,
    ) -> std::result::Result<Self::Program, String>;

    /// The drawable surface changed size.
    fn resize(&mut self, width: u32, height: u32);

    /// Write `uniforms` into the program's uniform buffer and draw one
    /// full-surface primitive to the surface.
    fn draw(
        &mut self,
        program: &Self::Program,
        uniforms: &[u8],
    ) -> std::result::Result<(), Self::DrawError>;

    /// Draw once into a `width` x `height` off-screen target and return
    /// its pixels after the GPU has finished. Targets are released before
    /// returning, on success and on failure.
    fn render_offscreen(
        &mut self,
        program: &Self::Program,
        uniforms: &[u8],
        width: u32,
        height: u32,
    ) -> std::result::Result<PixelBuffer, String>;
}

pub struct CompiledProgram<P> {
    pub program: P,
    pub source: ProgramSource,
    pub layout: UniformLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    Uncompiled,
    Compiled,
    /// The last compile failed; the previous program (if any) is still bound.
    Failed { has_fallback: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramStatus {
    Adopted,
    /// Text identical to the bound program; nothing was compiled.
    Unchanged,
}

pub struct RenderSurface<B: ShaderBackend> {
    backend: B,
    current: Option<CompiledProgram<B::Program>>,
    resolution: Vec2,
    last_failure: Option<String>,
    compile_count: u64,
}

impl<B: ShaderBackend> RenderSurface<B> {
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self {
            backend,
            current: None,
            resolution: Vec2::new(width as f32, height as f32),
            last_failure: None,
            compile_count: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    /// Only the `resolution` uniform follows the surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.resolution = Vec2::new(width as f32, height as f32);
        self.backend.resize(width, height);
    }

    pub fn state(&self) -> SurfaceState {
        match (&self.current, &self.last_failure) {
            (_, Some(_)) => SurfaceState::Failed {
                has_fallback: self.current.is_some(),
            },
            (Some(_), None) => SurfaceState::Compiled,
            (None, None) => SurfaceState::Uncompiled,
        }
    }

    pub fn current(&self) -> Option<&CompiledProgram<B::Program>> {
        self.current.as_ref()
    }

    pub fn current_source(&self) -> Option<&ProgramSource> {
        self.current.as_ref().map(|c| &c.source)
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Number of successful compiles, for observing skipped recompiles.
    pub fn compile_count(&self) -> u64 {
        self.compile_count
    }

    /// Compile and adopt `source`. On failure the attempt is dropped and the
    /// previously bound program keeps drawing.
    pub fn set_program(&mut self, source: &ProgramSource) -> Result<ProgramStatus> {
        if self
            .current
            .as_ref()
            .is_some_and(|c| c.source.text == source.text)
        {
            self.last_failure = None;
            return Ok(ProgramStatus::Unchanged);
        }

        let layout = UniformLayout::for_program(source);
        match self
            .backend
            .compile(source, &layout, RenderTarget::Surface)
        {
            Ok(program) => {
                log::info!(
                    "[surface] program adopted: {} waves, mode={}, time={}",
                    source.desc.wave_count(),
                    source.desc.mode,
                    source.desc.time_active
                );
                self.current = Some(CompiledProgram {
                    program,
                    source: source.clone(),
                    layout,
                });
                self.last_failure = None;
                self.compile_count += 1;
                Ok(ProgramStatus::Adopted)
            }
            Err(message) => {
                log::warn!(
                    "[surface] compile failed, keeping previous program: {}",
                    message
                );
                self.last_failure = Some(message.clone());
                Err(WaveError::CompileFailure { message })
            }
        }
    }

    /// Push `values` into the bound program and draw. Names the program
    /// does not declare are dropped. Without a program this does nothing.
    pub fn draw(&mut self, values: &UniformValues) -> std::result::Result<(), B::DrawError> {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let bytes = current.layout.pack(values);
        self.backend.draw(&current.program, &bytes)
    }
}
