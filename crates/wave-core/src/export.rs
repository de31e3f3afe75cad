//! Off-screen rendering of the current program at an arbitrary size.
//!
//! An export compiles the program afresh for an off-screen target, so the
//! on-screen program and resolution are never touched. Exports run one at
//! a time: an [`ExportJob`] holds the exporter's busy flag from
//! [`OffscreenExporter::begin`] until it finishes or is dropped. `run`
//! blocks until the pixels have been read back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec2;

use crate::constants::{EXPORT_MAX_DIMENSION, EXPORT_TIME, EXPORT_TIME_RATE};
use crate::error::{Result, WaveError};
use crate::surface::{RenderTarget, ShaderBackend};
use crate::synth::ProgramSource;
use crate::uniforms::{bind_with, UniformLayout};
use crate::wavevector::Wavevector;

/// Tightly packed RGBA8 pixels, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.data[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}

#[derive(Debug, Default)]
pub struct OffscreenExporter {
    busy: Arc<AtomicBool>,
}

impl OffscreenExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Reserve the exporter for one `width` x `height` export.
    pub fn begin(&self, width: u32, height: u32) -> Result<ExportJob> {
        if width == 0 || height == 0 || width > EXPORT_MAX_DIMENSION || height > EXPORT_MAX_DIMENSION
        {
            return Err(WaveError::InvalidTargetSize { width, height });
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            log::warn!("[export] rejected {}x{}: export already running", width, height);
            return Err(WaveError::ExportInProgress);
        }
        Ok(ExportJob {
            width,
            height,
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn export_image<B: ShaderBackend>(
        &self,
        backend: &mut B,
        source: &ProgramSource,
        wavevectors: &[Wavevector],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer> {
        self.begin(width, height)?.run(backend, source, wavevectors)
    }
}

/// A reserved export. Dropping it releases the exporter.
#[derive(Debug)]
pub struct ExportJob {
    width: u32,
    height: u32,
    busy: Arc<AtomicBool>,
}

impl ExportJob {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Compile `source` for an off-screen target, draw it with `time = 0`
    /// and `time_rate = 1`, and read the pixels back.
    pub fn run<B: ShaderBackend>(
        self,
        backend: &mut B,
        source: &ProgramSource,
        wavevectors: &[Wavevector],
    ) -> Result<PixelBuffer> {
        let layout = UniformLayout::for_program(source);
        let program = backend
            .compile(source, &layout, RenderTarget::Offscreen)
            .map_err(|message| WaveError::CompileFailure { message })?;
        let values = bind_with(
            wavevectors,
            EXPORT_TIME,
            EXPORT_TIME_RATE,
            Vec2::new(self.width as f32, self.height as f32),
        );
        let bytes = layout.pack(&values);
        let pixels = backend
            .render_offscreen(&program, &bytes, self.width, self.height)
            .map_err(|message| WaveError::ExportFailure { message })?;
        log::info!(
            "[export] rendered {}x{} with {} waves",
            self.width,
            self.height,
            wavevectors.len()
        );
        Ok(pixels)
    }
}

impl Drop for ExportJob {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
