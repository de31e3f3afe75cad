//! CPU rasterizer implementing [`ShaderBackend`].
//!
//! Programs are compiled by validating the WGSL with naga, then evaluated
//! per pixel from their term descriptors with the same uniform byte image a
//! GPU backend would upload. Used for headless rendering and tests.

use std::convert::Infallible;

use crate::export::PixelBuffer;
use crate::field::{to_rgba8, FieldInputs};
use crate::surface::{RenderTarget, ShaderBackend};
use crate::synth::{validate_wgsl, ProgramDesc, ProgramSource};
use crate::uniforms::UniformLayout;

#[derive(Clone, Debug)]
pub struct SoftwareProgram {
    pub desc: ProgramDesc,
    pub layout: UniformLayout,
    pub target: RenderTarget,
}

pub struct SoftwareBackend {
    framebuffer: PixelBuffer,
    draw_count: u64,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: PixelBuffer::new(width, height),
            draw_count: 0,
        }
    }

    /// Pixels produced by the most recent `draw`.
    pub fn framebuffer(&self) -> &PixelBuffer {
        &self.framebuffer
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }
}

fn rasterize(program: &SoftwareProgram, uniforms: &[u8], out: &mut PixelBuffer) {
    let inputs = FieldInputs::from_uniform_bytes(&program.desc, &program.layout, uniforms);
    for y in 0..out.height {
        for x in 0..out.width {
            // fragment coordinates address pixel centers
            let c = inputs.color_at(&program.desc, x as f32 + 0.5, y as f32 + 0.5);
            out.put_pixel(x, y, to_rgba8(c));
        }
    }
}

impl ShaderBackend for SoftwareBackend {
    type Program = SoftwareProgram;
    type DrawError = Infallible;

    fn compile(
        &mut self,
        source: &ProgramSource,
        layout: &UniformLayout,
        target: RenderTarget,
    ) -> Result<SoftwareProgram, String> {
        validate_wgsl(&source.text)?;
        Ok(SoftwareProgram {
            desc: source.desc.clone(),
            layout: layout.clone(),
            target,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == self.framebuffer.width && height == self.framebuffer.height {
            return;
        }
        self.framebuffer = PixelBuffer::new(width, height);
    }

    fn draw(&mut self, program: &SoftwareProgram, uniforms: &[u8]) -> Result<(), Infallible> {
        rasterize(program, uniforms, &mut self.framebuffer);
        self.draw_count += 1;
        Ok(())
    }

    fn render_offscreen(
        &mut self,
        program: &SoftwareProgram,
        uniforms: &[u8],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, String> {
        let mut pixels = PixelBuffer::new(width, height);
        rasterize(program, uniforms, &mut pixels);
        Ok(pixels)
    }
}
