//! CPU evaluation of a synthesized program, mirroring the WGSL it renders.

use glam::{Vec2, Vec3, Vec4};

use crate::synth::{
    DisplayMode, ProgramDesc, UNIFORM_RESOLUTION, UNIFORM_TIME, UNIFORM_TIME_RATE,
};
use crate::uniforms::{UniformLayout, UniformValue};

const TAU: f32 = std::f32::consts::TAU;

#[inline]
fn fract3(v: Vec3) -> Vec3 {
    v - v.floor()
}

/// Same formulation as the program's `hsv2rgb`.
pub fn hsv2rgb(c: Vec3) -> Vec3 {
    let k = Vec4::new(1.0, 2.0 / 3.0, 1.0 / 3.0, 3.0);
    let p = (fract3(Vec3::splat(c.x) + k.truncate()) * 6.0 - Vec3::splat(k.w)).abs();
    let kx = Vec3::splat(k.x);
    c.z * kx.lerp((p - kx).clamp(Vec3::ZERO, Vec3::ONE), c.y)
}

/// Uniform values as the program sees them, unpacked once per draw.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInputs {
    pub resolution: Vec2,
    pub time: f32,
    pub time_rate: f32,
    pub k: Vec<Vec2>,
}

fn read_f32(layout: &UniformLayout, bytes: &[u8], name: &str) -> f32 {
    match layout.read(bytes, name) {
        Some(UniformValue::F32(v)) => v,
        _ => 0.0,
    }
}

fn read_vec2(layout: &UniformLayout, bytes: &[u8], name: &str) -> Vec2 {
    match layout.read(bytes, name) {
        Some(UniformValue::Vec2(v)) => Vec2::from_array(v),
        _ => Vec2::ZERO,
    }
}

impl FieldInputs {
    pub fn from_uniform_bytes(desc: &ProgramDesc, layout: &UniformLayout, bytes: &[u8]) -> Self {
        Self {
            resolution: read_vec2(layout, bytes, UNIFORM_RESOLUTION),
            time: read_f32(layout, bytes, UNIFORM_TIME),
            time_rate: read_f32(layout, bytes, UNIFORM_TIME_RATE),
            k: desc
                .terms
                .iter()
                .map(|t| read_vec2(layout, bytes, &t.uniform_name()))
                .collect(),
        }
    }

    /// Summed `(resx, resy)` at fragment coordinate `(x, y)`.
    pub fn accumulate(&self, desc: &ProgramDesc, x: f32, y: f32) -> Vec2 {
        let mut acc = Vec2::ZERO;
        for (term, k) in desc.terms.iter().zip(&self.k) {
            let mut angle = k.x * x / self.resolution.x + k.y * y / self.resolution.y;
            if term.has_time_term {
                angle += self.time * TAU / self.time_rate;
            }
            acc += Vec2::new(angle.cos(), angle.sin());
        }
        acc
    }

    /// Output colour of the fragment at `(x, y)`.
    pub fn color_at(&self, desc: &ProgramDesc, x: f32, y: f32) -> Vec4 {
        let res = self.accumulate(desc, x, y);
        let max_intensity = desc.max_intensity();
        let phase_rgb = || hsv2rgb(Vec3::new(res.y.atan2(res.x) / TAU, 1.0, 1.0));
        match desc.mode {
            DisplayMode::Both => {
                let intensity = res.length() / max_intensity;
                (phase_rgb() * intensity).extend(1.0)
            }
            DisplayMode::IntensityOnly => {
                let intensity = res.length() / max_intensity;
                Vec3::splat(intensity).extend(1.0)
            }
            DisplayMode::PhaseOnly => phase_rgb().extend(1.0),
        }
    }
}

/// Quantize a colour the way an `Rgba8Unorm` target stores it.
#[inline]
pub fn to_rgba8(c: Vec4) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(c.x), q(c.y), q(c.z), q(c.w)]
}
