//! Per-frame uniform values and their byte layout in the program's
//! uniform block.

use fnv::FnvHashMap;
use glam::Vec2;

use crate::animation::AnimationState;
use crate::synth::{
    wavevector_uniform_name, ProgramSource, UNIFORM_RESOLUTION, UNIFORM_TIME, UNIFORM_TIME_RATE,
};
use crate::wavevector::Wavevector;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
}

impl UniformValue {
    fn kind(&self) -> UniformKind {
        match self {
            UniformValue::F32(_) => UniformKind::F32,
            UniformValue::Vec2(_) => UniformKind::Vec2,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

/// Name to value mapping pushed into the bound program each frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformValues {
    values: FnvHashMap<String, UniformValue>,
}

impl UniformValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Build the uniform values for one frame from the live state.
pub fn bind_uniforms(
    wavevectors: &[Wavevector],
    animation: &AnimationState,
    clock_time: f32,
    canvas_size: Vec2,
) -> UniformValues {
    bind_with(wavevectors, clock_time, animation.time_rate(), canvas_size)
}

pub(crate) fn bind_with(
    wavevectors: &[Wavevector],
    time: f32,
    time_rate: f32,
    resolution: Vec2,
) -> UniformValues {
    let mut values = UniformValues::new();
    values.set(UNIFORM_RESOLUTION, resolution);
    values.set(UNIFORM_TIME, time);
    values.set(UNIFORM_TIME_RATE, time_rate);
    for wv in wavevectors {
        values.set(wavevector_uniform_name(wv.index), wv.k);
    }
    values
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    F32,
    Vec2,
}

impl UniformKind {
    fn size(self) -> usize {
        match self {
            UniformKind::F32 => 4,
            UniformKind::Vec2 => 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// Byte layout of a program's `Uniforms` struct (WGSL uniform address
/// space: `f32` aligns to 4, `vec2<f32>` to 8, buffer rounded up to 16).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: usize,
}

fn kind_for(name: &str) -> UniformKind {
    match name {
        UNIFORM_TIME | UNIFORM_TIME_RATE => UniformKind::F32,
        _ => UniformKind::Vec2,
    }
}

impl UniformLayout {
    pub fn for_program(source: &ProgramSource) -> Self {
        Self::from_names(source.uniforms.iter().map(String::as_str))
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut slots = Vec::new();
        let mut offset = 0usize;
        for name in names {
            let kind = kind_for(name);
            let align = kind.size();
            offset = offset.div_ceil(align) * align;
            slots.push(UniformSlot {
                name: name.to_string(),
                kind,
                offset,
            });
            offset += kind.size();
        }
        let size = offset.div_ceil(16).max(1) * 16;
        Self { slots, size }
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// Buffer size in bytes, a multiple of 16.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Byte image of `values` for this layout. Names the program does not
    /// declare are skipped, declared names without a value stay zero, and
    /// a value whose kind does not match its slot is skipped.
    pub fn pack(&self, values: &UniformValues) -> Vec<u8> {
        let mut words = vec![0f32; self.size / 4];
        for slot in &self.slots {
            let Some(value) = values.get(&slot.name) else {
                continue;
            };
            if value.kind() != slot.kind {
                log::warn!("[uniforms] kind mismatch for {}", slot.name);
                continue;
            }
            let w = slot.offset / 4;
            match value {
                UniformValue::F32(v) => words[w] = v,
                UniformValue::Vec2([a, b]) => {
                    words[w] = a;
                    words[w + 1] = b;
                }
            }
        }
        bytemuck::cast_slice(&words).to_vec()
    }

    /// Read a packed value back out of a uniform byte image.
    pub fn read(&self, bytes: &[u8], name: &str) -> Option<UniformValue> {
        let slot = self.slot(name)?;
        let at = |o: usize| -> Option<f32> {
            bytes.get(o..o + 4).map(bytemuck::pod_read_unaligned::<f32>)
        };
        match slot.kind {
            UniformKind::F32 => at(slot.offset).map(UniformValue::F32),
            UniformKind::Vec2 => Some(UniformValue::Vec2([at(slot.offset)?, at(slot.offset + 4)?])),
        }
    }
}
