//! WGSL program synthesis for the plane-wave interference field.
//!
//! Synthesis runs in two steps. [`ProgramDesc::new`] turns the ordered
//! wavevectors into typed term descriptors, then [`ProgramDesc::render`]
//! formats those into three text sections:
//!
//! - `header`: uniform block (`resolution`, `time`, `time_rate`, `k<i>`),
//!   HSV helper and the full-screen vertex entry point;
//! - `body`: fragment entry point up to the `max_intensity` constant, with
//!   one `cos`/`sin` accumulation pair per wavevector;
//! - `tail`: colour mapping for the selected [`DisplayMode`].
//!
//! Rendering is deterministic: equal inputs give byte-identical text.

use std::fmt::{self, Write as _};

use crate::wavevector::Wavevector;

pub const UNIFORM_RESOLUTION: &str = "resolution";
pub const UNIFORM_TIME: &str = "time";
pub const UNIFORM_TIME_RATE: &str = "time_rate";

pub const VERTEX_ENTRY: &str = "vs_fullscreen";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Name of the uniform carrying the wavevector at dense index `index`.
#[inline]
pub fn wavevector_uniform_name(index: usize) -> String {
    format!("k{index}")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Phase as hue, intensity as brightness.
    #[default]
    Both,
    /// Grayscale intensity.
    IntensityOnly,
    /// Phase as hue at full brightness.
    PhaseOnly,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [
        DisplayMode::Both,
        DisplayMode::IntensityOnly,
        DisplayMode::PhaseOnly,
    ];

    pub fn next(self) -> Self {
        match self {
            DisplayMode::Both => DisplayMode::IntensityOnly,
            DisplayMode::IntensityOnly => DisplayMode::PhaseOnly,
            DisplayMode::PhaseOnly => DisplayMode::Both,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayMode::Both => "both",
            DisplayMode::IntensityOnly => "intensity",
            DisplayMode::PhaseOnly => "phase",
        })
    }
}

/// One accumulation pair in the fragment body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveTerm {
    pub index: usize,
    pub has_time_term: bool,
}

impl WaveTerm {
    pub fn uniform_name(&self) -> String {
        wavevector_uniform_name(self.index)
    }

    fn render_angle(&self) -> String {
        let k = self.uniform_name();
        let mut angle = format!("u.{k}.x * x / u.resolution.x + u.{k}.y * y / u.resolution.y");
        if self.has_time_term {
            angle.push_str(" + u.time * TAU / u.time_rate");
        }
        angle
    }
}

/// Structure of a synthesized program, independent of its text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgramDesc {
    pub terms: Vec<WaveTerm>,
    pub mode: DisplayMode,
    pub time_active: bool,
}

impl ProgramDesc {
    pub fn new(wavevectors: &[Wavevector], mode: DisplayMode, time_active: bool) -> Self {
        let terms = (0..wavevectors.len())
            .map(|index| WaveTerm {
                index,
                has_time_term: time_active,
            })
            .collect();
        Self {
            terms,
            mode,
            time_active,
        }
    }

    pub fn wave_count(&self) -> usize {
        self.terms.len()
    }

    /// Upper bound on the summed amplitude of unit waves.
    pub fn max_intensity(&self) -> f32 {
        (self.terms.len() as f32).max(1.0)
    }

    /// Uniform names in declaration order.
    pub fn uniform_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(3 + self.terms.len());
        names.push(UNIFORM_RESOLUTION.to_string());
        names.push(UNIFORM_TIME.to_string());
        names.push(UNIFORM_TIME_RATE.to_string());
        names.extend(self.terms.iter().map(WaveTerm::uniform_name));
        names
    }

    pub fn render(&self) -> ProgramSource {
        let header = render_header(self);
        let body = render_body(self);
        let tail = render_tail(self.mode).to_string();
        ProgramSource::from_sections(header, body, tail, self.clone())
    }
}

/// Synthesized program text plus the uniform names it declares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSource {
    pub text: String,
    pub uniforms: Vec<String>,
    pub desc: ProgramDesc,
    header: String,
    body: String,
    tail: String,
}

impl ProgramSource {
    fn from_sections(header: String, body: String, tail: String, desc: ProgramDesc) -> Self {
        let mut text = String::with_capacity(header.len() + body.len() + tail.len());
        text.push_str(&header);
        text.push_str(&body);
        text.push_str(&tail);
        Self {
            text,
            uniforms: desc.uniform_names(),
            desc,
            header,
            body,
            tail,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Same program with a different colour mapping. Header and body are
    /// reused as-is; only the tail is rendered again.
    pub fn with_mode(&self, mode: DisplayMode) -> Self {
        let desc = ProgramDesc {
            mode,
            ..self.desc.clone()
        };
        Self::from_sections(
            self.header.clone(),
            self.body.clone(),
            render_tail(mode).to_string(),
            desc,
        )
    }

    pub fn declares(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| u == name)
    }
}

/// Build the program for the given wavevectors, mode and animation flag.
pub fn synthesize(
    wavevectors: &[Wavevector],
    mode: DisplayMode,
    time_active: bool,
) -> ProgramSource {
    ProgramDesc::new(wavevectors, mode, time_active).render()
}

const HSV_AND_VERTEX: &str = r#"
const TAU: f32 = 6.283185307179586;

fn hsv2rgb(c: vec3<f32>) -> vec3<f32> {
    let K = vec4<f32>(1.0, 2.0 / 3.0, 1.0 / 3.0, 3.0);
    let p = abs(fract(c.xxx + K.xyz) * 6.0 - K.www);
    return c.z * mix(K.xxx, clamp(p - K.xxx, vec3<f32>(0.0), vec3<f32>(1.0)), vec3<f32>(c.y));
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    return vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
}
"#;

fn render_header(desc: &ProgramDesc) -> String {
    let mut out = String::new();
    out.push_str("struct Uniforms {\n");
    out.push_str("    resolution: vec2<f32>,\n");
    out.push_str("    time: f32,\n");
    out.push_str("    time_rate: f32,\n");
    for term in &desc.terms {
        let _ = writeln!(out, "    {}: vec2<f32>,", term.uniform_name());
    }
    out.push_str("}\n\n");
    out.push_str("@group(0) @binding(0) var<uniform> u: Uniforms;\n");
    out.push_str(HSV_AND_VERTEX);
    out
}

fn render_body(desc: &ProgramDesc) -> String {
    let mut out = String::new();
    out.push_str("\n@fragment\n");
    out.push_str("fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {\n");
    out.push_str("    let x = frag_coord.x;\n");
    out.push_str("    let y = frag_coord.y;\n\n");
    out.push_str("    var resx: f32 = 0.0;\n");
    out.push_str("    var resy: f32 = 0.0;\n");
    for term in &desc.terms {
        let angle = term.render_angle();
        let _ = writeln!(out, "    resx += cos({angle});");
        let _ = writeln!(out, "    resy += sin({angle});");
    }
    let _ = writeln!(out, "\n    let max_intensity = {:.1};", desc.max_intensity());
    out
}

fn render_tail(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Both => {
            r#"    let intensity = sqrt(resx * resx + resy * resy) / max_intensity;
    let rgb = hsv2rgb(vec3<f32>(atan2(resy, resx) / TAU, 1.0, 1.0));
    return vec4<f32>(rgb * intensity, 1.0);
}
"#
        }
        DisplayMode::IntensityOnly => {
            r#"    let intensity = sqrt(resx * resx + resy * resy) / max_intensity;
    return vec4<f32>(intensity, intensity, intensity, 1.0);
}
"#
        }
        DisplayMode::PhaseOnly => {
            r#"    let rgb = hsv2rgb(vec3<f32>(atan2(resy, resx) / TAU, 1.0, 1.0));
    return vec4<f32>(rgb, 1.0);
}
"#
        }
    }
}

/// Parse and validate WGSL with naga, the front-end wgpu compiles through.
/// Returns the first diagnostic as a printable message.
pub fn validate_wgsl(text: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(text).map_err(|e| e.emit_to_string(text))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| format!("validation error: {e}"))?;
    Ok(())
}
