use std::f32::consts::PI;

// Shared tuning constants used by the core and the native frontend.

// Wavevector mapping
pub const K_SCALE: f32 = 30.0 * PI; // angular frequency at one canvas length from center

// Interaction
pub const MARKER_RADIUS_PX: f32 = 14.0; // hit-test and ring radius around a marker center

// Animation
pub const DEFAULT_TIME_RATE: f32 = 2.0; // seconds per full phase turn
pub const TIME_RATE_STEP: f32 = 1.25; // multiplicative step for rate up/down controls
pub const MIN_TIME_RATE: f32 = 0.05;
pub const MAX_TIME_RATE: f32 = 120.0;

// Export
pub const EXPORT_TIME: f32 = 0.0;
pub const EXPORT_TIME_RATE: f32 = 1.0;
pub const EXPORT_FILE_PREFIX: &str = "wavefield_";
pub const EXPORT_MAX_SEQUENCE: u32 = 9999;
pub const EXPORT_MAX_DIMENSION: u32 = 8192; // wgpu default max_texture_dimension_2d

/// Tuning passed to the wavevector store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldParams {
    pub k_scale: f32,
    pub marker_radius_px: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            k_scale: K_SCALE,
            marker_radius_px: MARKER_RADIUS_PX,
        }
    }
}
