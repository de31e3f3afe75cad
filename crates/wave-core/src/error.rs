use crate::wavevector::WavevectorHandle;

/// Errors surfaced by the core. None of them is fatal to the render loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaveError {
    /// The synthesized program failed to parse, validate or build a pipeline.
    /// The previously compiled program stays bound.
    #[error("program failed to compile: {message}")]
    CompileFailure { message: String },

    #[error("unknown wavevector handle {0:?}")]
    UnknownHandle(WavevectorHandle),

    #[error("an export is already in progress")]
    ExportInProgress,

    #[error("invalid export target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },

    #[error("off-screen render failed: {message}")]
    ExportFailure { message: String },

    #[error("time rate must be positive and finite, got {0}")]
    InvalidTimeRate(f32),
}

pub type Result<T, E = WaveError> = std::result::Result<T, E>;
