pub mod animation;
pub mod constants;
pub mod error;
pub mod export;
pub mod field;
pub mod frame;
pub mod input;
pub mod software;
pub mod surface;
pub mod synth;
pub mod uniforms;
pub mod wavevector;

pub use animation::*;
pub use constants::*;
pub use error::{Result, WaveError};
pub use export::*;
pub use frame::FrameContext;
pub use input::*;
pub use software::{SoftwareBackend, SoftwareProgram};
pub use surface::*;
pub use synth::*;
pub use uniforms::*;
pub use wavevector::*;
