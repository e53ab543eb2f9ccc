//! Types shared between the envlight bakes, the native FFI library and any
//! GPU-side consumer of the baked data.

pub mod face;
pub mod uniforms;

pub use face::{CubeFace, FACE_BASIS};
pub use uniforms::{FaceBasisUniform, PrefilterParams, ShaderReadySh};
