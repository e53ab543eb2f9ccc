//! envlight bakes: environment cubemap to irradiance SH, GGX-prefiltered
//! specular mip chains and the split-sum BRDF look-up table.
//!
//! Everything here is a pure function of its inputs. Host engines hand in
//! cubemaps through [`CubemapRead`], receive results through [`CubemapWrite`]
//! or owned values, and decide themselves how to upload them.

pub mod brdf_lut;
pub mod cubemap;
pub mod error;
pub mod geometry;
pub mod prefilter;
pub mod procedural;
pub mod sampling;
pub mod sh;

pub use brdf_lut::{generate_brdf_lut, BrdfLut, BrdfLutConfig};
pub use cubemap::{Cubemap, CubemapRead, CubemapWrite, FilterMode, SamplerSettings, WrapMode};
pub use error::{BakeError, BakeResult};
pub use prefilter::{prefilter, prefilter_in_place, prefilter_into, PrefilterConfig};
pub use procedural::procedural_sky;
pub use sh::{
    blend_into_probe_coefficients, evaluate_irradiance, project_to_sh, to_shader_ready,
    ShCoefficients,
};

pub use envlight_shared::{CubeFace, ShaderReadySh};
