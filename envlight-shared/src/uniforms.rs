use bytemuck::{Pod, Zeroable};

use crate::face::FACE_BASIS;

/// Irradiance SH packed for evaluation with dot products.
/// Field order is the constant order the lighting shader declares:
/// cAr, cAg, cAb, cBr, cBg, cBb, cC (7 x vec4 = 112 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderReadySh {
    /// Linear + constant terms, red: (x, y, z, 1) weights.
    pub ar: [f32; 4],
    pub ag: [f32; 4],
    pub ab: [f32; 4],
    /// Quadratic terms, red: (xy, yz, zz, zx) weights.
    pub br: [f32; 4],
    pub bg: [f32; 4],
    pub bb: [f32; 4],
    /// x^2 - y^2 weight per channel; w is always 1.
    pub c: [f32; 4],
}

impl ShaderReadySh {
    pub const FLOAT_COUNT: usize = 28;

    /// Vectors in shader constant order.
    pub fn as_vectors(&self) -> [[f32; 4]; 7] {
        [self.ar, self.ag, self.ab, self.br, self.bg, self.bb, self.c]
    }
}

/// Per-mip parameters of the GGX prefilter kernel.
/// One value per mip level; `width` is the face resolution of that level.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PrefilterParams {
    pub roughness: f32,
    pub width: u32,
    pub sample_count: u32,
    pub _pad: u32,
}

impl PrefilterParams {
    pub fn new(roughness: f32, width: u32, sample_count: u32) -> Self {
        Self {
            roughness,
            width,
            sample_count,
            _pad: 0,
        }
    }
}

/// Face basis table laid out for a storage buffer: per face, u axis, v axis
/// and normal, each padded to a vec4.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FaceBasisUniform {
    pub axes: [[f32; 4]; 18],
}

impl FaceBasisUniform {
    pub fn new() -> Self {
        let mut axes = [[0.0f32; 4]; 18];
        for (face, basis) in FACE_BASIS.iter().enumerate() {
            for (slot, axis) in [basis.u_axis, basis.v_axis, basis.normal].iter().enumerate() {
                axes[face * 3 + slot] = [axis[0], axis[1], axis[2], 0.0];
            }
        }
        Self { axes }
    }
}

impl Default for FaceBasisUniform {
    fn default() -> Self {
        Self::new()
    }
}
