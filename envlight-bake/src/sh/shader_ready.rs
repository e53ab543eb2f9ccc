//! Packing of irradiance SH into the quadratic form the lighting shader
//! evaluates:
//!
//! ```text
//! irradiance.r = dot(cAr, (n, 1)) + dot(cBr, n.xyzz * n.yzzx) + cC.r * (n.x^2 - n.y^2)
//! ```

use glam::{Vec3, Vec4};

use super::{ShCoefficients, BAND_CONVOLUTION};
use envlight_shared::ShaderReadySh;

// Ramamoorthi & Hanrahan irradiance constants.
pub const C1: f32 = 0.429043;
pub const C2: f32 = 0.511664;
pub const C3: f32 = 0.743125;
pub const C4: f32 = 0.886227;
pub const C5: f32 = 0.247708;

/// The constants above fold in the clamped-cosine lobe; the coefficients
/// from `project_to_sh` already carry it, so it is divided back out.
fn lobe(band: usize) -> f32 {
    (std::f64::consts::PI * BAND_CONVOLUTION[band]) as f32
}

/// Pack projected irradiance SH into `cAr..cC`.
pub fn to_shader_ready(sh: &ShCoefficients) -> ShaderReadySh {
    let e = &sh.coefficients;

    let k0 = C4 / lobe(0);
    let k1 = 2.0 * C2 / lobe(1);
    let k2 = 2.0 * C1 / lobe(2);
    let k6 = C5 / lobe(2);
    let k6_zz = C3 / lobe(2);
    let k8 = C1 / lobe(2);

    let linear = |ch: usize| -> [f32; 4] {
        [
            -k1 * e[3][ch],
            -k1 * e[1][ch],
            k1 * e[2][ch],
            k0 * e[0][ch] - k6 * e[6][ch],
        ]
    };
    let quadratic = |ch: usize| -> [f32; 4] {
        [
            k2 * e[4][ch],
            -k2 * e[5][ch],
            k6_zz * e[6][ch],
            -k2 * e[7][ch],
        ]
    };

    ShaderReadySh {
        ar: linear(0),
        ag: linear(1),
        ab: linear(2),
        br: quadratic(0),
        bg: quadratic(1),
        bb: quadratic(2),
        c: [k8 * e[8].x, k8 * e[8].y, k8 * e[8].z, 1.0],
    }
}

/// CPU version of the shader-side evaluation.
pub fn evaluate_irradiance(packed: &ShaderReadySh, normal: Vec3) -> Vec3 {
    let n = normal.normalize();
    let linear = n.extend(1.0);
    let quadratic = Vec4::new(n.x * n.y, n.y * n.z, n.z * n.z, n.z * n.x);
    let x2_y2 = n.x * n.x - n.y * n.y;

    let channel = |a: [f32; 4], b: [f32; 4], c: f32| {
        Vec4::from_array(a).dot(linear) + Vec4::from_array(b).dot(quadratic) + c * x2_y2
    };

    Vec3::new(
        channel(packed.ar, packed.br, packed.c[0]),
        channel(packed.ag, packed.bg, packed.c[1]),
        channel(packed.ab, packed.bb, packed.c[2]),
    )
}
