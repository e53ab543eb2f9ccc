//! Third-order (9 coefficient) real spherical harmonics for diffuse lighting.

mod probes;
mod project;
mod shader_ready;

pub use probes::{blend_into_probe_coefficients, probe_count};
pub use project::project_to_sh;
pub use shader_ready::{evaluate_irradiance, to_shader_ready, C1, C2, C3, C4, C5};

use glam::{DVec3, Vec3};

use crate::error::{BakeError, BakeResult};

pub const SH_COEFFICIENT_COUNT: usize = 9;

/// Floats per probe: 9 coefficients x RGB.
pub const PROBE_FLOAT_COUNT: usize = SH_COEFFICIENT_COUNT * 3;

/// Band index of each coefficient.
pub const COEFFICIENT_BAND: [usize; SH_COEFFICIENT_COUNT] = [0, 1, 1, 1, 2, 2, 2, 2, 2];

/// Clamped-cosine convolution weight per band, relative to pi.
pub const BAND_CONVOLUTION: [f64; 3] = [1.0, 2.0 / 3.0, 1.0 / 4.0];

/// RGB coefficients in band order: band 0, band 1 (y, z, x), band 2
/// (xy, yz, 3z^2-1, xz, x^2-y^2).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShCoefficients {
    pub coefficients: [Vec3; SH_COEFFICIENT_COUNT],
}

impl ShCoefficients {
    pub fn new(coefficients: [Vec3; SH_COEFFICIENT_COUNT]) -> Self {
        Self { coefficients }
    }

    /// Light-probe layout: `[i * 3 + channel]`.
    pub fn to_array(&self) -> [f32; PROBE_FLOAT_COUNT] {
        let mut out = [0.0; PROBE_FLOAT_COUNT];
        for (i, c) in self.coefficients.iter().enumerate() {
            out[i * 3] = c.x;
            out[i * 3 + 1] = c.y;
            out[i * 3 + 2] = c.z;
        }
        out
    }

    pub fn from_slice(values: &[f32]) -> BakeResult<Self> {
        if values.len() != PROBE_FLOAT_COUNT {
            return Err(BakeError::invalid(format!(
                "expected {PROBE_FLOAT_COUNT} SH floats, got {}",
                values.len()
            )));
        }
        let mut coefficients = [Vec3::ZERO; SH_COEFFICIENT_COUNT];
        for (i, c) in coefficients.iter_mut().enumerate() {
            *c = Vec3::new(values[i * 3], values[i * 3 + 1], values[i * 3 + 2]);
        }
        Ok(Self { coefficients })
    }

    pub fn scaled(&self, k: f32) -> Self {
        Self {
            coefficients: self.coefficients.map(|c| c * k),
        }
    }

    /// Sum of coefficient times basis function at `normal`.
    pub fn evaluate(&self, normal: Vec3) -> Vec3 {
        let basis = eval_basis(normal.normalize().as_dvec3());
        let mut sum = DVec3::ZERO;
        for (c, y) in self.coefficients.iter().zip(basis.iter()) {
            sum += c.as_dvec3() * *y;
        }
        sum.as_vec3()
    }
}

/// The 9 real SH basis functions at unit direction `dir`.
pub fn eval_basis(dir: DVec3) -> [f64; SH_COEFFICIENT_COUNT] {
    use std::f64::consts::PI;

    let (x, y, z) = (dir.x, dir.y, dir.z);
    let k0 = 1.0 / (2.0 * PI.sqrt());
    let k1 = (3.0 / PI).sqrt() / 2.0;
    let k2 = (15.0 / PI).sqrt() / 2.0;
    let k3 = (5.0 / PI).sqrt() / 4.0;
    let k4 = (15.0 / PI).sqrt() / 4.0;

    [
        k0,
        -k1 * y,
        k1 * z,
        -k1 * x,
        k2 * x * y,
        -k2 * y * z,
        k3 * (3.0 * z * z - 1.0),
        -k2 * x * z,
        k4 * (x * x - y * y),
    ]
}
