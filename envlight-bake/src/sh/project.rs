use glam::{DVec3, Vec3};
use rayon::prelude::*;

use super::{eval_basis, ShCoefficients, BAND_CONVOLUTION, COEFFICIENT_BAND, SH_COEFFICIENT_COUNT};
use crate::cubemap::CubemapRead;
use crate::error::{BakeError, BakeResult};
use crate::geometry::{texel_direction, texel_solid_angle};
use envlight_shared::CubeFace;

/// Below this the cubemap covers no measurable part of the sphere.
const MIN_TOTAL_SOLID_ANGLE: f64 = 1e-12;

/// Running sums of radiance x basis x solid angle.
#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    sums: [DVec3; SH_COEFFICIENT_COUNT],
    weight: f64,
}

impl Accumulator {
    fn add(&mut self, color: DVec3, basis: &[f64; SH_COEFFICIENT_COUNT], weight: f64) {
        for (sum, y) in self.sums.iter_mut().zip(basis.iter()) {
            *sum += color * (*y * weight);
        }
        self.weight += weight;
    }

    fn merge(mut self, other: &Accumulator) -> Accumulator {
        for (sum, o) in self.sums.iter_mut().zip(other.sums.iter()) {
            *sum += *o;
        }
        self.weight += other.weight;
        self
    }
}

/// Project a cubemap's mip 0 onto 9 SH coefficients per channel.
///
/// The result is the projection of the diffuse irradiance the environment
/// produces, so `Σ E_i Y_i(n)` is the irradiance arriving at a surface
/// facing `n`. Uniform radiance `C` projects to a band-0 coefficient of
/// `2π^(3/2)·C` and evaluates to `π·C` for every normal.
pub fn project_to_sh<C: CubemapRead + ?Sized>(cubemap: &C) -> BakeResult<ShCoefficients> {
    validate(cubemap)?;
    log::debug!(
        "Projecting {}x{} cubemap '{}' to SH",
        cubemap.width(),
        cubemap.height(),
        cubemap.name()
    );
    let acc = accumulate(cubemap, &CubeFace::ALL);
    finish(&acc)
}

fn validate<C: CubemapRead + ?Sized>(cubemap: &C) -> BakeResult<()> {
    if cubemap.face_count() != 6 {
        return Err(BakeError::invalid(format!(
            "cubemap has {} faces, expected 6",
            cubemap.face_count()
        )));
    }
    if cubemap.mip_count() == 0 {
        return Err(BakeError::invalid("cubemap has no mip levels"));
    }
    if cubemap.width() != cubemap.height() {
        return Err(BakeError::MalformedGeometry {
            width: cubemap.width(),
            height: cubemap.height(),
        });
    }
    Ok(())
}

/// Sum over every texel of `faces`. Rows are reduced in parallel and the
/// partial sums combined in row order, so the result does not depend on
/// how rayon schedules the rows.
fn accumulate<C: CubemapRead + ?Sized>(cubemap: &C, faces: &[CubeFace]) -> Accumulator {
    let size = cubemap.width();
    let rows: Vec<(CubeFace, u32)> = faces
        .iter()
        .flat_map(|&face| (0..size).map(move |y| (face, y)))
        .collect();

    let partials: Vec<Accumulator> = rows
        .par_iter()
        .map(|&(face, y)| {
            let mut acc = Accumulator::default();
            for x in 0..size {
                let dir = texel_direction(face, x as f64, y as f64, size);
                let weight = texel_solid_angle(face, x, y, size);
                let color = cubemap.texel(face, x, y, 0).truncate().as_dvec3();
                acc.add(color, &eval_basis(dir), weight);
            }
            acc
        })
        .collect();

    partials
        .iter()
        .fold(Accumulator::default(), |total, partial| total.merge(partial))
}

fn finish(acc: &Accumulator) -> BakeResult<ShCoefficients> {
    if acc.weight <= MIN_TOTAL_SOLID_ANGLE {
        return Err(BakeError::degenerate(format!(
            "accumulated solid angle {} is too small to normalize",
            acc.weight
        )));
    }

    use std::f64::consts::PI;
    let normalization = 4.0 * PI / acc.weight;

    let mut coefficients = [Vec3::ZERO; SH_COEFFICIENT_COUNT];
    for (i, c) in coefficients.iter_mut().enumerate() {
        let scale = normalization * BAND_CONVOLUTION[COEFFICIENT_BAND[i]] * PI;
        *c = (acc.sums[i] * scale).as_vec3();
    }
    Ok(ShCoefficients::new(coefficients))
}
