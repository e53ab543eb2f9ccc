//! Texel geometry: directions, solid angles and direction lookups.
//!
//! Two texel-to-direction mappings live here. The SH projection uses the
//! stretched mapping of [`texel_direction`], which pushes edge texel centres
//! onto the cube edges to even out the solid angle across a face. The
//! prefilter uses the plain linear mapping of [`face_direction`], which is
//! exactly what a GPU cube sampler inverts.

use glam::{DVec3, Vec3, Vec4};

use crate::cubemap::CubemapRead;
use envlight_shared::face::FaceBasis;
use envlight_shared::CubeFace;

fn axis(a: [f32; 3]) -> DVec3 {
    DVec3::new(a[0] as f64, a[1] as f64, a[2] as f64)
}

fn axis_f32(a: [f32; 3]) -> Vec3 {
    Vec3::from_array(a)
}

/// Cubic stretch coefficient `size^2 / (size - 1)^3`. A one-texel face has
/// nothing to stretch.
fn stretch_factor(size: u32) -> f64 {
    if size < 2 {
        return 0.0;
    }
    let s = size as f64;
    (s * s) / ((s - 1.0) * (s - 1.0) * (s - 1.0))
}

/// Unit direction through texel coordinate (`u`, `v`) of a `size` wide face,
/// using the stretched mapping. Fractional coordinates address texel corners
/// (`x - 0.5`, `x + 0.5`).
pub fn texel_direction(face: CubeFace, u: f64, v: f64, size: u32) -> DVec3 {
    let s = size as f64;
    let a = stretch_factor(size);
    let warp = |t: f64| a * t * t * t + t;

    let nu = warp(2.0 * (u + 0.5) / s - 1.0);
    let nv = warp(2.0 * (v + 0.5) / s - 1.0);

    let basis = face.basis();
    (axis(basis.u_axis) * nu + axis(basis.v_axis) * nv + axis(basis.normal)).normalize()
}

/// Solid-angle weight of texel (`x`, `y`): the area of the two triangles
/// spanned by the directions of its four corners.
pub fn texel_solid_angle(face: CubeFace, x: u32, y: u32, size: u32) -> f64 {
    let (x, y) = (x as f64, y as f64);
    let c0 = texel_direction(face, x - 0.5, y - 0.5, size);
    let c1 = texel_direction(face, x - 0.5, y + 0.5, size);
    let c2 = texel_direction(face, x + 0.5, y - 0.5, size);
    let c3 = texel_direction(face, x + 0.5, y + 0.5, size);

    let first = 0.5 * (c1 - c0).cross(c2 - c0).length();
    let second = 0.5 * (c2 - c1).cross(c3 - c1).length();
    first + second
}

/// Unit direction through the centre of texel (`x`, `y`), linear mapping.
pub fn face_direction(face: CubeFace, x: u32, y: u32, size: u32) -> Vec3 {
    let s = size as f32;
    let u = (x as f32 + 0.5) / s * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / s * 2.0 - 1.0;
    face_point(face.basis(), u, v).normalize()
}

fn face_point(basis: &FaceBasis, u: f32, v: f32) -> Vec3 {
    axis_f32(basis.u_axis) * u + axis_f32(basis.v_axis) * v + axis_f32(basis.normal)
}

/// Face hit by `dir` and the face coordinates of the hit, both in [-1, 1].
/// Inverse of the linear mapping.
pub fn direction_to_face(dir: Vec3) -> (CubeFace, f32, f32) {
    let mut best = CubeFace::PositiveX;
    let mut best_dot = f32::NEG_INFINITY;
    for face in CubeFace::ALL {
        let d = axis_f32(face.basis().normal).dot(dir);
        if d > best_dot {
            best_dot = d;
            best = face;
        }
    }

    let basis = best.basis();
    let ma = best_dot.max(f32::MIN_POSITIVE);
    let u = (axis_f32(basis.u_axis).dot(dir) / ma).clamp(-1.0, 1.0);
    let v = (axis_f32(basis.v_axis).dot(dir) / ma).clamp(-1.0, 1.0);
    (best, u, v)
}

/// Bilinear lookup of `mip` along `dir`. Filtering is clamped to the edges
/// of the face that was hit; it never blends across a seam.
pub fn sample_bilinear<C: CubemapRead + ?Sized>(cubemap: &C, dir: Vec3, mip: u32) -> Vec4 {
    let size = (cubemap.width() >> mip).max(1);
    let (face, u, v) = direction_to_face(dir);

    let max = (size - 1) as f32;
    let fx = ((u + 1.0) * 0.5 * size as f32 - 0.5).clamp(0.0, max);
    let fy = ((v + 1.0) * 0.5 * size as f32 - 0.5).clamp(0.0, max);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(size - 1);
    let y1 = (y0 + 1).min(size - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let top = cubemap
        .texel(face, x0, y0, mip)
        .lerp(cubemap.texel(face, x1, y0, mip), tx);
    let bottom = cubemap
        .texel(face, x0, y1, mip)
        .lerp(cubemap.texel(face, x1, y1, mip), tx);
    top.lerp(bottom, ty)
}
