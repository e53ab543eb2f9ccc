//! Gradient sky used when no environment is authored.

use glam::Vec4;

use crate::cubemap::{check_chain, Cubemap};
use crate::error::BakeResult;
use crate::geometry::face_direction;
use envlight_shared::CubeFace;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sky blue at the zenith fading to white at the horizon, dark grey ground.
pub fn procedural_sky(size: u32) -> BakeResult<Cubemap> {
    check_chain(size, 1)?;
    let faces = CubeFace::ALL.map(|face| {
        (0..size * size)
            .map(|i| {
                let up = face_direction(face, i % size, i / size, size).y;
                if up > 0.0 {
                    Vec4::new(lerp(0.8, 0.3, up), lerp(0.85, 0.5, up), 0.9, 1.0)
                } else {
                    let ground = lerp(0.5, 0.2, (-up).min(1.0));
                    Vec4::new(ground, ground, ground, 1.0)
                }
            })
            .collect::<Vec<_>>()
    });
    Ok(Cubemap::from_faces(size, faces)?.with_name("Procedural Sky"))
}
