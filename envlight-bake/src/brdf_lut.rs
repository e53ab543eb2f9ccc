//! Split-sum BRDF integration table.
//!
//! `x` indexes N·V and `y` indexes roughness, both sampled at texel centres.
//! Each texel holds the (scale, bias) applied to F0 by the specular term.

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::cubemap::MAX_FACE_SIZE;
use crate::error::{BakeError, BakeResult};
use crate::sampling::{geometry_smith_ibl, hammersley, importance_sample_ggx, reflect_about};

#[derive(Clone, Debug)]
pub struct BrdfLutConfig {
    pub size: u32,
    pub sample_count: u32,
}

impl Default for BrdfLutConfig {
    fn default() -> Self {
        Self {
            size: 512,
            sample_count: 64,
        }
    }
}

/// Row-major `size x size` table of (scale, bias).
#[derive(Clone, Debug, PartialEq)]
pub struct BrdfLut {
    pub size: u32,
    pub texels: Vec<Vec2>,
}

impl BrdfLut {
    pub fn get(&self, x: u32, y: u32) -> Vec2 {
        self.texels[(y * self.size + x) as usize]
    }

    /// Nearest texel for `n_dot_v` and `roughness` in [0, 1].
    pub fn lookup(&self, n_dot_v: f32, roughness: f32) -> Vec2 {
        let max = self.size - 1;
        let x = ((n_dot_v.clamp(0.0, 1.0) * self.size as f32) as u32).min(max);
        let y = ((roughness.clamp(0.0, 1.0) * self.size as f32) as u32).min(max);
        self.get(x, y)
    }
}

/// Integrate the GGX specular lobe for one (N·V, roughness) pair.
pub fn integrate_brdf(n_dot_v: f32, roughness: f32, sample_count: u32) -> Vec2 {
    let v = Vec3::new((1.0 - n_dot_v * n_dot_v).max(0.0).sqrt(), 0.0, n_dot_v);

    let mut a = 0.0f32;
    let mut b = 0.0f32;
    for i in 0..sample_count {
        let h = importance_sample_ggx(hammersley(i, sample_count), roughness);
        let l = reflect_about(v, h);

        let n_dot_l = l.z.max(0.0);
        let n_dot_h = h.z.max(0.0);
        let v_dot_h = v.dot(h).max(0.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith_ibl(n_dot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v).max(0.001);
            let fc = (1.0 - v_dot_h).powi(5);

            a += (1.0 - fc) * g_vis;
            b += fc * g_vis;
        }
    }

    Vec2::new(a, b) / sample_count as f32
}

pub fn generate_brdf_lut(config: &BrdfLutConfig) -> BakeResult<BrdfLut> {
    if config.size == 0 || config.size > MAX_FACE_SIZE || config.sample_count == 0 {
        return Err(BakeError::invalid(format!(
            "BRDF LUT needs a size in 1..={MAX_FACE_SIZE} and a positive sample count, \
             got {}x{} with {} samples",
            config.size, config.size, config.sample_count
        )));
    }
    log::info!(
        "Generating {}x{} BRDF LUT ({} samples/texel)",
        config.size,
        config.size,
        config.sample_count
    );

    let size = config.size;
    let rows: Vec<Vec<Vec2>> = (0..size)
        .into_par_iter()
        .map(|y| {
            let roughness = (y as f32 + 0.5) / size as f32;
            (0..size)
                .map(|x| {
                    let n_dot_v = (x as f32 + 0.5) / size as f32;
                    integrate_brdf(n_dot_v.max(0.001), roughness, config.sample_count)
                })
                .collect()
        })
        .collect();

    Ok(BrdfLut {
        size,
        texels: rows.into_iter().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BrdfLut {
        generate_brdf_lut(&BrdfLutConfig {
            size: 16,
            sample_count: 64,
        })
        .unwrap()
    }

    #[test]
    fn test_values_are_bounded() {
        let lut = small();
        assert_eq!(lut.texels.len(), 256);
        for t in &lut.texels {
            assert!(t.x >= 0.0 && t.y >= 0.0, "{t:?}");
            assert!(t.x + t.y <= 1.05, "{t:?}");
        }
    }

    #[test]
    fn test_smooth_head_on_reflects_almost_everything() {
        let t = integrate_brdf(1.0, 0.05, 64);
        assert!(t.x > 0.9, "{t:?}");
        assert!(t.y < 0.05, "{t:?}");
    }

    #[test]
    fn test_rough_surfaces_lose_energy() {
        let lut = small();
        let smooth = lut.lookup(0.8, 0.05);
        let rough = lut.lookup(0.8, 0.95);
        assert!(rough.x + rough.y < smooth.x + smooth.y);
    }

    #[test]
    fn test_lookup_clamps_to_table() {
        let lut = small();
        assert_eq!(lut.lookup(-1.0, 2.0), lut.get(0, 15));
        assert_eq!(lut.lookup(1.0, 0.0), lut.get(15, 0));
    }

    #[test]
    fn test_rejects_empty_config() {
        assert!(generate_brdf_lut(&BrdfLutConfig { size: 0, sample_count: 64 }).is_err());
        assert!(generate_brdf_lut(&BrdfLutConfig { size: 8, sample_count: 0 }).is_err());
        let huge = BrdfLutConfig {
            size: u32::MAX,
            sample_count: 1,
        };
        assert!(matches!(generate_brdf_lut(&huge), Err(BakeError::InvalidInput(_))));
    }
}
