//! GGX-prefiltered specular environment chain.
//!
//! Mip level `i` of a `w` wide cubemap is filtered with roughness
//! `i / log2(w)`, so a shader picks the level as `roughness / roughness_step`.

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::cubemap::{
    check_chain, Cubemap, CubemapRead, CubemapWrite, FilterMode, SamplerSettings, WrapMode,
};
use crate::error::{BakeError, BakeResult};
use crate::geometry::{face_direction, sample_bilinear};
use crate::sampling::{hammersley, importance_sample_ggx, reflect_about, tangent_to_world};
use envlight_shared::{CubeFace, PrefilterParams};

/// Suffix appended to the source name on the filtered result.
pub const PREFILTERED_NAME_SUFFIX: &str = "(PreFilter)";

#[derive(Clone, Debug)]
pub struct PrefilterConfig {
    /// GGX samples per output texel; trades quality for bake time.
    pub sample_count: u32,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self { sample_count: 1024 }
    }
}

/// Levels in a full chain down to 1x1: `log2(width) + 1`.
pub fn mip_count(width: u32) -> u32 {
    if width == 0 {
        0
    } else {
        width.ilog2() + 1
    }
}

/// Roughness filtered into `level` of a chain with `mip_count` levels.
pub fn roughness_for_level(level: u32, mip_count: u32) -> f32 {
    if mip_count <= 1 {
        0.0
    } else {
        level as f32 / (mip_count - 1) as f32
    }
}

/// Roughness difference between neighbouring levels: `1 / log2(width)`.
/// A single-texel map has only one level, reported as a step of 1.
pub fn roughness_step(width: u32) -> f32 {
    if width <= 1 {
        1.0
    } else {
        1.0 / width.ilog2() as f32
    }
}

/// Kernel parameters for every level of a `width` wide chain.
pub fn level_params(width: u32, sample_count: u32) -> Vec<PrefilterParams> {
    let levels = mip_count(width);
    (0..levels)
        .map(|level| {
            PrefilterParams::new(
                roughness_for_level(level, levels),
                width >> level,
                sample_count,
            )
        })
        .collect()
}

fn validate_source<C: CubemapRead + ?Sized>(source: &C) -> BakeResult<u32> {
    if source.face_count() != 6 {
        return Err(BakeError::invalid(format!(
            "cubemap has {} faces, expected 6",
            source.face_count()
        )));
    }
    if source.mip_count() == 0 {
        return Err(BakeError::invalid("cubemap has no mip levels"));
    }
    let (width, height) = (source.width(), source.height());
    if width != height || !width.is_power_of_two() {
        return Err(BakeError::MalformedGeometry { width, height });
    }
    check_chain(width, mip_count(width))?;
    Ok(width)
}

/// Filter `source` into a new cubemap holding the full roughness chain.
pub fn prefilter<C: CubemapRead + ?Sized>(
    source: &C,
    config: &PrefilterConfig,
) -> BakeResult<Cubemap> {
    let width = validate_source(source)?;
    let mut dest = Cubemap::new(width, mip_count(width))?;
    prefilter_into(source, &mut dest, config)?;
    Ok(dest)
}

/// Filter `source` into the mip chain of `dest`, which must have the same
/// base width and at least `log2(width) + 1` levels. `source` is only read.
pub fn prefilter_into<S, D>(source: &S, dest: &mut D, config: &PrefilterConfig) -> BakeResult<()>
where
    S: CubemapRead + ?Sized,
    D: CubemapWrite + ?Sized,
{
    let width = validate_source(source)?;
    if config.sample_count == 0 {
        return Err(BakeError::invalid("prefilter sample count must be positive"));
    }
    let levels = mip_count(width);
    if dest.width() != width || dest.height() != width || dest.mip_count() < levels {
        return Err(BakeError::invalid(format!(
            "destination is {}x{} with {} levels, needs {width}x{width} with {levels}",
            dest.width(),
            dest.height(),
            dest.mip_count()
        )));
    }

    log::info!(
        "Prefiltering '{}' ({width}x{width}, {levels} levels, {} samples/texel)",
        source.name(),
        config.sample_count
    );

    for (level, params) in level_params(width, config.sample_count).iter().enumerate() {
        log::debug!(
            "  level {level}: {}x{} roughness {:.3}",
            params.width,
            params.width,
            params.roughness
        );
        for face in CubeFace::ALL {
            let texels = filter_face(source, face, params);
            dest.set_face(level as u32, face, &texels)?;
        }
    }

    let name = format!("{}{PREFILTERED_NAME_SUFFIX}", source.name());
    dest.set_auto_mipmaps(false);
    dest.set_sampler(SamplerSettings {
        filter: FilterMode::Trilinear,
        wrap: WrapMode::Clamp,
    });
    dest.set_name(&name);
    dest.apply();
    Ok(())
}

/// Filter a cubemap into its own mip chain, growing the chain if needed.
/// Every level is filtered from the original base level.
pub fn prefilter_in_place(cubemap: &mut Cubemap, config: &PrefilterConfig) -> BakeResult<()> {
    let width = validate_source(&*cubemap)?;
    let source = cubemap.base_level();
    cubemap.ensure_mip_count(mip_count(width))?;
    prefilter_into(&source, cubemap, config)
}

/// One face of one level; texels are independent and computed in parallel.
fn filter_face<C: CubemapRead + ?Sized>(
    source: &C,
    face: CubeFace,
    params: &PrefilterParams,
) -> Vec<Vec4> {
    let size = params.width;
    (0..size * size)
        .into_par_iter()
        .map(|idx| {
            let n = face_direction(face, idx % size, idx / size, size);
            filter_texel(source, n, params).extend(1.0)
        })
        .collect()
}

/// GGX-weighted average of the environment around `n`, with N = V = R.
fn filter_texel<C: CubemapRead + ?Sized>(source: &C, n: Vec3, params: &PrefilterParams) -> Vec3 {
    if params.roughness <= 0.0 {
        return sample_bilinear(source, n, 0).truncate();
    }

    let mut sum = Vec3::ZERO;
    let mut total_weight = 0.0f32;
    for i in 0..params.sample_count {
        let h = tangent_to_world(
            importance_sample_ggx(hammersley(i, params.sample_count), params.roughness),
            n,
        );
        let l = reflect_about(n, h);
        let n_dot_l = n.dot(l);
        if n_dot_l > 0.0 {
            sum += sample_bilinear(source, l, 0).truncate() * n_dot_l;
            total_weight += n_dot_l;
        }
    }

    if total_weight > 0.0 {
        sum / total_weight
    } else {
        sample_bilinear(source, n, 0).truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedural::procedural_sky;
    use approx::assert_abs_diff_eq;

    fn quick() -> PrefilterConfig {
        let _ = env_logger::builder().is_test(true).try_init();
        PrefilterConfig { sample_count: 32 }
    }

    struct NonSquare;

    impl CubemapRead for NonSquare {
        fn width(&self) -> u32 {
            16
        }
        fn height(&self) -> u32 {
            8
        }
        fn texel(&self, _face: CubeFace, _x: u32, _y: u32, _mip: u32) -> Vec4 {
            Vec4::ONE
        }
    }

    #[test]
    fn test_mip_count_and_roughness_schedule() {
        assert_eq!(mip_count(0), 0);
        assert_eq!(mip_count(1), 1);
        assert_eq!(mip_count(128), 8);
        assert_eq!(roughness_for_level(0, 8), 0.0);
        assert_eq!(roughness_for_level(7, 8), 1.0);
        assert_abs_diff_eq!(roughness_for_level(3, 8), 3.0 / 7.0);
        assert_eq!(roughness_for_level(0, 1), 0.0);
        assert_abs_diff_eq!(roughness_step(128), 1.0 / 7.0);
        assert_eq!(roughness_step(1), 1.0);
    }

    #[test]
    fn test_level_params_halve_width() {
        let params = level_params(32, 64);
        assert_eq!(params.len(), 6);
        for (i, p) in params.iter().enumerate() {
            assert_eq!(p.width, 32 >> i);
            assert_eq!(p.sample_count, 64);
        }
        assert_eq!(params.last().unwrap().roughness, 1.0);
    }

    #[test]
    fn test_chain_depth_for_128() {
        let source = Cubemap::filled(128, 1, Vec4::ONE).unwrap();
        let result = prefilter(&source, &PrefilterConfig { sample_count: 4 }).unwrap();
        assert_eq!(result.mip_count(), 8);
        for level in 0..8 {
            assert_eq!(result.face_size(level), Some(128 >> level));
        }
        assert_eq!(result.face_size(7), Some(1));
    }

    #[test]
    fn test_uniform_input_stays_uniform_on_every_level() {
        let color = Vec4::new(0.2, 0.4, 0.8, 1.0);
        let source = Cubemap::filled(16, 1, color).unwrap();
        let result = prefilter(&source, &quick()).unwrap();
        for level in 0..result.mip_count() {
            for face in CubeFace::ALL {
                for texel in result.face(level, face).unwrap() {
                    assert_abs_diff_eq!(texel.x, color.x, epsilon = 1e-4);
                    assert_abs_diff_eq!(texel.y, color.y, epsilon = 1e-4);
                    assert_abs_diff_eq!(texel.z, color.z, epsilon = 1e-4);
                    assert_eq!(texel.w, 1.0);
                }
            }
        }
    }

    #[test]
    fn test_level_zero_reproduces_source() {
        let source = procedural_sky(16).unwrap();
        let result = prefilter(&source, &quick()).unwrap();
        for face in CubeFace::ALL {
            let src = source.face(0, face).unwrap();
            let dst = result.face(0, face).unwrap();
            for (a, b) in src.iter().zip(dst.iter()) {
                assert!((a.truncate() - b.truncate()).abs().max_element() < 1e-3);
            }
        }
    }

    #[test]
    fn test_roughest_level_is_smooth() {
        // The 1x1 level averages a wide lobe: +Y and -Y faces land between
        // the sky and ground extremes.
        let source = procedural_sky(16).unwrap();
        let result = prefilter(&source, &quick()).unwrap();
        let last = result.mip_count() - 1;
        let up = result.texel(CubeFace::PositiveY, 0, 0, last);
        let down = result.texel(CubeFace::NegativeY, 0, 0, last);
        assert!(up.z > down.z);
        let sky_top = source.texel(CubeFace::PositiveY, 8, 8, 0);
        let ground_bottom = source.texel(CubeFace::NegativeY, 8, 8, 0);
        assert!(down.z > ground_bottom.z);
        assert!(up.z <= sky_top.z + 1e-4);
    }

    #[test]
    fn test_result_metadata() {
        let source = Cubemap::filled(8, 1, Vec4::ONE).unwrap().with_name("Lobby");
        let result = prefilter(&source, &quick()).unwrap();
        assert_eq!(result.name(), "Lobby(PreFilter)");
        assert!(!result.auto_mipmaps());
        assert_eq!(
            result.sampler(),
            SamplerSettings {
                filter: FilterMode::Trilinear,
                wrap: WrapMode::Clamp
            }
        );
        assert_eq!(result.apply_count(), 1);
    }

    #[test]
    fn test_source_untouched() {
        let source = procedural_sky(8).unwrap();
        let before = source.clone();
        prefilter(&source, &quick()).unwrap();
        assert_eq!(source, before);
    }

    #[test]
    fn test_in_place_filters_own_chain() {
        let mut cubemap = procedural_sky(8).unwrap();
        let original = cubemap.clone();
        prefilter_in_place(&mut cubemap, &quick()).unwrap();
        assert_eq!(cubemap.mip_count(), 4);
        assert_eq!(cubemap.name(), "Procedural Sky(PreFilter)");

        let expected = prefilter(&original, &quick()).unwrap();
        for level in 0..4 {
            for face in CubeFace::ALL {
                assert_eq!(cubemap.face(level, face), expected.face(level, face));
            }
        }
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let npot = Cubemap::filled(12, 1, Vec4::ONE).unwrap();
        assert_eq!(
            prefilter(&npot, &quick()).unwrap_err(),
            BakeError::MalformedGeometry { width: 12, height: 12 }
        );
        assert_eq!(
            prefilter(&NonSquare, &quick()).unwrap_err(),
            BakeError::MalformedGeometry { width: 16, height: 8 }
        );
        let empty = Cubemap::new(0, 1).unwrap();
        assert!(matches!(
            prefilter(&empty, &quick()),
            Err(BakeError::MalformedGeometry { .. })
        ));
    }

    #[test]
    fn test_rejects_small_destination_and_zero_samples() {
        let source = Cubemap::filled(8, 1, Vec4::ONE).unwrap();
        let mut short = Cubemap::new(8, 2).unwrap();
        assert!(matches!(
            prefilter_into(&source, &mut short, &quick()),
            Err(BakeError::InvalidInput(_))
        ));
        let mut full = Cubemap::new(8, 4).unwrap();
        assert!(matches!(
            prefilter_into(&source, &mut full, &PrefilterConfig { sample_count: 0 }),
            Err(BakeError::InvalidInput(_))
        ));
    }
}
