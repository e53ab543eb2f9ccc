//! Cubemap access for the bakes.
//!
//! Host engines own their textures; they expose them through [`CubemapRead`]
//! and receive baked levels through [`CubemapWrite`]. [`Cubemap`] is the
//! in-memory implementation used when the caller has no texture of its own.

use glam::Vec4;

use crate::error::{BakeError, BakeResult};
use envlight_shared::CubeFace;

/// Texture filtering applied when the result is sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    /// Bilinear within a level and linear between mip levels.
    Trilinear,
}

/// Texture addressing outside [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplerSettings {
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

/// Read access to a cubemap's texels.
///
/// Texels are addressed by face, column `x`, row `y` and mip level. Callers
/// only ask for coordinates inside the level's resolution
/// (`width() >> mip`).
pub trait CubemapRead: Sync {
    fn name(&self) -> &str {
        ""
    }

    /// Number of faces actually backed by data. Anything other than 6 is
    /// rejected by the bakes.
    fn face_count(&self) -> usize {
        6
    }

    /// Face width of mip 0.
    fn width(&self) -> u32;

    /// Face height of mip 0.
    fn height(&self) -> u32;

    fn mip_count(&self) -> u32 {
        1
    }

    /// Linear RGBA value of one texel.
    fn texel(&self, face: CubeFace, x: u32, y: u32, mip: u32) -> Vec4;
}

/// Write access used to store baked mip levels.
pub trait CubemapWrite: CubemapRead {
    /// Replace a whole face of one mip level. `texels` is row-major and
    /// holds exactly `(width() >> mip)^2` values.
    fn set_face(&mut self, mip: u32, face: CubeFace, texels: &[Vec4]) -> BakeResult<()>;

    fn set_sampler(&mut self, sampler: SamplerSettings);

    /// Whether the host should regenerate lower mips from level 0 on upload.
    fn set_auto_mipmaps(&mut self, enabled: bool);

    fn set_name(&mut self, name: &str);

    /// Commit the written data (upload, mark dirty, ...).
    fn apply(&mut self);
}

/// Largest face width an owned [`Cubemap`] accepts.
pub const MAX_FACE_SIZE: u32 = 16384;

/// Check that `mip_count` halving levels fit a `size` wide face.
pub(crate) fn check_chain(size: u32, mip_count: u32) -> BakeResult<()> {
    if size > MAX_FACE_SIZE {
        return Err(BakeError::invalid(format!(
            "face size {size} exceeds the {MAX_FACE_SIZE} texel limit"
        )));
    }
    if mip_count == 0 {
        return Err(BakeError::invalid("a cubemap needs at least one mip level"));
    }
    if mip_count > 1 && size.checked_shr(mip_count - 1).unwrap_or(0) == 0 {
        return Err(BakeError::invalid(format!(
            "{mip_count} mip levels do not fit a {size}x{size} cubemap"
        )));
    }
    Ok(())
}

/// One mip level: six row-major faces of `size * size` texels.
#[derive(Clone, Debug, PartialEq)]
struct MipLevel {
    size: u32,
    faces: [Vec<Vec4>; 6],
}

impl MipLevel {
    fn filled(size: u32, value: Vec4) -> Self {
        let count = (size as usize) * (size as usize);
        Self {
            size,
            faces: std::array::from_fn(|_| vec![value; count]),
        }
    }
}

/// Owned RGBA32F cubemap with an optional mip chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Cubemap {
    name: String,
    levels: Vec<MipLevel>,
    sampler: SamplerSettings,
    auto_mipmaps: bool,
    apply_count: u32,
}

impl Cubemap {
    /// Black cubemap with `mip_count` levels, level `i` being `size >> i`
    /// texels wide. A zero-sized cubemap may only have a single level.
    pub fn new(size: u32, mip_count: u32) -> BakeResult<Self> {
        Self::filled(size, mip_count, Vec4::ZERO)
    }

    /// Cubemap where every texel of every level holds `value`.
    pub fn filled(size: u32, mip_count: u32, value: Vec4) -> BakeResult<Self> {
        check_chain(size, mip_count)?;
        let levels = (0..mip_count)
            .map(|mip| MipLevel::filled(size >> mip, value))
            .collect();
        Ok(Self {
            name: String::new(),
            levels,
            sampler: SamplerSettings::default(),
            auto_mipmaps: true,
            apply_count: 0,
        })
    }

    /// Single-level cubemap from six row-major faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn from_faces(size: u32, faces: [Vec<Vec4>; 6]) -> BakeResult<Self> {
        check_chain(size, 1)?;
        let expected = (size as usize) * (size as usize);
        if let Some(face) = faces.iter().position(|f| f.len() != expected) {
            return Err(BakeError::invalid(format!(
                "face {face} has {} texels, expected {expected}",
                faces[face].len()
            )));
        }
        Ok(Self {
            name: String::new(),
            levels: vec![MipLevel { size, faces }],
            sampler: SamplerSettings::default(),
            auto_mipmaps: true,
            apply_count: 0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Face width of `mip`, or `None` past the end of the chain.
    pub fn face_size(&self, mip: u32) -> Option<u32> {
        self.levels.get(mip as usize).map(|level| level.size)
    }

    pub fn face(&self, mip: u32, face: CubeFace) -> Option<&[Vec4]> {
        self.levels
            .get(mip as usize)
            .map(|level| level.faces[face.index()].as_slice())
    }

    /// Grow (never shrink) the mip chain to `mip_count` levels; new levels are black.
    pub fn ensure_mip_count(&mut self, mip_count: u32) -> BakeResult<()> {
        let size = self.levels[0].size;
        check_chain(size, mip_count.max(1))?;
        while (self.levels.len() as u32) < mip_count {
            let mip = self.levels.len() as u32;
            self.levels.push(MipLevel::filled(size >> mip, Vec4::ZERO));
        }
        Ok(())
    }

    /// Copy of mip 0 alone, keeping the name.
    pub fn base_level(&self) -> Cubemap {
        Self {
            name: self.name.clone(),
            levels: vec![self.levels[0].clone()],
            sampler: self.sampler,
            auto_mipmaps: self.auto_mipmaps,
            apply_count: 0,
        }
    }

    pub fn sampler(&self) -> SamplerSettings {
        self.sampler
    }

    pub fn auto_mipmaps(&self) -> bool {
        self.auto_mipmaps
    }

    /// How many times `apply` has been called.
    pub fn apply_count(&self) -> u32 {
        self.apply_count
    }
}

impl CubemapRead for Cubemap {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.levels[0].size
    }

    fn height(&self) -> u32 {
        self.levels[0].size
    }

    fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    fn texel(&self, face: CubeFace, x: u32, y: u32, mip: u32) -> Vec4 {
        let level = &self.levels[mip as usize];
        level.faces[face.index()][(y * level.size + x) as usize]
    }
}

impl CubemapWrite for Cubemap {
    fn set_face(&mut self, mip: u32, face: CubeFace, texels: &[Vec4]) -> BakeResult<()> {
        let level = self.levels.get_mut(mip as usize).ok_or_else(|| {
            BakeError::invalid(format!("mip level {mip} is outside the cubemap's chain"))
        })?;
        let dst = &mut level.faces[face.index()];
        if dst.len() != texels.len() {
            return Err(BakeError::invalid(format!(
                "face {face:?} of mip {mip} holds {} texels, got {}",
                dst.len(),
                texels.len()
            )));
        }
        dst.copy_from_slice(texels);
        Ok(())
    }

    fn set_sampler(&mut self, sampler: SamplerSettings) {
        self.sampler = sampler;
    }

    fn set_auto_mipmaps(&mut self, enabled: bool) {
        self.auto_mipmaps = enabled;
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn apply(&mut self) {
        self.apply_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_halving_chain() {
        let cubemap = Cubemap::new(16, 5).unwrap();
        assert_eq!(cubemap.mip_count(), 5);
        for mip in 0..5 {
            assert_eq!(cubemap.face_size(mip), Some(16 >> mip));
            assert_eq!(
                cubemap.face(mip, CubeFace::NegativeY).unwrap().len(),
                ((16 >> mip) * (16 >> mip)) as usize
            );
        }
        assert_eq!(cubemap.face_size(5), None);
    }

    #[test]
    fn test_new_rejects_overlong_chain() {
        assert!(matches!(Cubemap::new(4, 4), Err(BakeError::InvalidInput(_))));
        assert!(matches!(Cubemap::new(4, 0), Err(BakeError::InvalidInput(_))));
        assert!(Cubemap::new(0, 1).is_ok());
    }

    #[test]
    fn test_new_rejects_chains_longer_than_the_shift_width() {
        for mips in [32, 33, 40, 64, u32::MAX] {
            assert!(
                matches!(Cubemap::new(4, mips), Err(BakeError::InvalidInput(_))),
                "{mips} levels"
            );
        }
        assert!(Cubemap::new(4, 3).is_ok_and(|c| c.face_size(2) == Some(1)));
    }

    #[test]
    fn test_new_rejects_oversized_faces() {
        assert!(matches!(Cubemap::new(u32::MAX, 1), Err(BakeError::InvalidInput(_))));
        assert!(matches!(
            Cubemap::new(MAX_FACE_SIZE + 1, 1),
            Err(BakeError::InvalidInput(_))
        ));
        let faces: [Vec<Vec4>; 6] = std::array::from_fn(|_| Vec::new());
        assert!(matches!(
            Cubemap::from_faces(MAX_FACE_SIZE * 2, faces),
            Err(BakeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_texel_addressing_is_row_major() {
        let mut faces: [Vec<Vec4>; 6] = std::array::from_fn(|_| vec![Vec4::ZERO; 4]);
        faces[CubeFace::PositiveZ.index()][3] = Vec4::ONE;
        let cubemap = Cubemap::from_faces(2, faces).unwrap();
        assert_eq!(cubemap.texel(CubeFace::PositiveZ, 1, 1, 0), Vec4::ONE);
        assert_eq!(cubemap.texel(CubeFace::PositiveZ, 0, 1, 0), Vec4::ZERO);
        assert_eq!(cubemap.texel(CubeFace::NegativeZ, 1, 1, 0), Vec4::ZERO);
    }

    #[test]
    fn test_from_faces_checks_lengths() {
        let mut faces: [Vec<Vec4>; 6] = std::array::from_fn(|_| vec![Vec4::ZERO; 4]);
        faces[2].pop();
        assert!(matches!(Cubemap::from_faces(2, faces), Err(BakeError::InvalidInput(_))));
    }

    #[test]
    fn test_set_face_validates_size_and_level() {
        let mut cubemap = Cubemap::new(4, 3).unwrap();
        let level1 = vec![Vec4::splat(0.5); 4];
        cubemap.set_face(1, CubeFace::PositiveY, &level1).unwrap();
        assert_eq!(cubemap.texel(CubeFace::PositiveY, 1, 0, 1), Vec4::splat(0.5));

        assert!(cubemap.set_face(0, CubeFace::PositiveY, &level1).is_err());
        assert!(cubemap.set_face(3, CubeFace::PositiveY, &[Vec4::ZERO]).is_err());
    }

    #[test]
    fn test_ensure_mip_count_grows_only() {
        let mut cubemap = Cubemap::filled(8, 1, Vec4::ONE).unwrap();
        cubemap.ensure_mip_count(4).unwrap();
        assert_eq!(cubemap.mip_count(), 4);
        assert_eq!(cubemap.face_size(3), Some(1));
        assert_eq!(cubemap.texel(CubeFace::PositiveX, 0, 0, 0), Vec4::ONE);
        assert_eq!(cubemap.texel(CubeFace::PositiveX, 0, 0, 3), Vec4::ZERO);

        cubemap.ensure_mip_count(2).unwrap();
        assert_eq!(cubemap.mip_count(), 4);
        assert!(cubemap.ensure_mip_count(5).is_err());
        assert!(cubemap.ensure_mip_count(33).is_err());
        assert!(cubemap.ensure_mip_count(u32::MAX).is_err());
        assert_eq!(cubemap.mip_count(), 4);
    }

    #[test]
    fn test_base_level_keeps_name_and_level_zero() {
        let cubemap = Cubemap::filled(4, 3, Vec4::ONE).unwrap().with_name("Sky");
        let base = cubemap.base_level();
        assert_eq!(base.name(), "Sky");
        assert_eq!(base.mip_count(), 1);
        assert_eq!(base.face(0, CubeFace::PositiveX), cubemap.face(0, CubeFace::PositiveX));
    }
}
