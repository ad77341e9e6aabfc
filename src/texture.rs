//! Texture objects and their registry snapshots.
//!
//! A texture is published to workers as an immutable [`Arc<Texture>`]: image
//! uploads build a new value with a bumped version and swap it into the
//! registry slot, so a worker holding the previous snapshot keeps sampling a
//! consistent image and the version change is what invalidates texel-cache
//! entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::GlError;

/// Maximum mip chain length (level 0 plus eleven reductions).
pub const MAX_MIPMAP_LEVELS: usize = 12;

/// Texture units sampled by the fragment path.
pub const MAX_TEXTURE_UNITS: usize = 2;

/// A small integer handle into the context's texture table. Id 0 means
/// "no texture bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const NONE: TextureId = TextureId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureTarget {
    #[default]
    Texture2d,
}

/// Client pixel layouts accepted by image uploads. Texels are stored
/// internally as packed `0xAARRGGBB` words regardless of the upload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    Rgb8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    #[inline]
    pub fn is_mipmap(self) -> bool {
        !matches!(self, TextureFilter::Nearest | TextureFilter::Linear)
    }

    #[inline]
    pub fn is_linear(self) -> bool {
        matches!(
            self,
            TextureFilter::Linear
                | TextureFilter::LinearMipmapNearest
                | TextureFilter::LinearMipmapLinear
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrap {
    #[default]
    Repeat,
    ClampToEdge,
}

/// A texture image with its mip chain and sampling parameters.
#[derive(Debug)]
pub struct Texture {
    pub id: TextureId,
    pub target: TextureTarget,
    pub internal_format: TextureFormat,
    pub user_format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub mip_width: [u32; MAX_MIPMAP_LEVELS],
    pub mip_height: [u32; MAX_MIPMAP_LEVELS],
    /// Tightly packed `0xAARRGGBB` texels per populated level.
    pub levels: [Option<Arc<[u32]>>; MAX_MIPMAP_LEVELS],
    pub mipmap_supported: bool,
    /// Highest populated mip level.
    pub current_level: usize,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub crop_rect: [i32; 4],
    /// Bumped on every image upload; part of the texel-cache entry key.
    pub version: u32,
    /// Set while any in-flight draw may still sample this texture.
    pub active: AtomicBool,
}

impl Clone for Texture {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            target: self.target,
            internal_format: self.internal_format,
            user_format: self.user_format,
            width: self.width,
            height: self.height,
            mip_width: self.mip_width,
            mip_height: self.mip_height,
            levels: self.levels.clone(),
            mipmap_supported: self.mipmap_supported,
            current_level: self.current_level,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            wrap_s: self.wrap_s,
            wrap_t: self.wrap_t,
            crop_rect: self.crop_rect,
            version: self.version,
            active: AtomicBool::new(self.active.load(Ordering::Relaxed)),
        }
    }
}

impl Texture {
    /// A reserved table slot: an id with no image data yet.
    pub fn reserved(id: TextureId) -> Self {
        Self {
            id,
            target: TextureTarget::Texture2d,
            internal_format: TextureFormat::Rgba8,
            user_format: TextureFormat::Rgba8,
            width: 0,
            height: 0,
            mip_width: [0; MAX_MIPMAP_LEVELS],
            mip_height: [0; MAX_MIPMAP_LEVELS],
            levels: Default::default(),
            mipmap_supported: false,
            current_level: 0,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            crop_rect: [0; 4],
            version: 0,
            active: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn has_image(&self) -> bool {
        self.levels[0].is_some()
    }

    pub fn level_width(&self, level: usize) -> u32 {
        self.mip_width.get(level).copied().unwrap_or(0)
    }

    pub fn level_height(&self, level: usize) -> u32 {
        self.mip_height.get(level).copied().unwrap_or(0)
    }

    /// Reads one texel; out-of-bounds coordinates and unpopulated levels
    /// sample as zero.
    pub fn texel(&self, level: usize, x: u32, y: u32) -> u32 {
        if level >= MAX_MIPMAP_LEVELS {
            return 0;
        }
        let (w, h) = (self.mip_width[level], self.mip_height[level]);
        if x >= w || y >= h {
            return 0;
        }
        match &self.levels[level] {
            Some(data) => data[(y * w + x) as usize],
            None => 0,
        }
    }
}

/// Converts client pixel bytes into packed `0xAARRGGBB` texels.
///
/// Returns `InvalidValue` when `data` is shorter than the described image.
pub fn pack_texels(
    format: TextureFormat,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<Vec<u32>, GlError> {
    let pixel_count = width as usize * height as usize;
    let needed = pixel_count * format.bytes_per_pixel();
    if data.len() < needed {
        return Err(GlError::InvalidValue);
    }
    let mut texels = Vec::with_capacity(pixel_count);
    match format {
        TextureFormat::Rgba8 => {
            for px in data[..needed].chunks_exact(4) {
                texels.push(
                    ((px[3] as u32) << 24)
                        | ((px[0] as u32) << 16)
                        | ((px[1] as u32) << 8)
                        | px[2] as u32,
                );
            }
        }
        TextureFormat::Rgb8 => {
            for px in data[..needed].chunks_exact(3) {
                texels.push(
                    0xFF00_0000 | ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32,
                );
            }
        }
    }
    Ok(texels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_texture_has_no_image() {
        let tex = Texture::reserved(TextureId(3));
        assert!(!tex.has_image());
        assert_eq!(tex.texel(0, 0, 0), 0);
    }

    #[test]
    fn out_of_bounds_texels_sample_as_zero() {
        let mut tex = Texture::reserved(TextureId(1));
        tex.mip_width[0] = 2;
        tex.mip_height[0] = 2;
        tex.width = 2;
        tex.height = 2;
        tex.levels[0] = Some(vec![1, 2, 3, 4].into());
        assert_eq!(tex.texel(0, 1, 1), 4);
        assert_eq!(tex.texel(0, 2, 0), 0);
        assert_eq!(tex.texel(0, 0, 2), 0);
        assert_eq!(tex.texel(1, 0, 0), 0);
    }

    #[test]
    fn pack_texels_converts_rgba_bytes() {
        let texels = pack_texels(TextureFormat::Rgba8, 1, 1, &[0x11, 0x22, 0x33, 0x44]).unwrap();
        assert_eq!(texels, vec![0x4411_2233]);
    }

    #[test]
    fn pack_texels_fills_opaque_alpha_for_rgb() {
        let texels = pack_texels(TextureFormat::Rgb8, 1, 1, &[0x11, 0x22, 0x33]).unwrap();
        assert_eq!(texels, vec![0xFF11_2233]);
    }

    #[test]
    fn pack_texels_rejects_short_input() {
        assert_eq!(
            pack_texels(TextureFormat::Rgba8, 2, 2, &[0; 8]),
            Err(GlError::InvalidValue)
        );
    }

    #[test]
    fn mipmap_filters_are_classified() {
        assert!(TextureFilter::LinearMipmapLinear.is_mipmap());
        assert!(TextureFilter::LinearMipmapLinear.is_linear());
        assert!(!TextureFilter::Nearest.is_mipmap());
        assert!(!TextureFilter::NearestMipmapNearest.is_linear());
    }
}
