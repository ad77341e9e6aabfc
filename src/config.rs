//! Runtime configuration for the renderer.

use crate::color::ColorSpec;
use crate::error::RendererError;
use crate::framebuffer::DEFAULT_TILE_SIZE;

pub const THREADS_ENV: &str = "TESSERA_THREADS";
pub const TILE_SIZE_ENV: &str = "TESSERA_TILE_SIZE";
pub const COLOR_SPEC_ENV: &str = "TESSERA_COLOR_SPEC";
pub const PROFILE_ENV: &str = "TESSERA_PROFILE";

/// How the fragment stage derives texture coordinates.
///
/// `FramebufferSpace` maps `u = x / width`, `v = y / height` (and the sprite
/// rectangle for point sprites); `Barycentric` interpolates the triangle's
/// vertex coordinates with affine barycentric weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UvMode {
    #[default]
    FramebufferSpace,
    Barycentric,
}

/// Renderer construction options.
///
/// Defaults: one worker per available core, 16-pixel tiles, ARGB8888 color,
/// profiling off. [`RendererConfig::from_env`] overrides the defaults from
/// `TESSERA_THREADS`, `TESSERA_TILE_SIZE`, `TESSERA_COLOR_SPEC` and
/// `TESSERA_PROFILE`.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub threads: Option<usize>,
    pub tile_size: u32,
    pub color_spec: ColorSpec,
    pub profile: bool,
    pub uv_mode: UvMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            threads: None,
            tile_size: DEFAULT_TILE_SIZE,
            color_spec: ColorSpec::Argb8888,
            profile: false,
            uv_mode: UvMode::FramebufferSpace,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads configuration from the environment, falling back to defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, RendererError> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(THREADS_ENV) {
            let threads: usize = value
                .parse()
                .map_err(|_| RendererError::InvalidThreadCount(0))?;
            config = config.with_threads(threads)?;
        }
        if let Ok(value) = std::env::var(TILE_SIZE_ENV) {
            let tile_size: u32 = value
                .parse()
                .map_err(|_| RendererError::InvalidTileSize(0))?;
            config = config.with_tile_size(tile_size)?;
        }
        if let Ok(value) = std::env::var(COLOR_SPEC_ENV) {
            config = config.with_color_spec(parse_color_spec(&value)?);
        }
        if let Ok(value) = std::env::var(PROFILE_ENV) {
            config.profile = value == "1" || value.eq_ignore_ascii_case("true");
        }
        Ok(config)
    }

    pub fn with_threads(mut self, threads: usize) -> Result<Self, RendererError> {
        if threads == 0 || threads > 256 {
            return Err(RendererError::InvalidThreadCount(threads));
        }
        self.threads = Some(threads);
        Ok(self)
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Result<Self, RendererError> {
        if !(4..=256).contains(&tile_size) || !tile_size.is_power_of_two() {
            return Err(RendererError::InvalidTileSize(tile_size));
        }
        self.tile_size = tile_size;
        Ok(self)
    }

    pub fn with_color_spec(mut self, color_spec: ColorSpec) -> Self {
        self.color_spec = color_spec;
        self
    }

    pub fn with_profiling(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_uv_mode(mut self, uv_mode: UvMode) -> Self {
        self.uv_mode = uv_mode;
        self
    }

    /// The worker thread count to spawn: the configured value, else the
    /// machine's available parallelism.
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn parse_color_spec(value: &str) -> Result<ColorSpec, RendererError> {
    match value.to_ascii_uppercase().as_str() {
        "ARGB8888" => Ok(ColorSpec::Argb8888),
        "XRGB8888" => Ok(ColorSpec::Xrgb8888),
        _ => Err(RendererError::InvalidColorSpec(value.to_string())),
    }
}
