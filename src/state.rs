//! State-group payloads and the distilled command enums the renderer accepts.
//!
//! These are the value types stored in the context's versioned cells and
//! copied into worker snapshots. They carry no synchronization of their own.

use std::sync::Arc;

use crate::color::Color;
use crate::math::Mat4;
use crate::texture::{TextureFilter, TextureId, TextureWrap};

/// Capabilities accepted by `enable`/`disable`/`is_enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    AlphaTest,
    Blend,
    ColorMaterial,
    CullFace,
    DepthTest,
    Dither,
    Fog,
    Lighting,
    Normalize,
    PointSprite,
    ScissorTest,
    StencilTest,
    Texture2d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixMode {
    Modelview,
    Projection,
    Texture,
}

/// Comparison functions shared by the depth, alpha and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunc {
    Never,
    #[default]
    Less,
    Equal,
    Lequal,
    Greater,
    Notequal,
    Gequal,
    Always,
}

impl CompareFunc {
    /// Applies the comparison as `new OP current`.
    #[inline]
    pub fn passes(self, new: f32, current: f32) -> bool {
        match self {
            CompareFunc::Never => false,
            CompareFunc::Less => new < current,
            CompareFunc::Equal => new == current,
            CompareFunc::Lequal => new <= current,
            CompareFunc::Greater => new > current,
            CompareFunc::Notequal => new != current,
            CompareFunc::Gequal => new >= current,
            CompareFunc::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    /// Expands the factor for one channel.
    #[inline]
    pub fn expand(self, src_c: f32, dst_c: f32, src_a: f32, dst_a: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcColor => src_c,
            BlendFactor::OneMinusSrcColor => 1.0 - src_c,
            BlendFactor::DstColor => dst_c,
            BlendFactor::OneMinusDstColor => 1.0 - dst_c,
            BlendFactor::SrcAlpha => src_a,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_a,
            BlendFactor::DstAlpha => dst_a,
            BlendFactor::OneMinusDstAlpha => 1.0 - dst_a,
            BlendFactor::SrcAlphaSaturate => src_a.min(1.0 - dst_a),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogMode {
    Linear,
    #[default]
    Exp,
    Exp2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    Incr,
    Decr,
    Invert,
}

impl StencilOp {
    pub fn apply(self, current: u8, reference: i32) -> u8 {
        match self {
            StencilOp::Keep => current,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference as u8,
            StencilOp::Incr => current.saturating_add(1),
            StencilOp::Decr => current.saturating_sub(1),
            StencilOp::Invert => !current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullFaceMode {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    Cw,
    #[default]
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexEnvMode {
    Replace,
    #[default]
    Modulate,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadeModel {
    Flat,
    #[default]
    Smooth,
}

// ── Versioned group payloads ─────────────────────────────────────────────────

/// A matrix with its saved stack; capacity depends on the matrix mode.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    pub current: Mat4,
    pub stack: Vec<Mat4>,
    pub max_depth: usize,
}

impl MatrixStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            current: Mat4::identity(),
            stack: Vec::new(),
            max_depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlendState {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DepthState {
    pub func: CompareFunc,
}

#[derive(Debug, Clone, Copy)]
pub struct StencilState {
    pub func: CompareFunc,
    pub reference: i32,
    pub value_mask: u32,
    pub write_mask: u32,
    pub fail_op: StencilOp,
    pub zfail_op: StencilOp,
    pub zpass_op: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            reference: 0,
            value_mask: !0,
            write_mask: !0,
            fail_op: StencilOp::Keep,
            zfail_op: StencilOp::Keep,
            zpass_op: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FogState {
    pub enabled: bool,
    pub mode: FogMode,
    pub density: f32,
    pub start: f32,
    pub end: f32,
    pub color: [f32; 4],
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FogMode::Exp,
            density: 1.0,
            start: 0.0,
            end: 1.0,
            color: [0.0; 4],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlphaTestState {
    pub enabled: bool,
    pub func: CompareFunc,
    pub reference: f32,
}

impl Default for AlphaTestState {
    fn default() -> Self {
        Self {
            enabled: false,
            func: CompareFunc::Always,
            reference: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CullState {
    pub mode: CullFaceMode,
    pub front: FrontFace,
}

/// Per-unit texture environment.
#[derive(Debug, Clone, Copy)]
pub struct TextureEnvState {
    pub mode: TexEnvMode,
    pub env_color: [f32; 4],
    pub bound_texture: TextureId,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for TextureEnvState {
    fn default() -> Self {
        Self {
            mode: TexEnvMode::Modulate,
            env_color: [0.0; 4],
            bound_texture: TextureId::NONE,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
        }
    }
}

pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct LightState {
    pub enabled: bool,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 4],
    pub spot_direction: [f32; 3],
    pub spot_exponent: f32,
    pub spot_cutoff: f32,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
}

impl LightState {
    /// ES 1.1 defaults; `diffuse`/`specular` default to white for light 0
    /// only, which the context applies at construction.
    pub fn new(index: usize) -> Self {
        let primary = if index == 0 { 1.0 } else { 0.0 };
        Self {
            enabled: false,
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: [primary, primary, primary, 1.0],
            specular: [primary, primary, primary, 1.0],
            position: [0.0, 0.0, 1.0, 0.0],
            spot_direction: [0.0, 0.0, -1.0],
            spot_exponent: 0.0,
            spot_cutoff: 180.0,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy)]
pub struct MaterialParams {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub shininess: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
        }
    }
}

/// The front/back material pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialState {
    pub front: MaterialParams,
    pub back: MaterialParams,
}

/// Element types accepted by client array pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayType {
    #[default]
    Float,
    UnsignedByte,
}

impl ArrayType {
    pub fn size_bytes(self) -> usize {
        match self {
            ArrayType::Float => 4,
            ArrayType::UnsignedByte => 1,
        }
    }
}

/// Where a client array's bytes come from: an immutable client-side copy or
/// an offset into a bound buffer object.
#[derive(Debug, Clone, Default)]
pub enum ArraySource {
    #[default]
    None,
    Client(Arc<[u8]>),
    Buffer {
        buffer: u32,
        offset: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ArrayState {
    pub enabled: bool,
    pub size: usize,
    pub ty: ArrayType,
    pub stride: usize,
    pub source: ArraySource,
}

impl ArrayState {
    /// The byte distance between consecutive elements: the explicit stride,
    /// else the packed element size.
    pub fn effective_stride(&self) -> usize {
        if self.stride != 0 {
            self.stride
        } else {
            self.size * self.ty.size_bytes()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaskState {
    pub color: [bool; 4],
    pub depth: bool,
}

impl Default for MaskState {
    fn default() -> Self {
        Self {
            color: [true; 4],
            depth: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClearState {
    pub color: Color,
    pub depth: f32,
    pub stencil: u8,
}

impl Default for ClearState {
    fn default() -> Self {
        Self {
            color: Color::rgba(0.0, 0.0, 0.0, 1.0),
            depth: 1.0,
            stencil: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScissorState {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportState {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Raster parameters that are not part of a larger group.
#[derive(Debug, Clone, Copy)]
pub struct RasterParams {
    pub point_size: f32,
    pub line_width: f32,
    pub shade_model: ShadeModel,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            point_size: 1.0,
            line_width: 1.0,
            shade_model: ShadeModel::Smooth,
        }
    }
}
