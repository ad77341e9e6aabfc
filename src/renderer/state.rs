//! Scalar state mutation: capabilities, tests, masks and fixed-function
//! parameters. Every setter validates, writes the owning state group and
//! publishes a new version; invalid arguments record a sticky error and leave
//! state untouched.

use super::Renderer;
use crate::error::GlError;
use crate::state::{
    BlendFactor, Cap, CompareFunc, CullFaceMode, FogMode, FrontFace, MaterialFace, ShadeModel,
    StencilOp, TexEnvMode,
};
use crate::texture::MAX_TEXTURE_UNITS;

/// One light parameter update, mirroring the `Light*` entry points.
#[derive(Debug, Clone, Copy)]
pub enum LightParam {
    Ambient([f32; 4]),
    Diffuse([f32; 4]),
    Specular([f32; 4]),
    Position([f32; 4]),
    SpotDirection([f32; 3]),
    SpotExponent(f32),
    SpotCutoff(f32),
    ConstantAttenuation(f32),
    LinearAttenuation(f32),
    QuadraticAttenuation(f32),
}

/// One material parameter update, mirroring the `Material*` entry points.
#[derive(Debug, Clone, Copy)]
pub enum MaterialParam {
    Ambient([f32; 4]),
    Diffuse([f32; 4]),
    Specular([f32; 4]),
    Emission([f32; 4]),
    Shininess(f32),
    AmbientAndDiffuse([f32; 4]),
}

impl Renderer {
    pub fn enable(&mut self, cap: Cap) {
        self.context().set_capability(cap, true);
    }

    pub fn disable(&mut self, cap: Cap) {
        self.context().set_capability(cap, false);
    }

    pub fn is_enabled(&self, cap: Cap) -> bool {
        self.context().is_enabled(cap)
    }

    pub fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        // SrcAlphaSaturate is a source-only factor.
        if dst == BlendFactor::SrcAlphaSaturate {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.context().blend.modify(|blend| {
            blend.src_factor = src;
            blend.dst_factor = dst;
        });
    }

    pub fn depth_func(&mut self, func: CompareFunc) {
        self.context().depth.modify(|depth| depth.func = func);
    }

    pub fn depth_mask(&mut self, enabled: bool) {
        self.context().masks.modify(|masks| masks.depth = enabled);
    }

    pub fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.context().masks.modify(|masks| masks.color = [r, g, b, a]);
    }

    pub fn alpha_func(&mut self, func: CompareFunc, reference: f32) {
        self.context().alpha_test.modify(|at| {
            at.func = func;
            at.reference = reference.clamp(0.0, 1.0);
        });
    }

    pub fn stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.context().stencil.modify(|stencil| {
            stencil.func = func;
            stencil.reference = reference;
            stencil.value_mask = mask;
        });
    }

    pub fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, zpass: StencilOp) {
        self.context().stencil.modify(|stencil| {
            stencil.fail_op = fail;
            stencil.zfail_op = zfail;
            stencil.zpass_op = zpass;
        });
    }

    pub fn stencil_mask(&mut self, mask: u32) {
        self.context().stencil.modify(|stencil| stencil.write_mask = mask);
    }

    pub fn cull_face(&mut self, mode: CullFaceMode) {
        self.context().cull.modify(|cull| cull.mode = mode);
    }

    pub fn front_face(&mut self, front: FrontFace) {
        self.context().cull.modify(|cull| cull.front = front);
    }

    pub fn fog_mode(&mut self, mode: FogMode) {
        self.context().fog.modify(|fog| fog.mode = mode);
    }

    pub fn fog_density(&mut self, density: f32) {
        if density < 0.0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.context().fog.modify(|fog| fog.density = density);
    }

    pub fn fog_range(&mut self, start: f32, end: f32) {
        self.context().fog.modify(|fog| {
            fog.start = start;
            fog.end = end;
        });
    }

    pub fn fog_color(&mut self, color: [f32; 4]) {
        self.context().fog.modify(|fog| fog.color = color);
    }

    pub fn light(&mut self, index: usize, param: LightParam) {
        if index >= crate::state::MAX_LIGHTS {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.context().lights[index].modify(|light| match param {
            LightParam::Ambient(v) => light.ambient = v,
            LightParam::Diffuse(v) => light.diffuse = v,
            LightParam::Specular(v) => light.specular = v,
            LightParam::Position(v) => light.position = v,
            LightParam::SpotDirection(v) => light.spot_direction = v,
            LightParam::SpotExponent(v) => light.spot_exponent = v,
            LightParam::SpotCutoff(v) => light.spot_cutoff = v,
            LightParam::ConstantAttenuation(v) => light.constant_attenuation = v,
            LightParam::LinearAttenuation(v) => light.linear_attenuation = v,
            LightParam::QuadraticAttenuation(v) => light.quadratic_attenuation = v,
        });
    }

    /// Enables or disables one light; routed through the light's own version
    /// counter rather than the capability table.
    pub fn set_light_enabled(&mut self, index: usize, enabled: bool) {
        if index >= crate::state::MAX_LIGHTS {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.context().lights[index].modify(|light| light.enabled = enabled);
    }

    pub fn material(&mut self, face: MaterialFace, param: MaterialParam) {
        self.context().material.modify(|material| {
            let mut apply = |params: &mut crate::state::MaterialParams| match param {
                MaterialParam::Ambient(v) => params.ambient = v,
                MaterialParam::Diffuse(v) => params.diffuse = v,
                MaterialParam::Specular(v) => params.specular = v,
                MaterialParam::Emission(v) => params.emission = v,
                MaterialParam::Shininess(v) => params.shininess = v,
                MaterialParam::AmbientAndDiffuse(v) => {
                    params.ambient = v;
                    params.diffuse = v;
                }
            };
            match face {
                MaterialFace::Front => apply(&mut material.front),
                MaterialFace::Back => apply(&mut material.back),
                MaterialFace::FrontAndBack => {
                    apply(&mut material.front);
                    apply(&mut material.back);
                }
            }
        });
    }

    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.context().viewport.modify(|v| {
            v.x = x;
            v.y = y;
            v.width = width;
            v.height = height;
        });
    }

    pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.context().scissor.modify(|s| {
            s.x = x;
            s.y = y;
            s.width = width;
            s.height = height;
        });
    }

    pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.context().clear_values.modify(|clear| {
            clear.color = crate::color::Color([
                r.clamp(0.0, 1.0),
                g.clamp(0.0, 1.0),
                b.clamp(0.0, 1.0),
                a.clamp(0.0, 1.0),
            ]);
        });
    }

    pub fn clear_depth(&mut self, depth: f32) {
        self.context()
            .clear_values
            .modify(|clear| clear.depth = depth.clamp(0.0, 1.0));
    }

    pub fn clear_stencil(&mut self, stencil: i32) {
        self.context()
            .clear_values
            .modify(|clear| clear.stencil = stencil as u8);
    }

    pub fn point_size(&mut self, size: f32) {
        if size <= 0.0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.context().raster.modify(|raster| raster.point_size = size);
    }

    pub fn line_width(&mut self, width: f32) {
        if width <= 0.0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.context().raster.modify(|raster| raster.line_width = width);
    }

    pub fn shade_model(&mut self, model: ShadeModel) {
        self.context().raster.modify(|raster| raster.shade_model = model);
    }

    // ── Current vertex attributes (latched, consumed at draw expansion) ──────

    pub fn color4(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.current_color = [r, g, b, a];
    }

    pub fn normal3(&mut self, x: f32, y: f32, z: f32) {
        self.current_normal = [x, y, z];
    }

    pub fn multi_tex_coord4(&mut self, unit: usize, s: f32, t: f32, r: f32, q: f32) {
        if unit >= MAX_TEXTURE_UNITS {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.current_texcoord[unit] = [s, t, r, q];
    }

    pub fn active_texture(&mut self, unit: usize) {
        if unit >= MAX_TEXTURE_UNITS {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.active_texture_unit = unit;
    }

    pub fn client_active_texture(&mut self, unit: usize) {
        if unit >= MAX_TEXTURE_UNITS {
            self.context().record_error(GlError::InvalidEnum);
            return;
        }
        self.client_active_texture = unit;
    }

    pub fn tex_env_mode(&mut self, mode: TexEnvMode) {
        let unit = self.active_texture_unit;
        self.context().texture_env[unit].modify(|env| env.mode = mode);
    }

    pub fn tex_env_color(&mut self, color: [f32; 4]) {
        let unit = self.active_texture_unit;
        self.context().texture_env[unit].modify(|env| env.env_color = color);
    }
}
