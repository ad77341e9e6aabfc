//! Texture object management routed through the context registry.

use super::Renderer;
use crate::context::TexParameter;
use crate::error::GlError;
use crate::texture::{TextureFormat, TextureId, TextureTarget, MAX_MIPMAP_LEVELS};

impl Renderer {
    pub fn gen_textures(&mut self, n: usize) -> Vec<TextureId> {
        self.context().gen_textures(n)
    }

    pub fn delete_textures(&mut self, ids: &[TextureId]) {
        self.context().delete_textures(ids);
    }

    /// Binds `id` to the active texture unit; 0 unbinds.
    pub fn bind_texture(&mut self, _target: TextureTarget, id: TextureId) {
        if !id.is_none() && self.context().find_texture(id).is_none() {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        let unit = self.active_texture_unit;
        self.context().texture_env[unit].modify(|env| env.bound_texture = id);
    }

    pub fn bound_texture(&self) -> TextureId {
        self.context().texture_env[self.active_texture_unit]
            .read()
            .bound_texture
    }

    /// Uploads an image to one level of the texture bound to the active unit.
    pub fn tex_image_2d(
        &mut self,
        level: usize,
        internal_format: TextureFormat,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) {
        if level >= MAX_MIPMAP_LEVELS || width > crate::framebuffer::MAX_DIMENSION
            || height > crate::framebuffer::MAX_DIMENSION
        {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        let id = self.bound_texture();
        if id.is_none() {
            self.context().record_error(GlError::InvalidOperation);
            return;
        }
        if let Err(e) =
            self.context()
                .tex_image_2d(id, level, internal_format, width, height, format, data)
        {
            self.context().record_error(e);
        }
    }

    /// Overwrites a subrectangle of the bound texture's level; the format
    /// must match the original upload.
    #[allow(clippy::too_many_arguments)]
    pub fn tex_sub_image_2d(
        &mut self,
        level: usize,
        xoffset: u32,
        yoffset: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) {
        let id = self.bound_texture();
        if id.is_none() {
            self.context().record_error(GlError::InvalidOperation);
            return;
        }
        if let Err(e) = self.context().tex_sub_image_2d(
            id, level, xoffset, yoffset, width, height, format, data,
        ) {
            self.context().record_error(e);
        }
    }

    /// Updates one sampling parameter of the bound texture.
    pub fn tex_parameter(&mut self, param: TexParameter) {
        let unit = self.active_texture_unit;
        if let Err(e) = self.context().tex_parameter(unit, param) {
            self.context().record_error(e);
        }
    }
}
