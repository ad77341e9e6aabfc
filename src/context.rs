//! The versioned rendering context.
//!
//! Each independently mutable state group lives behind its own
//! [`Versioned`] cell (or [`VersionedFlag`] for capability booleans), so the
//! API thread can keep mutating while workers consume consistent snapshots.
//! The context also owns the texture and buffer registries: jobs and cache
//! entries refer to objects by small integer ids, and mutations publish a
//! fresh immutable value instead of writing through shared data.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use ahash::{HashMap, HashMapExt};

use crate::error::{self, GlError};
use crate::math::Mat4;
use crate::memory::MemoryTracker;
use crate::snapshot::{Versioned, VersionedFlag};
use crate::stage::StageTag;
use crate::state::*;
use crate::texture::{
    pack_texels, Texture, TextureFilter, TextureFormat, TextureId, TextureWrap, MAX_MIPMAP_LEVELS,
    MAX_TEXTURE_UNITS,
};

pub const MODELVIEW_STACK_DEPTH: usize = 32;
pub const PROJECTION_STACK_DEPTH: usize = 2;
pub const TEXTURE_STACK_DEPTH: usize = 32;

const TEXTURE_SITE: &str = "texture level data";
const BUFFER_SITE: &str = "buffer object data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// An immutable buffer-object snapshot, replaced wholesale on data uploads.
#[derive(Debug)]
pub struct BufferObject {
    pub id: u32,
    pub usage: BufferUsage,
    pub data: Arc<[u8]>,
}

/// The authoritative render state record.
pub struct RenderContext {
    pub modelview: Versioned<MatrixStack>,
    pub projection: Versioned<MatrixStack>,
    pub texture_matrix: Versioned<MatrixStack>,

    pub blend: Versioned<BlendState>,
    pub depth: Versioned<DepthState>,
    pub stencil: Versioned<StencilState>,
    pub fog: Versioned<FogState>,
    pub alpha_test: Versioned<AlphaTestState>,
    pub cull: Versioned<CullState>,
    pub texture_env: [Versioned<TextureEnvState>; MAX_TEXTURE_UNITS],
    pub lights: [Versioned<LightState>; MAX_LIGHTS],
    pub material: Versioned<MaterialState>,

    pub vertex_array: Versioned<ArrayState>,
    pub color_array: Versioned<ArrayState>,
    pub normal_array: Versioned<ArrayState>,
    pub texcoord_array: Versioned<ArrayState>,

    pub masks: Versioned<MaskState>,
    pub clear_values: Versioned<ClearState>,
    pub scissor: Versioned<ScissorState>,
    pub viewport: Versioned<ViewportState>,
    pub raster: Versioned<RasterParams>,

    pub depth_test: VersionedFlag,
    pub stencil_test: VersionedFlag,
    pub blend_enabled: VersionedFlag,
    pub lighting: VersionedFlag,
    pub texture_2d: VersionedFlag,
    pub cull_face: VersionedFlag,
    pub scissor_test: VersionedFlag,
    pub dither: VersionedFlag,
    pub normalize: VersionedFlag,
    pub color_material: VersionedFlag,
    pub point_sprite: VersionedFlag,

    /// Texture table indexed by id; id 0 is reserved for "none".
    textures: RwLock<Vec<Option<Arc<Texture>>>>,
    buffers: RwLock<HashMap<u32, Arc<BufferObject>>>,
    next_buffer_id: AtomicU32,
    tracker: Arc<MemoryTracker>,
}

impl RenderContext {
    pub fn new(tracker: Arc<MemoryTracker>) -> Self {
        Self {
            modelview: Versioned::new(MatrixStack::new(MODELVIEW_STACK_DEPTH)),
            projection: Versioned::new(MatrixStack::new(PROJECTION_STACK_DEPTH)),
            texture_matrix: Versioned::new(MatrixStack::new(TEXTURE_STACK_DEPTH)),
            blend: Versioned::new(BlendState::default()),
            depth: Versioned::new(DepthState::default()),
            stencil: Versioned::new(StencilState::default()),
            fog: Versioned::new(FogState::default()),
            alpha_test: Versioned::new(AlphaTestState::default()),
            cull: Versioned::new(CullState::default()),
            texture_env: std::array::from_fn(|_| Versioned::new(TextureEnvState::default())),
            lights: std::array::from_fn(|i| Versioned::new(LightState::new(i))),
            material: Versioned::new(MaterialState::default()),
            vertex_array: Versioned::new(ArrayState::default()),
            color_array: Versioned::new(ArrayState::default()),
            normal_array: Versioned::new(ArrayState::default()),
            texcoord_array: Versioned::new(ArrayState::default()),
            masks: Versioned::new(MaskState::default()),
            clear_values: Versioned::new(ClearState::default()),
            scissor: Versioned::new(ScissorState::default()),
            viewport: Versioned::new(ViewportState::default()),
            raster: Versioned::new(RasterParams::default()),
            // Depth testing is on by default, everything else off.
            depth_test: VersionedFlag::new(true),
            stencil_test: VersionedFlag::new(false),
            blend_enabled: VersionedFlag::new(false),
            lighting: VersionedFlag::new(false),
            texture_2d: VersionedFlag::new(false),
            cull_face: VersionedFlag::new(false),
            scissor_test: VersionedFlag::new(false),
            dither: VersionedFlag::new(true),
            normalize: VersionedFlag::new(false),
            color_material: VersionedFlag::new(false),
            point_sprite: VersionedFlag::new(false),
            textures: RwLock::new(vec![None]),
            buffers: RwLock::new(HashMap::new()),
            next_buffer_id: AtomicU32::new(1),
            tracker,
        }
    }

    // ── Capabilities ─────────────────────────────────────────────────────────

    fn flag(&self, cap: Cap) -> Option<&VersionedFlag> {
        match cap {
            Cap::Blend => Some(&self.blend_enabled),
            Cap::ColorMaterial => Some(&self.color_material),
            Cap::CullFace => Some(&self.cull_face),
            Cap::DepthTest => Some(&self.depth_test),
            Cap::Dither => Some(&self.dither),
            Cap::Lighting => Some(&self.lighting),
            Cap::Normalize => Some(&self.normalize),
            Cap::PointSprite => Some(&self.point_sprite),
            Cap::ScissorTest => Some(&self.scissor_test),
            Cap::StencilTest => Some(&self.stencil_test),
            Cap::Texture2d => Some(&self.texture_2d),
            // Fog and alpha-test enables live inside their state groups.
            Cap::Fog | Cap::AlphaTest => None,
        }
    }

    pub fn set_capability(&self, cap: Cap, enabled: bool) {
        match cap {
            Cap::Fog => self.fog.modify(|fog| fog.enabled = enabled),
            Cap::AlphaTest => self.alpha_test.modify(|at| at.enabled = enabled),
            _ => self.flag(cap).unwrap().set(enabled),
        }
    }

    pub fn is_enabled(&self, cap: Cap) -> bool {
        match cap {
            Cap::Fog => self.fog.read().enabled,
            Cap::AlphaTest => self.alpha_test.read().enabled,
            _ => self.flag(cap).unwrap().get(),
        }
    }

    /// The version counter behind a capability, for observing toggles.
    pub fn capability_version(&self, cap: Cap) -> u32 {
        match cap {
            Cap::Fog => self.fog.version(),
            Cap::AlphaTest => self.alpha_test.version(),
            _ => self.flag(cap).unwrap().version(),
        }
    }

    // ── Matrix stacks ────────────────────────────────────────────────────────

    pub fn matrix_stack(&self, mode: MatrixMode) -> &Versioned<MatrixStack> {
        match mode {
            MatrixMode::Modelview => &self.modelview,
            MatrixMode::Projection => &self.projection,
            MatrixMode::Texture => &self.texture_matrix,
        }
    }

    pub fn current_matrix(&self, mode: MatrixMode) -> Mat4 {
        self.matrix_stack(mode).read().current
    }

    pub fn push_matrix(&self, mode: MatrixMode) {
        let result = self.matrix_stack(mode).try_modify(|stack| {
            if stack.stack.len() >= stack.max_depth {
                return Err(GlError::StackOverflow);
            }
            let saved = stack.current;
            stack.stack.push(saved);
            Ok(())
        });
        if let Err(e) = result {
            error::record_error(e);
        }
    }

    pub fn pop_matrix(&self, mode: MatrixMode) {
        let result = self.matrix_stack(mode).try_modify(|stack| {
            let saved = stack.stack.pop().ok_or(GlError::StackUnderflow)?;
            stack.current = saved;
            Ok(())
        });
        if let Err(e) = result {
            error::record_error(e);
        }
    }

    // ── Texture registry ─────────────────────────────────────────────────────

    /// Allocates `n` sequential texture ids, reserving empty slots for them.
    pub fn gen_textures(&self, n: usize) -> Vec<TextureId> {
        let mut table = self.textures.write().unwrap();
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            let id = TextureId(table.len() as u32);
            table.push(Some(Arc::new(Texture::reserved(id))));
            ids.push(id);
        }
        ids
    }

    /// Nulls the slots and drops the level allocations of `ids`. Unknown ids
    /// are ignored.
    pub fn delete_textures(&self, ids: &[TextureId]) {
        let mut table = self.textures.write().unwrap();
        for id in ids {
            if id.is_none() {
                continue;
            }
            if let Some(slot) = table.get_mut(id.0 as usize) {
                if let Some(texture) = slot.take() {
                    self.tracker.record_free(
                        texture_bytes(&texture),
                        StageTag::Fragment,
                        TEXTURE_SITE,
                    );
                }
            }
        }
        // Bindings referring to deleted ids now resolve to nothing; the
        // fragment path samples transparent black in that case.
        for env in &self.texture_env {
            let bound = env.read().bound_texture;
            if ids.contains(&bound) {
                env.modify(|e| e.bound_texture = TextureId::NONE);
            }
        }
    }

    pub fn find_texture(&self, id: TextureId) -> Option<Arc<Texture>> {
        if id.is_none() {
            return None;
        }
        self.textures
            .read()
            .unwrap()
            .get(id.0 as usize)
            .and_then(Clone::clone)
    }

    /// Number of live (non-deleted) entries in the texture table.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .unwrap()
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    fn publish_texture(&self, updated: Texture) {
        let id = updated.id;
        let mut table = self.textures.write().unwrap();
        let slot = &mut table[id.0 as usize];
        if let Some(old) = slot.take() {
            self.tracker
                .record_free(texture_bytes(&old), StageTag::Fragment, TEXTURE_SITE);
        }
        self.tracker
            .record_alloc(texture_bytes(&updated), StageTag::Fragment, TEXTURE_SITE);
        *slot = Some(Arc::new(updated));
    }

    /// Uploads a full image for one mip level, replacing the level's storage.
    /// Level 0 resets the mip chain; follow-up levels must halve the level-0
    /// dimensions.
    #[allow(clippy::too_many_arguments)]
    pub fn tex_image_2d(
        &self,
        id: TextureId,
        level: usize,
        internal_format: TextureFormat,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<(), GlError> {
        if level >= MAX_MIPMAP_LEVELS {
            return Err(GlError::InvalidValue);
        }
        let current = self.find_texture(id).ok_or(GlError::InvalidOperation)?;
        let texels = pack_texels(format, width, height, data)?;

        let mut updated = (*current).clone();
        updated.version = updated.version.wrapping_add(1);
        updated.internal_format = internal_format;
        updated.user_format = format;
        if level == 0 {
            // A new base image invalidates every reduction level.
            updated.width = width;
            updated.height = height;
            updated.mip_width = [0; MAX_MIPMAP_LEVELS];
            updated.mip_height = [0; MAX_MIPMAP_LEVELS];
            updated.levels = Default::default();
            updated.current_level = 0;
            updated.mipmap_supported = width.is_power_of_two() && height.is_power_of_two();
        } else {
            if !updated.mipmap_supported || !updated.has_image() {
                return Err(GlError::InvalidOperation);
            }
            let expected_w = (updated.width >> level).max(1);
            let expected_h = (updated.height >> level).max(1);
            if width != expected_w || height != expected_h {
                return Err(GlError::InvalidValue);
            }
            updated.current_level = updated.current_level.max(level);
        }
        updated.mip_width[level] = width;
        updated.mip_height[level] = height;
        updated.levels[level] = Some(texels.into());

        self.publish_texture(updated);
        Ok(())
    }

    /// Overwrites a subrectangle of an existing level in the same format.
    #[allow(clippy::too_many_arguments)]
    pub fn tex_sub_image_2d(
        &self,
        id: TextureId,
        level: usize,
        xoffset: u32,
        yoffset: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<(), GlError> {
        if level >= MAX_MIPMAP_LEVELS {
            return Err(GlError::InvalidValue);
        }
        let current = self.find_texture(id).ok_or(GlError::InvalidOperation)?;
        if format != current.user_format {
            return Err(GlError::InvalidOperation);
        }
        let level_data = current.levels[level]
            .as_ref()
            .ok_or(GlError::InvalidOperation)?;
        let (lw, lh) = (current.mip_width[level], current.mip_height[level]);
        if xoffset + width > lw || yoffset + height > lh {
            return Err(GlError::InvalidValue);
        }
        let texels = pack_texels(format, width, height, data)?;

        let mut patched: Vec<u32> = level_data.to_vec();
        for row in 0..height {
            let dst = ((yoffset + row) * lw + xoffset) as usize;
            let src = (row * width) as usize;
            patched[dst..dst + width as usize]
                .copy_from_slice(&texels[src..src + width as usize]);
        }

        let mut updated = (*current).clone();
        updated.version = updated.version.wrapping_add(1);
        updated.levels[level] = Some(patched.into());
        self.publish_texture(updated);
        Ok(())
    }

    /// Updates a sampling parameter of the texture bound to `unit` and
    /// mirrors it in the unit's environment state.
    pub fn tex_parameter(&self, unit: usize, param: TexParameter) -> Result<(), GlError> {
        let env = &self.texture_env[unit];
        let id = env.read().bound_texture;
        let current = self.find_texture(id).ok_or(GlError::InvalidOperation)?;

        let mut updated = (*current).clone();
        match param {
            TexParameter::MinFilter(f) => updated.min_filter = f,
            TexParameter::MagFilter(f) => updated.mag_filter = f,
            TexParameter::WrapS(w) => updated.wrap_s = w,
            TexParameter::WrapT(w) => updated.wrap_t = w,
            TexParameter::CropRect(rect) => updated.crop_rect = rect,
        }
        // Texels are unchanged, so the version is not bumped and cached
        // blocks stay valid.
        self.publish_texture(updated);

        env.modify(|e| match param {
            TexParameter::MinFilter(f) => e.min_filter = f,
            TexParameter::MagFilter(f) => e.mag_filter = f,
            TexParameter::WrapS(w) => e.wrap_s = w,
            TexParameter::WrapT(w) => e.wrap_t = w,
            TexParameter::CropRect(_) => {}
        });
        Ok(())
    }

    // ── Buffer registry ──────────────────────────────────────────────────────

    pub fn gen_buffers(&self, n: usize) -> Vec<u32> {
        let mut registry = self.buffers.write().unwrap();
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
            registry.insert(
                id,
                Arc::new(BufferObject {
                    id,
                    usage: BufferUsage::default(),
                    data: Arc::from(&[][..]),
                }),
            );
            ids.push(id);
        }
        ids
    }

    pub fn delete_buffers(&self, ids: &[u32]) {
        let mut registry = self.buffers.write().unwrap();
        for id in ids {
            if let Some(buffer) = registry.remove(id) {
                self.tracker
                    .record_free(buffer.data.len(), StageTag::Vertex, BUFFER_SITE);
            }
        }
    }

    pub fn find_buffer(&self, id: u32) -> Option<Arc<BufferObject>> {
        self.buffers.read().unwrap().get(&id).cloned()
    }

    pub fn buffer_data(&self, id: u32, data: &[u8], usage: BufferUsage) -> Result<(), GlError> {
        let mut registry = self.buffers.write().unwrap();
        let slot = registry.get_mut(&id).ok_or(GlError::InvalidOperation)?;
        self.tracker
            .record_free(slot.data.len(), StageTag::Vertex, BUFFER_SITE);
        self.tracker
            .record_alloc(data.len(), StageTag::Vertex, BUFFER_SITE);
        *slot = Arc::new(BufferObject {
            id,
            usage,
            data: Arc::from(data),
        });
        Ok(())
    }

    pub fn buffer_sub_data(&self, id: u32, offset: usize, data: &[u8]) -> Result<(), GlError> {
        let mut registry = self.buffers.write().unwrap();
        let slot = registry.get_mut(&id).ok_or(GlError::InvalidOperation)?;
        if offset + data.len() > slot.data.len() {
            return Err(GlError::InvalidValue);
        }
        let mut patched = slot.data.to_vec();
        patched[offset..offset + data.len()].copy_from_slice(data);
        *slot = Arc::new(BufferObject {
            id,
            usage: slot.usage,
            data: patched.into(),
        });
        Ok(())
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    pub fn record_error(&self, error: GlError) {
        error::record_error(error);
    }

    pub fn take_error(&self) -> Option<GlError> {
        error::take_error()
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        let mut table = self.textures.write().unwrap();
        for slot in table.iter_mut() {
            if let Some(texture) = slot.take() {
                self.tracker
                    .record_free(texture_bytes(&texture), StageTag::Fragment, TEXTURE_SITE);
            }
        }
        let mut registry = self.buffers.write().unwrap();
        for (_, buffer) in registry.drain() {
            self.tracker
                .record_free(buffer.data.len(), StageTag::Vertex, BUFFER_SITE);
        }
    }
}

/// A single texture sampling parameter update.
#[derive(Debug, Clone, Copy)]
pub enum TexParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    CropRect([i32; 4]),
}

fn texture_bytes(texture: &Texture) -> usize {
    texture
        .levels
        .iter()
        .flatten()
        .map(|level| level.len() * 4)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> RenderContext {
        RenderContext::new(Arc::new(MemoryTracker::new()))
    }

    #[test]
    fn capability_toggle_round_trip_advances_version_by_two() {
        let ctx = test_context();
        for cap in [Cap::Blend, Cap::Fog, Cap::AlphaTest, Cap::Texture2d] {
            let before = ctx.capability_version(cap);
            let initially = ctx.is_enabled(cap);
            ctx.set_capability(cap, !initially);
            ctx.set_capability(cap, initially);
            assert_eq!(ctx.is_enabled(cap), initially, "{cap:?}");
            assert_eq!(ctx.capability_version(cap), before + 2, "{cap:?}");
        }
    }

    #[test]
    fn depth_test_is_enabled_by_default() {
        let ctx = test_context();
        assert!(ctx.is_enabled(Cap::DepthTest));
        assert!(!ctx.is_enabled(Cap::Blend));
    }

    #[test]
    fn push_pop_restores_the_matrix_bitwise() {
        let ctx = test_context();
        ctx.modelview.modify(|stack| {
            stack.current.translate(1.25, -2.5, 3.75);
            stack.current.rotate(30.0, 0.0, 1.0, 0.0);
        });
        let saved = ctx.current_matrix(MatrixMode::Modelview);

        ctx.push_matrix(MatrixMode::Modelview);
        ctx.modelview.modify(|stack| stack.current.scale(5.0, 5.0, 5.0));
        ctx.pop_matrix(MatrixMode::Modelview);

        assert_eq!(ctx.current_matrix(MatrixMode::Modelview).data, saved.data);
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn push_beyond_capacity_records_stack_overflow_and_preserves_the_matrix() {
        let ctx = test_context();
        for _ in 0..MODELVIEW_STACK_DEPTH {
            ctx.push_matrix(MatrixMode::Modelview);
            assert_eq!(ctx.take_error(), None);
        }
        let before = ctx.current_matrix(MatrixMode::Modelview);
        ctx.push_matrix(MatrixMode::Modelview);
        assert_eq!(ctx.take_error(), Some(GlError::StackOverflow));
        assert_eq!(ctx.current_matrix(MatrixMode::Modelview).data, before.data);
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn projection_stack_is_two_deep() {
        let ctx = test_context();
        ctx.push_matrix(MatrixMode::Projection);
        ctx.push_matrix(MatrixMode::Projection);
        assert_eq!(ctx.take_error(), None);
        ctx.push_matrix(MatrixMode::Projection);
        assert_eq!(ctx.take_error(), Some(GlError::StackOverflow));
    }

    #[test]
    fn pop_of_an_empty_stack_records_stack_underflow() {
        let ctx = test_context();
        ctx.pop_matrix(MatrixMode::Texture);
        assert_eq!(ctx.take_error(), Some(GlError::StackUnderflow));
    }

    #[test]
    fn gen_then_delete_leaves_texture_count_unchanged() {
        let ctx = test_context();
        let before = ctx.texture_count();
        let ids = ctx.gen_textures(3);
        assert_eq!(ctx.texture_count(), before + 3);
        ctx.delete_textures(&ids);
        assert_eq!(ctx.texture_count(), before);
        for id in ids {
            assert!(ctx.find_texture(id).is_none());
        }
    }

    #[test]
    fn tex_image_bumps_the_texture_version() {
        let ctx = test_context();
        let id = ctx.gen_textures(1)[0];
        let pixels = [0u8; 16];
        ctx.tex_image_2d(id, 0, TextureFormat::Rgba8, 2, 2, TextureFormat::Rgba8, &pixels)
            .unwrap();
        let v1 = ctx.find_texture(id).unwrap().version;
        ctx.tex_image_2d(id, 0, TextureFormat::Rgba8, 2, 2, TextureFormat::Rgba8, &pixels)
            .unwrap();
        let v2 = ctx.find_texture(id).unwrap().version;
        assert_ne!(v1, v2);
    }

    #[test]
    fn tex_sub_image_patches_the_rectangle() {
        let ctx = test_context();
        let id = ctx.gen_textures(1)[0];
        ctx.tex_image_2d(id, 0, TextureFormat::Rgba8, 2, 2, TextureFormat::Rgba8, &[0u8; 16])
            .unwrap();
        ctx.tex_sub_image_2d(
            id,
            0,
            1,
            1,
            1,
            1,
            TextureFormat::Rgba8,
            &[0xFF, 0x00, 0x00, 0xFF],
        )
        .unwrap();
        let tex = ctx.find_texture(id).unwrap();
        assert_eq!(tex.texel(0, 0, 0), 0);
        assert_eq!(tex.texel(0, 1, 1), 0xFFFF_0000);
    }

    #[test]
    fn tex_sub_image_with_mismatched_format_is_invalid() {
        let ctx = test_context();
        let id = ctx.gen_textures(1)[0];
        ctx.tex_image_2d(id, 0, TextureFormat::Rgba8, 1, 1, TextureFormat::Rgba8, &[0u8; 4])
            .unwrap();
        assert_eq!(
            ctx.tex_sub_image_2d(id, 0, 0, 0, 1, 1, TextureFormat::Rgb8, &[0u8; 3]),
            Err(GlError::InvalidOperation)
        );
    }

    #[test]
    fn texture_memory_balances_after_delete() {
        let tracker = Arc::new(MemoryTracker::new());
        let ctx = RenderContext::new(tracker.clone());
        let id = ctx.gen_textures(1)[0];
        ctx.tex_image_2d(id, 0, TextureFormat::Rgba8, 4, 4, TextureFormat::Rgba8, &[0u8; 64])
            .unwrap();
        assert_eq!(tracker.stage_usage(StageTag::Fragment), 64);
        ctx.delete_textures(&[id]);
        assert_eq!(tracker.stage_usage(StageTag::Fragment), 0);
    }

    #[test]
    fn buffer_data_and_sub_data_round_trip() {
        let ctx = test_context();
        let id = ctx.gen_buffers(1)[0];
        ctx.buffer_data(id, &[1, 2, 3, 4], BufferUsage::StaticDraw).unwrap();
        ctx.buffer_sub_data(id, 2, &[9, 9]).unwrap();
        let buffer = ctx.find_buffer(id).unwrap();
        assert_eq!(&buffer.data[..], &[1, 2, 9, 9]);
        assert_eq!(
            ctx.buffer_sub_data(id, 3, &[0, 0]),
            Err(GlError::InvalidValue)
        );
    }

    #[test]
    fn deleting_a_bound_texture_unbinds_it() {
        let ctx = test_context();
        let id = ctx.gen_textures(1)[0];
        ctx.texture_env[0].modify(|env| env.bound_texture = id);
        ctx.delete_textures(&[id]);
        assert!(ctx.texture_env[0].read().bound_texture.is_none());
    }
}
