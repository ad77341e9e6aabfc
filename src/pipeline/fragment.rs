//! Fragment-tile stage: the fixed-function per-pixel path.
//!
//! A job locks its tile, copies the planes into scratch, and walks every
//! covered pixel through texturing, fog, alpha test, scissor, stencil, depth
//! and blend against the scratch copies. Depth testing inside the tile scope
//! is plain memory; the tile lock serializes all writers of the rectangle.

use std::sync::Arc;

use crate::color::{modulate, pack_rgba, unpack_rgba};
use crate::config::UvMode;
use crate::framebuffer::TileScope;
use crate::pipeline::jobs::FragmentTileJob;
use crate::pipeline::{Core, WorkerContext};
use crate::state::{
    AlphaTestState, BlendFactor, BlendState, CompareFunc, FogMode, FogState, MaskState,
    ScissorState, StencilState, TexEnvMode, TextureEnvState,
};
use crate::texture::{Texture, TextureWrap, MAX_TEXTURE_UNITS};
use crate::texture_cache::TextureCache;

/// One consistent copy of every state group the fragment loop consumes,
/// refreshed from the worker's snapshots at tile-job start.
struct FragmentState {
    env: [TextureEnvState; MAX_TEXTURE_UNITS],
    texturing: bool,
    blend_on: bool,
    blend: BlendState,
    depth_on: bool,
    depth_func: CompareFunc,
    stencil_on: bool,
    stencil: StencilState,
    fog: FogState,
    alpha_test: AlphaTestState,
    scissor_on: bool,
    scissor: ScissorState,
    masks: MaskState,
}

pub(crate) fn process(core: &Arc<Core>, wcx: &mut WorkerContext, mut job: Box<FragmentTileJob>) {
    let Some(fb) = job.fb.take() else {
        job.reset();
        core.pools.fragment_tile.release(job);
        return;
    };

    let context = &core.context;
    let state = FragmentState {
        env: std::array::from_fn(|i| *wcx.frag.texture_env[i].refresh(&context.texture_env[i])),
        texturing: context.texture_2d.get(),
        blend_on: context.blend_enabled.get(),
        blend: *wcx.frag.blend.refresh(&context.blend),
        depth_on: context.depth_test.get(),
        depth_func: wcx.frag.depth.refresh(&context.depth).func,
        stencil_on: context.stencil_test.get(),
        stencil: *wcx.frag.stencil.refresh(&context.stencil),
        fog: *wcx.frag.fog.refresh(&context.fog),
        alpha_test: *wcx.frag.alpha_test.refresh(&context.alpha_test),
        scissor_on: context.scissor_test.get(),
        scissor: *wcx.frag.scissor.refresh(&context.scissor),
        masks: *wcx.frag.masks.refresh(&context.masks),
    };

    // Resolve bound textures once per tile job. A texture deleted while this
    // job was in flight resolves to `None` and samples as transparent black.
    let textures: [Option<Arc<Texture>>; MAX_TEXTURE_UNITS] = std::array::from_fn(|i| {
        if state.texturing {
            context.find_texture(state.env[i].bound_texture)
        } else {
            None
        }
    });
    for texture in textures.iter().flatten() {
        texture.active.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    let mut scope = fb.enter_tile(job.x0, job.y0, job.x1, job.y1);
    for y in job.y0..=job.y1 {
        for x in job.x0..=job.x1 {
            if !job.sprite_mode && !covered(&job.edges, x as f32 + 0.5, y as f32 + 0.5) {
                continue;
            }
            shade_pixel(
                core.uv_mode,
                &mut wcx.texture_cache,
                &state,
                &textures,
                &job,
                fb.width(),
                fb.height(),
                &mut scope,
                x,
                y,
            );
        }
    }
    drop(scope);
    drop(fb);

    job.reset();
    core.pools.fragment_tile.release(job);
}

#[inline]
fn covered(edges: &[[f32; 3]; 3], x: f32, y: f32) -> bool {
    edges.iter().all(|e| e[0] * x + e[1] * y + e[2] >= 0.0)
}

#[allow(clippy::too_many_arguments)]
fn shade_pixel(
    uv_mode: UvMode,
    cache: &mut TextureCache,
    state: &FragmentState,
    textures: &[Option<Arc<Texture>>; MAX_TEXTURE_UNITS],
    job: &FragmentTileJob,
    fb_width: u32,
    fb_height: u32,
    scope: &mut TileScope<'_>,
    x: u32,
    y: u32,
) {
    if state.scissor_on && !scissor_contains(&state.scissor, x, y) {
        return;
    }

    let mut color = job.color;
    let depth = job.depth;

    for (unit, texture) in textures.iter().enumerate() {
        let Some(texture) = texture else { continue };
        if !texture.has_image() {
            continue;
        }
        let (u, v) = texcoord_at(uv_mode, job, fb_width, fb_height, x, y);
        let texel = sample_texture(cache, texture, fb_width, fb_height, u, v);
        color = match state.env[unit].mode {
            TexEnvMode::Replace => texel,
            TexEnvMode::Modulate => modulate(color, texel),
            TexEnvMode::Add => env_add(color, texel),
        };
    }

    if state.fog.enabled {
        color = apply_fog(&state.fog, color, depth);
    }

    if state.alpha_test.enabled {
        let alpha = ((color >> 24) & 0xFF) as f32 / 255.0;
        if !state.alpha_test.func.passes(alpha, state.alpha_test.reference) {
            return;
        }
    }

    // Stencil test, then the depth test, with the matching stencil side
    // effects on each outcome.
    let stencil_current = scope.stencil(x, y);
    if state.stencil_on {
        let masked_ref = (state.stencil.reference as u32 & state.stencil.value_mask) as f32;
        let masked_cur = (stencil_current as u32 & state.stencil.value_mask) as f32;
        if !state.stencil.func.passes(masked_ref, masked_cur) {
            write_stencil(scope, x, y, &state.stencil, state.stencil.fail_op, stencil_current);
            return;
        }
    }

    if state.depth_on && !state.depth_func.passes(depth, scope.depth(x, y)) {
        if state.stencil_on {
            write_stencil(scope, x, y, &state.stencil, state.stencil.zfail_op, stencil_current);
        }
        return;
    }
    if state.stencil_on {
        write_stencil(scope, x, y, &state.stencil, state.stencil.zpass_op, stencil_current);
    }

    if state.blend_on {
        color = blend(&state.blend, color, scope.color(x, y));
    }

    if state.masks.color.iter().any(|&m| m) {
        let merged = apply_color_mask(&state.masks.color, scope.color(x, y), color);
        scope.set_color(x, y, merged);
    }
    if state.depth_on && state.masks.depth {
        scope.set_depth(x, y, depth);
    }
}

#[inline]
fn scissor_contains(scissor: &ScissorState, x: u32, y: u32) -> bool {
    let (x, y) = (x as i32, y as i32);
    x >= scissor.x
        && y >= scissor.y
        && x < scissor.x + scissor.width
        && y < scissor.y + scissor.height
}

/// Texture coordinates for a pixel: the sprite rectangle in sprite mode, a
/// framebuffer-space mapping by default, or interpolated vertex coordinates
/// in barycentric mode.
fn texcoord_at(
    uv_mode: UvMode,
    job: &FragmentTileJob,
    fb_width: u32,
    fb_height: u32,
    x: u32,
    y: u32,
) -> (f32, f32) {
    if job.sprite_mode {
        let left = job.sprite_cx - job.sprite_size * 0.5;
        let top = job.sprite_cy - job.sprite_size * 0.5;
        return (
            (x as f32 - left) / job.sprite_size,
            (y as f32 - top) / job.sprite_size,
        );
    }
    match uv_mode {
        UvMode::FramebufferSpace => (x as f32 / fb_width as f32, y as f32 / fb_height as f32),
        UvMode::Barycentric => {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let eval = |e: &[f32; 3]| e[0] * px + e[1] * py + e[2];
            // Each vertex weight is the opposite edge's evaluation.
            let w0 = eval(&job.edges[1]);
            let w1 = eval(&job.edges[2]);
            let w2 = eval(&job.edges[0]);
            let total = w0 + w1 + w2;
            if total == 0.0 {
                return (0.0, 0.0);
            }
            let u = (w0 * job.texcoords[0][0] + w1 * job.texcoords[1][0] + w2 * job.texcoords[2][0])
                / total;
            let v = (w0 * job.texcoords[0][1] + w1 * job.texcoords[1][1] + w2 * job.texcoords[2][1])
                / total;
            (u, v)
        }
    }
}

fn sample_texture(
    cache: &mut TextureCache,
    texture: &Texture,
    fb_width: u32,
    fb_height: u32,
    u: f32,
    v: f32,
) -> u32 {
    let u = match texture.wrap_s {
        TextureWrap::Repeat => u - u.floor(),
        TextureWrap::ClampToEdge => u.clamp(0.0, 1.0),
    };
    let v = match texture.wrap_t {
        TextureWrap::Repeat => v - v.floor(),
        TextureWrap::ClampToEdge => v.clamp(0.0, 1.0),
    };

    let mut level = 0usize;
    if texture.min_filter.is_mipmap() {
        let ratio = (texture.level_width(0) as f32 / fb_width as f32)
            .max(texture.level_height(0) as f32 / fb_height as f32);
        let lod = ratio.log2().clamp(0.0, texture.current_level as f32);
        level = lod as usize;
        if texture.levels[level].is_none() {
            level = 0;
        }
    }

    let width = texture.level_width(level);
    let height = texture.level_height(level);
    if width == 0 || height == 0 {
        return 0;
    }
    let tx = u * (width - 1) as f32;
    let ty = v * (height - 1) as f32;

    let linear = texture.min_filter.is_linear() || texture.mag_filter.is_linear();
    if !linear {
        return cache.fetch(texture, level as u32, tx.round() as u32, ty.round() as u32);
    }

    let ix = tx.floor() as u32;
    let iy = ty.floor() as u32;
    let ix1 = (ix + 1).min(width - 1);
    let iy1 = (iy + 1).min(height - 1);
    let fx = tx - tx.floor();
    let fy = ty - ty.floor();

    let c00 = unpack_rgba(cache.fetch(texture, level as u32, ix, iy));
    let c10 = unpack_rgba(cache.fetch(texture, level as u32, ix1, iy));
    let c01 = unpack_rgba(cache.fetch(texture, level as u32, ix, iy1));
    let c11 = unpack_rgba(cache.fetch(texture, level as u32, ix1, iy1));

    let mut blended = [0.0f32; 4];
    for i in 0..4 {
        blended[i] = c00[i] * (1.0 - fx) * (1.0 - fy)
            + c10[i] * fx * (1.0 - fy)
            + c01[i] * (1.0 - fx) * fy
            + c11[i] * fx * fy;
    }
    pack_rgba(blended)
}

/// `Add` environment: RGB sums with saturation, alpha multiplies.
#[inline]
fn env_add(fragment: u32, texel: u32) -> u32 {
    let r = ((fragment >> 16) & 0xFF) + ((texel >> 16) & 0xFF);
    let g = ((fragment >> 8) & 0xFF) + ((texel >> 8) & 0xFF);
    let b = (fragment & 0xFF) + (texel & 0xFF);
    let a = ((fragment >> 24) & 0xFF) * ((texel >> 24) & 0xFF) / 255;
    (a << 24) | (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

fn apply_fog(fog: &FogState, color: u32, depth: f32) -> u32 {
    let factor = match fog.mode {
        FogMode::Linear => {
            if fog.end == fog.start {
                1.0
            } else {
                (fog.end - depth) / (fog.end - fog.start)
            }
        }
        FogMode::Exp => (-fog.density * depth).exp(),
        FogMode::Exp2 => (-(fog.density * fog.density * depth * depth)).exp(),
    }
    .clamp(0.0, 1.0);

    let [r, g, b, a] = unpack_rgba(color);
    pack_rgba([
        fog.color[0] + (r - fog.color[0]) * factor,
        fog.color[1] + (g - fog.color[1]) * factor,
        fog.color[2] + (b - fog.color[2]) * factor,
        a,
    ])
}

fn blend(state: &BlendState, src: u32, dst: u32) -> u32 {
    let s = unpack_rgba(src);
    let d = unpack_rgba(dst);
    let mut out = [0.0f32; 4];
    for i in 0..3 {
        let sf = state.src_factor.expand(s[i], d[i], s[3], d[3]);
        let df = state.dst_factor.expand(s[i], d[i], s[3], d[3]);
        out[i] = (s[i] * sf + d[i] * df).clamp(0.0, 1.0);
    }
    // The alpha channel uses the same factors except that SrcAlphaSaturate
    // contributes one.
    let sa = match state.src_factor {
        BlendFactor::SrcAlphaSaturate => 1.0,
        factor => factor.expand(s[3], d[3], s[3], d[3]),
    };
    let da = state.dst_factor.expand(s[3], d[3], s[3], d[3]);
    out[3] = (s[3] * sa + d[3] * da).clamp(0.0, 1.0);
    pack_rgba(out)
}

fn write_stencil(
    scope: &mut TileScope<'_>,
    x: u32,
    y: u32,
    state: &StencilState,
    op: crate::state::StencilOp,
    current: u8,
) {
    let mask = state.write_mask as u8;
    let updated = op.apply(current, state.reference);
    scope.set_stencil(x, y, (current & !mask) | (updated & mask));
}

#[inline]
fn apply_color_mask(mask: &[bool; 4], old: u32, new: u32) -> u32 {
    if mask.iter().all(|&m| m) {
        return new;
    }
    let channel = |shift: u32, on: bool| -> u32 {
        let source = if on { new } else { old };
        (source >> shift) & 0xFF
    };
    (channel(24, mask[3]) << 24)
        | (channel(16, mask[0]) << 16)
        | (channel(8, mask[1]) << 8)
        | channel(0, mask[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fog_interpolates_toward_the_fog_color() {
        let fog = FogState {
            enabled: true,
            mode: FogMode::Linear,
            density: 1.0,
            start: 0.0,
            end: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
        };
        // At the fog start, the fragment color survives untouched.
        assert_eq!(apply_fog(&fog, 0xFF00_0000, 0.0), 0xFF00_0000);
        // At the fog end, the fragment takes the fog color.
        assert_eq!(apply_fog(&fog, 0xFF00_0000, 1.0), 0xFFFF_FFFF);
    }

    #[test]
    fn standard_alpha_blend_mixes_source_over_destination() {
        let state = BlendState {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
        };
        // Half-transparent white over black.
        let src = pack_rgba([1.0, 1.0, 1.0, 0.5]);
        let dst = pack_rgba([0.0, 0.0, 0.0, 1.0]);
        let [r, g, b, _] = unpack_rgba(blend(&state, src, dst));
        for channel in [r, g, b] {
            assert!((channel - 0.5).abs() < 0.01, "got {channel}");
        }
    }

    #[test]
    fn additive_blend_saturates() {
        let state = BlendState {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::One,
        };
        let src = pack_rgba([0.8, 0.8, 0.8, 1.0]);
        let dst = pack_rgba([0.6, 0.1, 0.0, 1.0]);
        let [r, g, b, _] = unpack_rgba(blend(&state, src, dst));
        assert_eq!(r, 1.0);
        assert!((g - 0.9).abs() < 0.01);
        assert!((b - 0.8).abs() < 0.01);
    }

    #[test]
    fn color_mask_preserves_disabled_channels() {
        let merged = apply_color_mask(&[true, false, true, false], 0xAA11_2233, 0xBB44_5566);
        assert_eq!(merged, 0xAA44_2266);
    }

    #[test]
    fn env_add_saturates_rgb_and_multiplies_alpha() {
        let out = env_add(0xFF80_8080, 0xFFA0_A0A0);
        assert_eq!(out, 0xFFFF_FFFF.min(out));
        assert_eq!(out & 0x00FF_FFFF, 0x00FF_FFFF);

        let half_alpha = env_add(0x8000_0000, 0x8000_0000);
        assert_eq!(half_alpha >> 24, 0x80 * 0x80 / 255);
    }
}
