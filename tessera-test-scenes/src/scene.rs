//! Shared scenes used by the integration tests: each builder issues the draw
//! calls on the given renderer and returns the pixel expectations that must
//! hold once the renderer has finished.

use tessera::{
    ArrayData, Cap, ClearMask, ClientArray, DrawMode, Renderer, TexEnvMode, TexParameter,
    TextureFilter, TextureFormat, TextureTarget, TextureWrap,
};

use crate::expectations::PixelExpectation;

pub const TRIANGLE_CANVAS: (u32, u32) = (8, 8);
pub const TEXTURE_CANVAS: (u32, u32) = (4, 4);
pub const DEPTH_CANVAS: (u32, u32) = (4, 4);

/// A single red triangle whose vertices land on (0,0), (7,0) and (0,7) of an
/// 8x8 canvas cleared to black.
pub fn build_triangle_scene(renderer: &mut Renderer) -> Vec<PixelExpectation> {
    renderer.clear_color(0.0, 0.0, 0.0, 1.0);
    renderer.clear(ClearMask::ALL);

    let positions: [f32; 9] = [
        0.0, 0.0, 0.5, //
        7.0, 0.0, 0.5, //
        0.0, 7.0, 0.5,
    ];
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.color4(1.0, 0.0, 0.0, 1.0);
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);

    vec![
        PixelExpectation::opaque(0, 0, 255, 0, 0, "corner inside the triangle"),
        PixelExpectation::opaque(2, 2, 255, 0, 0, "interior"),
        PixelExpectation::opaque(6, 0, 255, 0, 0, "bottom edge"),
        PixelExpectation::opaque(7, 7, 0, 0, 0, "opposite corner stays background"),
        PixelExpectation::opaque(7, 1, 0, 0, 0, "outside the hypotenuse"),
    ]
}

/// A 2x2 nearest-filtered texture (red, green / blue, white) drawn as a
/// full-canvas quad onto a 4x4 framebuffer; every texel covers a 2x2 pixel
/// block.
pub fn build_textured_quad_scene(renderer: &mut Renderer) -> Vec<PixelExpectation> {
    renderer.clear_color(0.0, 0.0, 0.0, 1.0);
    renderer.clear(ClearMask::ALL);

    let texels: [u8; 16] = [
        255, 0, 0, 255, // red
        0, 255, 0, 255, // green
        0, 0, 255, 255, // blue
        255, 255, 255, 255, // white
    ];
    let id = renderer.gen_textures(1)[0];
    renderer.bind_texture(TextureTarget::Texture2d, id);
    renderer.tex_image_2d(0, TextureFormat::Rgba8, 2, 2, TextureFormat::Rgba8, &texels);
    renderer.tex_parameter(TexParameter::MinFilter(TextureFilter::Nearest));
    renderer.tex_parameter(TexParameter::MagFilter(TextureFilter::Nearest));
    renderer.tex_parameter(TexParameter::WrapS(TextureWrap::ClampToEdge));
    renderer.tex_parameter(TexParameter::WrapT(TextureWrap::ClampToEdge));
    renderer.tex_env_mode(TexEnvMode::Replace);
    renderer.enable(Cap::Texture2d);

    // Two counter-clockwise triangles covering the whole canvas.
    let positions: [f32; 18] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        4.0, 4.0, 0.5, //
        0.0, 0.0, 0.5, //
        4.0, 4.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 6);

    vec![
        PixelExpectation::opaque(0, 0, 255, 0, 0, "upper-left block is red"),
        PixelExpectation::opaque(1, 1, 255, 0, 0, "upper-left block is red"),
        PixelExpectation::opaque(2, 0, 0, 255, 0, "upper-right block is green"),
        PixelExpectation::opaque(3, 1, 0, 255, 0, "upper-right block is green"),
        PixelExpectation::opaque(0, 2, 0, 0, 255, "lower-left block is blue"),
        PixelExpectation::opaque(1, 3, 0, 0, 255, "lower-left block is blue"),
        PixelExpectation::opaque(2, 2, 255, 255, 255, "lower-right block is white"),
        PixelExpectation::opaque(3, 3, 255, 255, 255, "lower-right block is white"),
    ]
}

/// Two overlapping full-canvas triangles at depths 0.2 (cyan) and 0.8
/// (magenta); the depth test must resolve every covered pixel to the nearer
/// triangle no matter how the tile jobs interleave.
pub fn build_depth_overlap_scene(renderer: &mut Renderer) -> Vec<PixelExpectation> {
    renderer.clear_color(0.0, 0.0, 0.0, 1.0);
    renderer.clear(ClearMask::ALL);
    renderer.enable_client_state(ClientArray::Vertex);

    let near: [f32; 9] = [
        0.0, 0.0, 0.2, //
        4.0, 0.0, 0.2, //
        0.0, 4.0, 0.2,
    ];
    let far: [f32; 9] = [
        0.0, 0.0, 0.8, //
        4.0, 0.0, 0.8, //
        0.0, 4.0, 0.8,
    ];

    renderer.color4(0.0, 1.0, 1.0, 1.0);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&near));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);

    renderer.color4(1.0, 0.0, 1.0, 1.0);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&far));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);

    vec![
        PixelExpectation::opaque(0, 0, 0, 255, 255, "overlap resolves to the nearer color"),
        PixelExpectation::opaque(1, 1, 0, 255, 255, "overlap resolves to the nearer color"),
    ]
}
