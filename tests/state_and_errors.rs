//! State machine and error semantics: matrix stacks, sticky errors,
//! capability toggles, registries and shutdown accounting.

use tessera::{
    ArrayData, Cap, ClearMask, ClientArray, DrawMode, GlError, MatrixMode, Renderer,
    TexParameter, TextureFilter, TextureFormat, TextureTarget,
};

#[test]
fn thirty_third_push_records_stack_overflow_and_clears_on_read() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.matrix_mode(MatrixMode::Modelview);
    for _ in 0..32 {
        renderer.push_matrix();
        assert_eq!(renderer.get_error(), None);
    }
    renderer.push_matrix();
    assert_eq!(renderer.get_error(), Some(GlError::StackOverflow));
    assert_eq!(renderer.get_error(), None);
}

#[test]
fn push_pop_balanced_sequences_restore_the_matrix_bitwise() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.translate(1.0, 2.0, 3.0);
    renderer.rotate(37.5, 0.0, 0.0, 1.0);
    let before = renderer.get_matrix(MatrixMode::Modelview);

    renderer.push_matrix();
    renderer.scale(9.0, 9.0, 9.0);
    renderer.translate(-4.0, 0.0, 0.0);
    renderer.pop_matrix();

    assert_eq!(renderer.get_matrix(MatrixMode::Modelview), before);
}

#[test]
fn matrix_transform_matches_the_mathematical_product() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.load_identity();
    renderer.translate(2.0, 0.0, 0.0);
    renderer.scale(3.0, 3.0, 1.0);

    let m = tessera::Mat4::from_column_major(renderer.get_matrix(MatrixMode::Modelview));
    let out = m.transform_vec4([1.0, 1.0, 0.0, 1.0]);
    for (actual, expected) in out.iter().zip([5.0, 3.0, 0.0, 1.0]) {
        assert!((actual - expected).abs() <= 1e-5);
    }
}

#[test]
fn enable_disable_round_trip_reports_disabled() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    for cap in [Cap::Blend, Cap::Fog, Cap::ScissorTest, Cap::Lighting] {
        renderer.enable(cap);
        assert!(renderer.is_enabled(cap));
        renderer.disable(cap);
        assert!(!renderer.is_enabled(cap), "{cap:?}");
    }
}

#[test]
fn gen_then_delete_textures_leaves_the_table_unchanged() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    let before = renderer.context().texture_count();
    let ids = renderer.gen_textures(4);
    renderer.delete_textures(&ids);
    assert_eq!(renderer.context().texture_count(), before);
    assert_eq!(renderer.get_error(), None);
}

#[test]
fn draw_with_zero_count_is_a_no_op_without_error() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&[0.0; 9]));
    renderer.draw_arrays(DrawMode::Triangles, 0, 0);
    renderer.finish();
    assert_eq!(renderer.get_error(), None);
}

#[test]
fn draw_without_an_enabled_vertex_array_records_invalid_operation() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);
    assert_eq!(renderer.get_error(), Some(GlError::InvalidOperation));
}

#[test]
fn negative_draw_arguments_record_invalid_value() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.draw_arrays(DrawMode::Triangles, -1, 3);
    assert_eq!(renderer.get_error(), Some(GlError::InvalidValue));
    renderer.draw_arrays(DrawMode::Triangles, 0, -3);
    assert_eq!(renderer.get_error(), Some(GlError::InvalidValue));
}

#[test]
fn equal_texture_and_framebuffer_sizes_select_mip_level_zero() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear(ClearMask::ALL);

    let id = renderer.gen_textures(1)[0];
    renderer.bind_texture(TextureTarget::Texture2d, id);
    // Level 0 is solid red, level 1 solid green.
    let level0: Vec<u8> = [255, 0, 0, 255].repeat(16);
    let level1: Vec<u8> = [0, 255, 0, 255].repeat(4);
    renderer.tex_image_2d(0, TextureFormat::Rgba8, 4, 4, TextureFormat::Rgba8, &level0);
    renderer.tex_image_2d(1, TextureFormat::Rgba8, 2, 2, TextureFormat::Rgba8, &level1);
    renderer.tex_parameter(TexParameter::MinFilter(TextureFilter::NearestMipmapNearest));
    renderer.tex_parameter(TexParameter::MagFilter(TextureFilter::Nearest));
    renderer.tex_env_mode(tessera::TexEnvMode::Replace);
    renderer.enable(Cap::Texture2d);

    renderer.enable_client_state(ClientArray::Vertex);
    let positions: [f32; 18] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        4.0, 4.0, 0.5, //
        0.0, 0.0, 0.5, //
        4.0, 4.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 6);
    renderer.finish();

    // Texture and framebuffer are both 4x4, so the ratio is 1 and level 0
    // (red) wins.
    let pixels = renderer.read_pixels(0, 0, 4, 4);
    assert_eq!(&pixels[0..4], &[0xFF, 0x00, 0x00, 0xFF]);
}

#[test]
fn deleted_texture_samples_as_transparent_black() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear_color(1.0, 1.0, 0.0, 1.0);
    renderer.clear(ClearMask::ALL);

    let id = renderer.gen_textures(1)[0];
    renderer.bind_texture(TextureTarget::Texture2d, id);
    renderer.tex_image_2d(
        0,
        TextureFormat::Rgba8,
        1,
        1,
        TextureFormat::Rgba8,
        &[255, 0, 0, 255],
    );
    renderer.tex_env_mode(tessera::TexEnvMode::Replace);
    renderer.enable(Cap::Texture2d);
    renderer.delete_textures(&[id]);

    renderer.enable_client_state(ClientArray::Vertex);
    renderer.disable(Cap::DepthTest);
    let positions: [f32; 9] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.color4(0.0, 0.0, 1.0, 1.0);
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);
    renderer.finish();

    // The binding was dropped with the texture, so the draw lands untextured
    // with the vertex color.
    let pixels = renderer.read_pixels(0, 0, 4, 4);
    assert_eq!(&pixels[0..4], &[0x00, 0x00, 0xFF, 0xFF]);
}

#[test]
fn fixed_point_entry_points_match_their_float_twins() {
    let mut float_renderer = Renderer::new((4, 4)).unwrap();
    let mut fixed_renderer = Renderer::new((4, 4)).unwrap();

    float_renderer.translate(1.0, -2.0, 0.5);
    fixed_renderer.translate_fixed(
        tessera::to_fixed(1.0),
        tessera::to_fixed(-2.0),
        tessera::to_fixed(0.5),
    );

    let a = float_renderer.get_matrix(MatrixMode::Modelview);
    let b = fixed_renderer.get_matrix(MatrixMode::Modelview);
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1.0 / 65536.0);
    }
}

#[test]
fn all_tracked_memory_is_released_when_the_renderer_drops() {
    let tracker = {
        let mut renderer = Renderer::new((32, 32)).unwrap();
        renderer.clear(ClearMask::ALL);

        let id = renderer.gen_textures(1)[0];
        renderer.bind_texture(TextureTarget::Texture2d, id);
        renderer.tex_image_2d(
            0,
            TextureFormat::Rgba8,
            2,
            2,
            TextureFormat::Rgba8,
            &[128; 16],
        );

        renderer.enable_client_state(ClientArray::Vertex);
        let positions: [f32; 9] = [
            0.0, 0.0, 0.5, //
            32.0, 0.0, 0.5, //
            0.0, 32.0, 0.5,
        ];
        renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
        renderer.draw_arrays(DrawMode::Triangles, 0, 3);
        renderer.finish();

        renderer.memory_tracker()
        // Renderer drops here: context, pools and framebuffer tear down.
    };
    assert_eq!(tracker.current_usage(), 0);
    assert_eq!(tracker.report(), 0);
    assert!(tracker.peak_usage() > 0);
}

#[test]
fn finish_timeout_succeeds_on_a_quiet_renderer() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    assert!(renderer.finish_timeout(std::time::Duration::from_secs(1)));
}
