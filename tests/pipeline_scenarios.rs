//! End-to-end pipeline tests driving the public renderer: clears, draws,
//! texturing, blending, fog and the concurrency guarantees of the depth test.

use tessera::{
    ArrayData, BlendFactor, Cap, ClearMask, ClientArray, CompareFunc, DrawMode, FogMode, Renderer,
    RendererConfig,
};
use tessera_test_scenes::{
    build_depth_overlap_scene, build_textured_quad_scene, build_triangle_scene, check_pixels,
    DEPTH_CANVAS, TEXTURE_CANVAS, TRIANGLE_CANVAS,
};

fn assert_scene(renderer: &mut Renderer, size: (u32, u32), expectations: &[tessera_test_scenes::PixelExpectation]) {
    renderer.finish();
    let pixels = renderer.read_pixels(0, 0, size.0, size.1);
    let failures = check_pixels(&pixels, size.0, size.1, expectations);
    assert!(
        failures.is_empty(),
        "{} pixel expectation(s) failed:\n{}",
        failures.len(),
        failures.join("\n"),
    );
}

#[test]
fn clear_color_then_read_pixels_returns_the_clear_bytes() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear_color(0.0, 1.0, 0.0, 1.0);
    renderer.clear(ClearMask::COLOR);

    let pixels = renderer.read_pixels(0, 0, 4, 4);
    assert_eq!(pixels.len(), 64);
    for group in pixels.chunks_exact(4) {
        assert_eq!(group, &[0x00, 0xFF, 0x00, 0xFF]);
    }
}

#[test]
fn triangle_fill_covers_inside_and_leaves_outside_black() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut renderer = Renderer::new(TRIANGLE_CANVAS).unwrap();
    let expectations = build_triangle_scene(&mut renderer);
    assert_scene(&mut renderer, TRIANGLE_CANVAS, &expectations);
}

#[test]
fn two_by_two_texture_replicates_across_pixel_blocks() {
    let mut renderer = Renderer::new(TEXTURE_CANVAS).unwrap();
    let expectations = build_textured_quad_scene(&mut renderer);
    assert_scene(&mut renderer, TEXTURE_CANVAS, &expectations);
}

#[test]
fn texture_sampling_is_deterministic_across_repeated_draws() {
    let mut renderer = Renderer::new(TEXTURE_CANVAS).unwrap();
    let expectations = build_textured_quad_scene(&mut renderer);
    renderer.finish();
    let reference = renderer.read_pixels(0, 0, TEXTURE_CANVAS.0, TEXTURE_CANVAS.1);

    // Re-drawing the same scene must produce identical bytes every time,
    // regardless of which worker samples which tile.
    for round in 0..20 {
        renderer.clear(ClearMask::ALL);
        renderer.draw_arrays(DrawMode::Triangles, 0, 6);
        renderer.finish();
        let pixels = renderer.read_pixels(0, 0, TEXTURE_CANVAS.0, TEXTURE_CANVAS.1);
        assert_eq!(pixels, reference, "round {round} diverged");
    }
    let _ = expectations;
}

#[test]
fn overlapping_triangles_always_resolve_to_the_nearer_depth() {
    let mut renderer = Renderer::new(DEPTH_CANVAS).unwrap();
    for _ in 0..100 {
        let expectations = build_depth_overlap_scene(&mut renderer);
        assert_scene(&mut renderer, DEPTH_CANVAS, &expectations);
    }
}

#[test]
fn triangle_strip_and_fan_cover_the_same_quad() {
    for mode in [DrawMode::TriangleStrip, DrawMode::TriangleFan] {
        let mut renderer = Renderer::new((4, 4)).unwrap();
        renderer.clear(ClearMask::ALL);
        renderer.enable_client_state(ClientArray::Vertex);
        renderer.color4(1.0, 1.0, 0.0, 1.0);

        let positions: [f32; 12] = match mode {
            // Strip order: the two triangles share the middle edge.
            DrawMode::TriangleStrip => [
                0.0, 0.0, 0.5, //
                4.0, 0.0, 0.5, //
                0.0, 4.0, 0.5, //
                4.0, 4.0, 0.5,
            ],
            _ => [
                0.0, 0.0, 0.5, //
                4.0, 0.0, 0.5, //
                4.0, 4.0, 0.5, //
                0.0, 4.0, 0.5,
            ],
        };
        renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
        renderer.draw_arrays(mode, 0, 4);
        renderer.finish();

        let pixels = renderer.read_pixels(0, 0, 4, 4);
        for (i, group) in pixels.chunks_exact(4).enumerate() {
            assert_eq!(
                group,
                &[0xFF, 0xFF, 0x00, 0xFF],
                "{mode:?} left pixel {i} uncovered",
            );
        }
    }
}

#[test]
fn point_sprite_fills_a_square_around_its_center() {
    let mut renderer = Renderer::new((8, 8)).unwrap();
    renderer.clear(ClearMask::ALL);
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.point_size(4.0);
    renderer.color4(0.0, 1.0, 0.0, 1.0);

    let position: [f32; 3] = [4.0, 4.0, 0.5];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&position));
    renderer.draw_arrays(DrawMode::Points, 0, 1);
    renderer.finish();

    let pixels = renderer.read_pixels(0, 0, 8, 8);
    let pixel = |x: usize, y: usize| &pixels[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
    assert_eq!(pixel(3, 3), &[0x00, 0xFF, 0x00, 0xFF]);
    assert_eq!(pixel(4, 4), &[0x00, 0xFF, 0x00, 0xFF]);
    assert_eq!(pixel(0, 0), &[0x00, 0x00, 0x00, 0xFF]);
    assert_eq!(pixel(7, 7), &[0x00, 0x00, 0x00, 0xFF]);
}

#[test]
fn alpha_blending_mixes_source_over_destination() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear_color(1.0, 0.0, 0.0, 1.0);
    renderer.clear(ClearMask::ALL);

    renderer.enable(Cap::Blend);
    renderer.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.color4(1.0, 1.0, 1.0, 0.5);

    let positions: [f32; 9] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);
    renderer.finish();

    let pixels = renderer.read_pixels(0, 0, 4, 4);
    let pixel = &pixels[0..4];
    assert_eq!(pixel[0], 0xFF, "red stays saturated");
    assert!((pixel[1] as i16 - 0x80).abs() <= 2, "green mixes to half");
    assert!((pixel[2] as i16 - 0x80).abs() <= 2, "blue mixes to half");
}

#[test]
fn linear_fog_replaces_distant_fragments_with_the_fog_color() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear(ClearMask::ALL);

    renderer.enable(Cap::Fog);
    renderer.fog_mode(FogMode::Linear);
    renderer.fog_range(0.0, 0.5);
    renderer.fog_color([0.0, 0.0, 1.0, 1.0]);

    renderer.enable_client_state(ClientArray::Vertex);
    renderer.color4(1.0, 0.0, 0.0, 1.0);
    let positions: [f32; 9] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);
    renderer.finish();

    // Depth 0.5 is at the fog end: the fragment takes the fog color.
    let pixels = renderer.read_pixels(0, 0, 4, 4);
    assert_eq!(&pixels[0..4], &[0x00, 0x00, 0xFF, 0xFF]);
}

#[test]
fn alpha_test_discards_failing_fragments() {
    let mut renderer = Renderer::new((4, 4)).unwrap();
    renderer.clear(ClearMask::ALL);

    renderer.enable(Cap::AlphaTest);
    renderer.alpha_func(CompareFunc::Greater, 0.5);
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.color4(1.0, 1.0, 1.0, 0.25);

    let positions: [f32; 9] = [
        0.0, 0.0, 0.5, //
        4.0, 0.0, 0.5, //
        0.0, 4.0, 0.5,
    ];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 3);
    renderer.finish();

    // Every fragment fails the alpha test, so the canvas stays black.
    let pixels = renderer.read_pixels(0, 0, 4, 4);
    for group in pixels.chunks_exact(4) {
        assert_eq!(group, &[0x00, 0x00, 0x00, 0xFF]);
    }
}

#[test]
fn scissor_test_confines_drawing_to_the_box() {
    let mut renderer = Renderer::new((8, 8)).unwrap();
    renderer.clear(ClearMask::ALL);

    renderer.enable(Cap::ScissorTest);
    renderer.scissor(0, 0, 4, 4);
    renderer.enable_client_state(ClientArray::Vertex);
    renderer.color4(1.0, 1.0, 1.0, 1.0);

    let positions: [f32; 18] = [
        0.0, 0.0, 0.5, //
        8.0, 0.0, 0.5, //
        8.0, 8.0, 0.5, //
        0.0, 0.0, 0.5, //
        8.0, 8.0, 0.5, //
        0.0, 8.0, 0.5,
    ];
    renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
    renderer.draw_arrays(DrawMode::Triangles, 0, 6);
    renderer.finish();

    let pixels = renderer.read_pixels(0, 0, 8, 8);
    let pixel = |x: usize, y: usize| &pixels[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
    assert_eq!(pixel(2, 2), &[0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(pixel(6, 6), &[0x00, 0x00, 0x00, 0xFF]);
    assert_eq!(pixel(6, 2), &[0x00, 0x00, 0x00, 0xFF]);
}

#[test]
fn draws_land_identically_with_one_worker_and_many() {
    let mut reference: Option<Vec<u8>> = None;
    for threads in [1usize, 4] {
        let config = RendererConfig::new().with_threads(threads).unwrap();
        let mut renderer = Renderer::with_config(TRIANGLE_CANVAS, config).unwrap();
        let expectations = build_triangle_scene(&mut renderer);
        renderer.finish();
        let pixels = renderer.read_pixels(0, 0, TRIANGLE_CANVAS.0, TRIANGLE_CANVAS.1);
        let failures = check_pixels(&pixels, TRIANGLE_CANVAS.0, TRIANGLE_CANVAS.1, &expectations);
        assert!(failures.is_empty(), "{failures:?}");
        match &reference {
            Some(expected) => assert_eq!(&pixels, expected),
            None => reference = Some(pixels),
        }
    }
}
