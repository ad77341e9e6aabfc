pub mod expectations;
pub mod scene;

pub use expectations::{check_pixels, PixelExpectation};
pub use scene::{
    build_depth_overlap_scene, build_textured_quad_scene, build_triangle_scene, DEPTH_CANVAS,
    TEXTURE_CANVAS, TRIANGLE_CANVAS,
};
