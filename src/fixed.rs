//! 16.16 fixed-point entry points.
//!
//! The fixed-point API surface is a thin veneer: every `*_fixed` method
//! converts its arguments inline and routes to the float implementation, so
//! the two surfaces can never drift apart.

use crate::renderer::Renderer;
use crate::state::CompareFunc;

/// A 16.16 fixed-point value.
pub type Fixed = i32;

pub const FIXED_ONE: Fixed = 1 << 16;

#[inline]
pub fn from_fixed(value: Fixed) -> f32 {
    value as f32 / 65536.0
}

#[inline]
pub fn to_fixed(value: f32) -> Fixed {
    (value * 65536.0) as Fixed
}

impl Renderer {
    pub fn translate_fixed(&mut self, x: Fixed, y: Fixed, z: Fixed) {
        self.translate(from_fixed(x), from_fixed(y), from_fixed(z));
    }

    pub fn rotate_fixed(&mut self, angle: Fixed, x: Fixed, y: Fixed, z: Fixed) {
        self.rotate(from_fixed(angle), from_fixed(x), from_fixed(y), from_fixed(z));
    }

    pub fn scale_fixed(&mut self, x: Fixed, y: Fixed, z: Fixed) {
        self.scale(from_fixed(x), from_fixed(y), from_fixed(z));
    }

    pub fn frustum_fixed(
        &mut self,
        left: Fixed,
        right: Fixed,
        bottom: Fixed,
        top: Fixed,
        near: Fixed,
        far: Fixed,
    ) {
        self.frustum(
            from_fixed(left),
            from_fixed(right),
            from_fixed(bottom),
            from_fixed(top),
            from_fixed(near),
            from_fixed(far),
        );
    }

    pub fn ortho_fixed(
        &mut self,
        left: Fixed,
        right: Fixed,
        bottom: Fixed,
        top: Fixed,
        near: Fixed,
        far: Fixed,
    ) {
        self.ortho(
            from_fixed(left),
            from_fixed(right),
            from_fixed(bottom),
            from_fixed(top),
            from_fixed(near),
            from_fixed(far),
        );
    }

    pub fn load_matrix_fixed(&mut self, values: &[Fixed; 16]) {
        self.load_matrix(&values.map(from_fixed));
    }

    pub fn mult_matrix_fixed(&mut self, values: &[Fixed; 16]) {
        self.mult_matrix(&values.map(from_fixed));
    }

    pub fn color4_fixed(&mut self, r: Fixed, g: Fixed, b: Fixed, a: Fixed) {
        self.color4(from_fixed(r), from_fixed(g), from_fixed(b), from_fixed(a));
    }

    pub fn normal3_fixed(&mut self, x: Fixed, y: Fixed, z: Fixed) {
        self.normal3(from_fixed(x), from_fixed(y), from_fixed(z));
    }

    pub fn clear_color_fixed(&mut self, r: Fixed, g: Fixed, b: Fixed, a: Fixed) {
        self.clear_color(from_fixed(r), from_fixed(g), from_fixed(b), from_fixed(a));
    }

    pub fn clear_depth_fixed(&mut self, depth: Fixed) {
        self.clear_depth(from_fixed(depth));
    }

    pub fn alpha_func_fixed(&mut self, func: CompareFunc, reference: Fixed) {
        self.alpha_func(func, from_fixed(reference));
    }

    pub fn fog_density_fixed(&mut self, density: Fixed) {
        self.fog_density(from_fixed(density));
    }

    pub fn point_size_fixed(&mut self, size: Fixed) {
        self.point_size(from_fixed(size));
    }

    pub fn line_width_fixed(&mut self, width: Fixed) {
        self.line_width(from_fixed(width));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_round_trip_integers_exactly() {
        assert_eq!(from_fixed(FIXED_ONE), 1.0);
        assert_eq!(from_fixed(-3 * FIXED_ONE), -3.0);
        assert_eq!(to_fixed(2.0), 2 * FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_ONE / 2);
    }

    #[test]
    fn fractions_survive_within_sixteen_bits() {
        let value = 1.25f32;
        assert!((from_fixed(to_fixed(value)) - value).abs() < 1.0 / 65536.0);
    }
}
