//! Matrix mode and the transform entry points.

use super::Renderer;
use crate::error::GlError;
use crate::math::Mat4;
use crate::state::MatrixMode;

impl Renderer {
    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.matrix_mode = mode;
    }

    pub fn load_identity(&mut self) {
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current = Mat4::identity());
    }

    /// Loads a column-major 16-float matrix.
    pub fn load_matrix(&mut self, values: &[f32; 16]) {
        let matrix = Mat4::from_column_major(*values);
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current = matrix);
    }

    pub fn mult_matrix(&mut self, values: &[f32; 16]) {
        let matrix = Mat4::from_column_major(*values);
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current = stack.current.multiply(&matrix));
    }

    pub fn push_matrix(&mut self) {
        self.context().push_matrix(self.matrix_mode);
    }

    pub fn pop_matrix(&mut self) {
        self.context().pop_matrix(self.matrix_mode);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current.translate(x, y, z));
    }

    pub fn rotate(&mut self, angle_deg: f32, x: f32, y: f32, z: f32) {
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current.rotate(angle_deg, x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current.scale(x, y, z));
    }

    pub fn frustum(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        if near <= 0.0 || far <= 0.0 || left == right || bottom == top || near == far {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        let frustum = Mat4::frustum(left, right, bottom, top, near, far);
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current = stack.current.multiply(&frustum));
    }

    pub fn ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        if left == right || bottom == top || near == far {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        let ortho = Mat4::ortho(left, right, bottom, top, near, far);
        self.context()
            .matrix_stack(self.matrix_mode)
            .modify(|stack| stack.current = stack.current.multiply(&ortho));
    }

    /// Reads back the current matrix of `mode` in column-major order.
    pub fn get_matrix(&self, mode: MatrixMode) -> [f32; 16] {
        self.context().current_matrix(mode).data
    }
}
