//! Buffer objects and client vertex arrays.
//!
//! A `*_pointer` call latches the current array-buffer binding, exactly like
//! the C API: with a buffer bound the data argument is a byte offset into
//! that buffer's storage, otherwise the client data is copied into an
//! immutable snapshot the draw expansion reads later.

use std::sync::Arc;

use super::drawing::ArrayData;
use super::Renderer;
use crate::context::BufferUsage;
use crate::error::GlError;
use crate::snapshot::Versioned;
use crate::state::{ArraySource, ArrayState, ArrayType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientArray {
    Vertex,
    Color,
    Normal,
    TexCoord,
}

impl Renderer {
    pub fn gen_buffers(&mut self, n: usize) -> Vec<u32> {
        self.context().gen_buffers(n)
    }

    pub fn bind_buffer(&mut self, target: BufferTarget, id: u32) {
        if id != 0 && self.context().find_buffer(id).is_none() {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        match target {
            BufferTarget::Array => self.array_buffer_binding = id,
            BufferTarget::ElementArray => self.element_array_buffer_binding = id,
        }
    }

    pub fn delete_buffers(&mut self, ids: &[u32]) {
        self.context().delete_buffers(ids);
        if ids.contains(&self.array_buffer_binding) {
            self.array_buffer_binding = 0;
        }
        if ids.contains(&self.element_array_buffer_binding) {
            self.element_array_buffer_binding = 0;
        }
    }

    pub fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let id = self.binding(target);
        if id == 0 {
            self.context().record_error(GlError::InvalidOperation);
            return;
        }
        if let Err(e) = self.context().buffer_data(id, data, usage) {
            self.context().record_error(e);
        }
    }

    pub fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let id = self.binding(target);
        if id == 0 {
            self.context().record_error(GlError::InvalidOperation);
            return;
        }
        if let Err(e) = self.context().buffer_sub_data(id, offset, data) {
            self.context().record_error(e);
        }
    }

    pub(super) fn binding(&self, target: BufferTarget) -> u32 {
        match target {
            BufferTarget::Array => self.array_buffer_binding,
            BufferTarget::ElementArray => self.element_array_buffer_binding,
        }
    }

    pub fn enable_client_state(&mut self, array: ClientArray) {
        self.client_array(array).modify(|state| state.enabled = true);
    }

    pub fn disable_client_state(&mut self, array: ClientArray) {
        self.client_array(array).modify(|state| state.enabled = false);
    }

    fn client_array(&self, array: ClientArray) -> &Versioned<ArrayState> {
        let context = self.context();
        match array {
            ClientArray::Vertex => &context.vertex_array,
            ClientArray::Color => &context.color_array,
            ClientArray::Normal => &context.normal_array,
            ClientArray::TexCoord => &context.texcoord_array,
        }
    }

    pub fn vertex_pointer(&mut self, size: usize, stride: usize, data: ArrayData<'_>) {
        if !(2..=4).contains(&size) {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.set_pointer(ClientArray::Vertex, size, ArrayType::Float, stride, data);
    }

    pub fn color_pointer(&mut self, size: usize, ty: ArrayType, stride: usize, data: ArrayData<'_>) {
        if size != 3 && size != 4 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        self.set_pointer(ClientArray::Color, size, ty, stride, data);
    }

    pub fn normal_pointer(&mut self, stride: usize, data: ArrayData<'_>) {
        self.set_pointer(ClientArray::Normal, 3, ArrayType::Float, stride, data);
    }

    pub fn tex_coord_pointer(&mut self, size: usize, stride: usize, data: ArrayData<'_>) {
        if !(2..=4).contains(&size) {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        if self.client_active_texture != 0 {
            log::debug!("texcoord arrays are captured for unit 0 only");
        }
        self.set_pointer(ClientArray::TexCoord, size, ArrayType::Float, stride, data);
    }

    fn set_pointer(
        &mut self,
        array: ClientArray,
        size: usize,
        ty: ArrayType,
        stride: usize,
        data: ArrayData<'_>,
    ) {
        let source = match (self.array_buffer_binding, data) {
            (0, ArrayData::Floats(values)) => {
                ArraySource::Client(Arc::from(bytemuck::cast_slice::<f32, u8>(values)))
            }
            (0, ArrayData::Bytes(bytes)) => ArraySource::Client(Arc::from(bytes)),
            (0, ArrayData::BufferOffset(_)) => {
                self.context().record_error(GlError::InvalidOperation);
                return;
            }
            (buffer, ArrayData::BufferOffset(offset)) => ArraySource::Buffer { buffer, offset },
            (_, _) => {
                // Client data while a buffer is bound: the binding wins in
                // the C API, so reject the ambiguous call outright.
                self.context().record_error(GlError::InvalidOperation);
                return;
            }
        };
        self.client_array(array).modify(|state| {
            state.size = size;
            state.ty = ty;
            state.stride = stride;
            state.source = source;
        });
    }
}
