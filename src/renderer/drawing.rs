//! Draw expansion: the front-end that turns array draws into pipeline jobs.
//!
//! Gathering happens on the API thread at draw-call time, so the jobs carry
//! vertex values rather than pointers; the recorded tasks then flow through
//! the command ring to the scheduler on flush.

use std::sync::Arc;

use super::Renderer;
use crate::error::GlError;
use crate::framebuffer::Framebuffer;
use crate::scheduler::Task;
use crate::stage::StageTag;
use crate::state::{ArraySource, ArrayState, ArrayType, DrawMode};
use crate::vertex::Vertex;

/// Client data handed to a `*_pointer` call: values to copy, or a byte
/// offset into the bound array buffer.
#[derive(Debug, Clone, Copy)]
pub enum ArrayData<'a> {
    Floats(&'a [f32]),
    Bytes(&'a [u8]),
    BufferOffset(usize),
}

/// Index data handed to `draw_elements`; buffer variants carry a byte offset
/// into the bound element-array buffer.
#[derive(Debug, Clone, Copy)]
pub enum Indices<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    BufferU8(usize),
    BufferU16(usize),
}

/// Which planes a [`Renderer::clear`] touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
        stencil: false,
    };
    pub const DEPTH: Self = Self {
        color: false,
        depth: true,
        stencil: false,
    };
    pub const STENCIL: Self = Self {
        color: false,
        depth: false,
        stencil: true,
    };
    pub const ALL: Self = Self {
        color: true,
        depth: true,
        stencil: true,
    };
}

/// A client array resolved to concrete bytes for the duration of one draw.
struct ResolvedArray {
    data: Arc<[u8]>,
    offset: usize,
    size: usize,
    ty: ArrayType,
    stride: usize,
}

impl ResolvedArray {
    #[inline]
    fn element_offset(&self, index: usize) -> usize {
        self.offset + index * self.stride
    }

    /// Reads up to `n` consecutive floats of element `index`.
    fn read_floats(&self, index: usize, n: usize, out: &mut [f32]) -> Result<(), GlError> {
        let base = self.element_offset(index);
        let end = base + n * 4;
        let bytes = self.data.get(base..end).ok_or(GlError::InvalidValue)?;
        for (i, chunk) in bytes.chunks_exact(4).take(n).enumerate() {
            out[i] = f32::from_ne_bytes(chunk.try_into().unwrap());
        }
        Ok(())
    }

    fn read_unsigned_bytes(&self, index: usize, n: usize, out: &mut [f32]) -> Result<(), GlError> {
        let base = self.element_offset(index);
        let bytes = self.data.get(base..base + n).ok_or(GlError::InvalidValue)?;
        for (i, &b) in bytes.iter().enumerate() {
            out[i] = b as f32 / 255.0;
        }
        Ok(())
    }
}

/// The four client arrays resolved once per draw, plus the latched current
/// attribute values used when an array is disabled.
struct GatheredArrays {
    vertex: ResolvedArray,
    normal: Option<ResolvedArray>,
    color: Option<ResolvedArray>,
    texcoord: Option<ResolvedArray>,
    current_color: [f32; 4],
    current_normal: [f32; 3],
    current_texcoord: [f32; 4],
}

impl Renderer {
    fn resolve_array(&self, state: &ArrayState) -> Result<Option<ResolvedArray>, GlError> {
        if !state.enabled {
            return Ok(None);
        }
        let (data, offset) = match &state.source {
            ArraySource::None => return Err(GlError::InvalidOperation),
            ArraySource::Client(data) => (data.clone(), 0),
            ArraySource::Buffer { buffer, offset } => {
                let object = self
                    .context()
                    .find_buffer(*buffer)
                    .ok_or(GlError::InvalidOperation)?;
                (object.data.clone(), *offset)
            }
        };
        Ok(Some(ResolvedArray {
            data,
            offset,
            size: state.size,
            ty: state.ty,
            stride: state.effective_stride(),
        }))
    }

    fn gather_arrays(&self) -> Result<GatheredArrays, GlError> {
        let context = self.context();
        let vertex = self
            .resolve_array(&context.vertex_array.get())?
            .ok_or(GlError::InvalidOperation)?;
        Ok(GatheredArrays {
            vertex,
            normal: self.resolve_array(&context.normal_array.get())?,
            color: self.resolve_array(&context.color_array.get())?,
            texcoord: self.resolve_array(&context.texcoord_array.get())?,
            current_color: self.current_color,
            current_normal: self.current_normal,
            current_texcoord: self.current_texcoord[0],
        })
    }

    /// Assembles one vertex, applying the attribute defaulting rules:
    /// position pads to `(x, y, 0, 1)`, a three-component color gets alpha 1,
    /// texcoords pad to `(s, t, 0, 1)`, and disabled arrays fall back to the
    /// latched current values.
    fn gather_vertex(&self, arrays: &GatheredArrays, index: usize) -> Result<Vertex, GlError> {
        let mut v = Vertex::default();

        let mut position = [0.0, 0.0, 0.0, 1.0];
        arrays
            .vertex
            .read_floats(index, arrays.vertex.size, &mut position)?;
        v.position = position;

        match &arrays.normal {
            Some(normal) => normal.read_floats(index, 3, &mut v.normal)?,
            None => v.normal = arrays.current_normal,
        }

        match &arrays.color {
            Some(color) => {
                let mut components = [0.0, 0.0, 0.0, 1.0];
                match color.ty {
                    ArrayType::Float => color.read_floats(index, color.size, &mut components)?,
                    ArrayType::UnsignedByte => {
                        color.read_unsigned_bytes(index, color.size, &mut components)?
                    }
                }
                if color.size == 3 {
                    components[3] = 1.0;
                }
                v.color = components;
            }
            None => v.color = arrays.current_color,
        }

        match &arrays.texcoord {
            Some(texcoord) => {
                let mut components = [0.0, 0.0, 0.0, 1.0];
                texcoord.read_floats(index, texcoord.size, &mut components)?;
                v.texcoord = components;
            }
            None => v.texcoord = arrays.current_texcoord,
        }

        Ok(v)
    }

    fn record_triangle(&mut self, verts: [Vertex; 3], fb: &Arc<Framebuffer>) {
        let core = Arc::clone(self.core());
        let mut job = core.pools.vertex.acquire_or_alloc();
        job.verts = verts;
        job.fb = Some(Arc::clone(fb));
        self.ring.record(Task::Vertex(job), &core.scheduler);
    }

    fn record_point(&mut self, vertex: Vertex, size: f32, fb: &Arc<Framebuffer>) {
        let core = Arc::clone(self.core());
        let scheduler_core = Arc::clone(&core);
        let fb = Arc::clone(fb);
        self.ring.record(
            Task::run(StageTag::Vertex, move |wcx| {
                let mvp = *wcx.mvp.refresh(&scheduler_core.context);
                let mut v = vertex;
                v.position = mvp.transform_vec4(v.position);
                crate::pipeline::point_sprite_jobs(&scheduler_core, &v, size, &fb);
            }),
            &core.scheduler,
        );
    }

    /// Expands a draw over `indices` into pipeline jobs for `mode`.
    fn expand(&mut self, mode: DrawMode, indices: &[u32], arrays: &GatheredArrays) {
        let fb = Arc::clone(self.target_framebuffer());
        let gather = |renderer: &Renderer, index: u32| {
            renderer.gather_vertex(arrays, index as usize)
        };

        let result: Result<(), GlError> = (|| {
            match mode {
                DrawMode::Triangles => {
                    for triple in indices.chunks_exact(3) {
                        let verts = [
                            gather(self, triple[0])?,
                            gather(self, triple[1])?,
                            gather(self, triple[2])?,
                        ];
                        self.record_triangle(verts, &fb);
                    }
                }
                DrawMode::TriangleStrip => {
                    for (i, window) in indices.windows(3).enumerate() {
                        // Odd-numbered strip triangles flip so winding stays
                        // consistent.
                        let (a, b) = if i % 2 == 0 {
                            (window[1], window[2])
                        } else {
                            (window[2], window[1])
                        };
                        let verts = [gather(self, window[0])?, gather(self, a)?, gather(self, b)?];
                        self.record_triangle(verts, &fb);
                    }
                }
                DrawMode::TriangleFan => {
                    if indices.len() >= 3 {
                        let hub = gather(self, indices[0])?;
                        for pair in indices[1..].windows(2) {
                            let verts = [hub, gather(self, pair[0])?, gather(self, pair[1])?];
                            self.record_triangle(verts, &fb);
                        }
                    }
                }
                DrawMode::Points => {
                    let size = self.context().raster.read().point_size;
                    for &index in indices {
                        let vertex = gather(self, index)?;
                        self.record_point(vertex, size, &fb);
                    }
                }
                DrawMode::Lines | DrawMode::LineStrip | DrawMode::LineLoop => {
                    log::debug!("line primitives are not rasterized, dropping draw");
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            self.context().record_error(e);
        }
    }

    /// Draws `count` vertices starting at `first` from the enabled client
    /// arrays. A zero count is a no-op; drawing without an enabled vertex
    /// array records `InvalidOperation`.
    pub fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        if first < 0 || count < 0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        if count == 0 {
            return;
        }
        let arrays = match self.gather_arrays() {
            Ok(arrays) => arrays,
            Err(e) => {
                self.context().record_error(e);
                return;
            }
        };
        let indices: Vec<u32> = (first as u32..(first + count) as u32).collect();
        self.expand(mode, &indices, &arrays);
    }

    /// Indexed draw; buffer-offset index variants resolve through the bound
    /// element-array buffer with a bounds check.
    pub fn draw_elements(&mut self, mode: DrawMode, count: i32, indices: Indices<'_>) {
        if count < 0 {
            self.context().record_error(GlError::InvalidValue);
            return;
        }
        if count == 0 {
            return;
        }
        let count = count as usize;

        let index_list: Vec<u32> = match indices {
            Indices::U8(list) => {
                if list.len() < count {
                    self.context().record_error(GlError::InvalidValue);
                    return;
                }
                list[..count].iter().map(|&i| i as u32).collect()
            }
            Indices::U16(list) => {
                if list.len() < count {
                    self.context().record_error(GlError::InvalidValue);
                    return;
                }
                list[..count].iter().map(|&i| i as u32).collect()
            }
            Indices::BufferU8(offset) | Indices::BufferU16(offset) => {
                let element_size = match indices {
                    Indices::BufferU8(_) => 1,
                    _ => 2,
                };
                let binding = self.element_array_buffer_binding;
                if binding == 0 {
                    self.context().record_error(GlError::InvalidValue);
                    return;
                }
                let Some(buffer) = self.context().find_buffer(binding) else {
                    self.context().record_error(GlError::InvalidOperation);
                    return;
                };
                if offset + element_size * count > buffer.data.len() {
                    self.context().record_error(GlError::InvalidOperation);
                    return;
                }
                let bytes = &buffer.data[offset..offset + element_size * count];
                if element_size == 1 {
                    bytes.iter().map(|&b| b as u32).collect()
                } else {
                    bytes
                        .chunks_exact(2)
                        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]) as u32)
                        .collect()
                }
            }
        };

        let arrays = match self.gather_arrays() {
            Ok(arrays) => arrays,
            Err(e) => {
                self.context().record_error(e);
                return;
            }
        };
        self.expand(mode, &index_list, &arrays);
    }

    /// Synchronously clears the selected planes of the target framebuffer to
    /// the latched clear values, after draining any recorded draws.
    pub fn clear(&mut self, mask: ClearMask) {
        if !(mask.color || mask.depth || mask.stencil) {
            return;
        }
        self.finish();
        let clear = self.context().clear_values.get();
        self.target_framebuffer().clear_masked(
            mask.color.then_some(clear.color.to_packed()),
            mask.depth.then_some(clear.depth),
            mask.stencil.then_some(clear.stencil),
        );
    }

    /// Queues the clear on the scheduler instead of blocking; it runs
    /// unordered with respect to in-flight draws.
    pub fn clear_async(&mut self, mask: ClearMask) {
        let clear = self.context().clear_values.get();
        let fb = Arc::clone(self.target_framebuffer());
        fb.clear_async(
            &self.core().scheduler,
            mask.color.then_some(clear.color.to_packed()),
            mask.depth.then_some(clear.depth),
            mask.stencil.then_some(clear.stencil),
        );
    }

    /// Drains outstanding work and reads back a rectangle of the target
    /// framebuffer as RGBA8 bytes.
    pub fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
        self.finish();
        let mut out = Vec::new();
        self.target_framebuffer().read_pixels(x, y, width, height, &mut out);
        out
    }
}
