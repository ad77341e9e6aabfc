//! The 256-byte work items handed between pipeline stages.
//!
//! Each job owns its inputs by value plus a retained framebuffer handle, and
//! has exactly one lifecycle: acquired from its stage pool (or allocated as a
//! tracked fallback), submitted once, and released by the worker that executes
//! it. The `fb` handle is taken before release so no reference survives in a
//! pooled node.

use std::sync::Arc;

use crate::framebuffer::Framebuffer;
use crate::vertex::{Triangle, Vertex};

/// Three gathered vertices awaiting transform and lighting.
#[derive(Debug, Default)]
#[repr(align(256))]
pub struct VertexJob {
    pub verts: [Vertex; 3],
    pub fb: Option<Arc<Framebuffer>>,
}

/// Three transformed vertices awaiting assembly and the cull test.
#[derive(Debug, Default)]
#[repr(align(256))]
pub struct PrimitiveJob {
    pub verts: [Vertex; 3],
    pub fb: Option<Arc<Framebuffer>>,
}

/// An assembled triangle awaiting tile bucketing.
#[derive(Debug, Default)]
#[repr(align(256))]
pub struct RasterJob {
    pub tri: Triangle,
    pub fb: Option<Arc<Framebuffer>>,
}

/// One tile-aligned rectangle of one primitive, plus everything the fragment
/// loop needs: flat color, depth, coverage edges and the source texture
/// coordinates for interpolated sampling.
#[derive(Debug, Default)]
#[repr(align(256))]
pub struct FragmentTileJob {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub color: u32,
    pub depth: f32,
    /// Edge-function coefficients `(a, b, c)` per triangle edge; a pixel
    /// center is covered when all three evaluate >= 0.
    pub edges: [[f32; 3]; 3],
    /// Per-vertex `(s, t)` used by barycentric texture lookup.
    pub texcoords: [[f32; 2]; 3],
    pub sprite_mode: bool,
    pub sprite_cx: f32,
    pub sprite_cy: f32,
    pub sprite_size: f32,
    pub fb: Option<Arc<Framebuffer>>,
}

const _: () = assert!(std::mem::size_of::<VertexJob>() == 256);
const _: () = assert!(std::mem::size_of::<PrimitiveJob>() == 256);
const _: () = assert!(std::mem::size_of::<RasterJob>() == 256);
const _: () = assert!(std::mem::size_of::<FragmentTileJob>() == 256);

impl VertexJob {
    /// Prepares a pooled node for reuse.
    pub fn reset(&mut self) {
        self.fb = None;
    }
}

impl RasterJob {
    pub fn reset(&mut self) {
        self.fb = None;
    }
}

impl FragmentTileJob {
    pub fn reset(&mut self) {
        self.fb = None;
        self.sprite_mode = false;
    }
}
