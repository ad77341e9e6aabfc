//! # Tessera
//!
//! Tessera is a multithreaded, tile-based software rasterizer implementing
//! the OpenGL ES 1.1 fixed-function pipeline. Draw calls are expanded into
//! staged jobs (vertex, primitive assembly, raster, fragment tile) that a
//! work-stealing worker pool executes against a shared tiled framebuffer,
//! while the API thread keeps mutating a versioned context that workers
//! consume through consistent snapshots.
//!
//! ## Features
//!
//! - **Staged pipeline**: each stage submits the next as its final action,
//!   so primitives stay ordered without any scheduler-level sequencing.
//! - **Tiled framebuffer**: lock-free depth-resolved writes between tiles,
//!   per-tile critical sections with scratch buffers inside them.
//! - **Fixed-function shading**: transform, single-light Lambert lighting,
//!   texturing through a per-worker texel block cache, fog, alpha test,
//!   stencil, depth and the full ES 1.1 blend factor set.
//! - **Deterministic teardown**: stage-tagged allocation accounting reports
//!   leaks and peaks at shutdown.
//!
//! ## Basic usage
//!
//! ```rust
//! use tessera::{ClearMask, Renderer};
//!
//! let mut renderer = Renderer::new((64, 64)).expect("renderer");
//! renderer.clear_color(0.0, 1.0, 0.0, 1.0);
//! renderer.clear(ClearMask::ALL);
//!
//! let pixels = renderer.read_pixels(0, 0, 64, 64);
//! assert_eq!(&pixels[..4], &[0x00, 0xFF, 0x00, 0xFF]);
//! ```
//!
//! Draws read client vertex arrays, exactly like the C API they mirror:
//!
//! ```rust
//! use tessera::{ArrayData, ClearMask, DrawMode, Renderer};
//!
//! let mut renderer = Renderer::new((8, 8)).expect("renderer");
//! renderer.clear(ClearMask::ALL);
//!
//! let positions: [f32; 9] = [0.0, 0.0, 0.5, 7.0, 0.0, 0.5, 0.0, 7.0, 0.5];
//! renderer.enable_client_state(tessera::ClientArray::Vertex);
//! renderer.vertex_pointer(3, 0, ArrayData::Floats(&positions));
//! renderer.color4(1.0, 0.0, 0.0, 1.0);
//! renderer.draw_arrays(DrawMode::Triangles, 0, 3);
//! renderer.finish();
//! ```

mod color;
mod config;
mod context;
mod error;
mod fixed;
mod framebuffer;
mod math;
mod memory;
mod pipeline;
mod plugin;
mod renderer;
mod ring;
mod scheduler;
mod snapshot;
mod stage;
mod state;
mod texture;
mod texture_cache;
mod vertex;

pub use color::{pack_rgba, unpack_rgba, Color, ColorSpec};
pub use config::{RendererConfig, UvMode};
pub use context::{BufferObject, BufferUsage, RenderContext, TexParameter};
pub use error::{GlError, RendererError};
pub use fixed::{from_fixed, to_fixed, Fixed, FIXED_ONE};
pub use framebuffer::{Framebuffer, TileScope, DEFAULT_TILE_SIZE};
pub use math::Mat4;
pub use memory::{JobPool, MemoryTracker};
pub use pipeline::jobs::{FragmentTileJob, PrimitiveJob, RasterJob, VertexJob};
pub use pipeline::{JobPools, WorkerContext};
pub use plugin::{PluginRegistry, StageJob, StagePlugin, TextureDecoder};
pub use renderer::{
    ArrayData, BufferTarget, ClearMask, ClientArray, Indices, LightParam, MaterialParam, Renderer,
};
pub use scheduler::{Scheduler, StageProfile, Task, ThreadProfile};
pub use stage::{StageTag, STAGE_COUNT};
pub use state::{
    ArrayType, BlendFactor, Cap, CompareFunc, CullFaceMode, DrawMode, FogMode, FrontFace,
    MaterialFace, MatrixMode, ShadeModel, StencilOp, TexEnvMode,
};
pub use texture::{
    Texture, TextureFilter, TextureFormat, TextureId, TextureTarget, TextureWrap,
    MAX_MIPMAP_LEVELS, MAX_TEXTURE_UNITS,
};
pub use texture_cache::TextureCache;
pub use vertex::{Fragment, Triangle, Vertex};
