//! The renderer: the API-thread handle that owns the pipeline.
//!
//! A `Renderer` bundles the shared core (context, scheduler, pools, plugins,
//! allocation tracker), the command ring, and the API-thread-only latched
//! state (matrix mode, current color/normal/texcoord, buffer bindings). All
//! state mutation happens here on the calling thread; draw calls expand into
//! pipeline jobs that are recorded in the command ring and handed to the
//! worker pool on flush.

use std::sync::Arc;

use crate::config::RendererConfig;
use crate::context::RenderContext;
use crate::error::{GlError, RendererError};
use crate::framebuffer::Framebuffer;
use crate::memory::MemoryTracker;
use crate::pipeline::{Core, JobPools};
use crate::plugin::PluginRegistry;
use crate::ring::CommandRing;
use crate::scheduler::Scheduler;
use crate::state::MatrixMode;
use crate::texture::MAX_TEXTURE_UNITS;

mod arrays;
mod drawing;
mod matrices;
mod state;
mod textures;

pub use arrays::{BufferTarget, ClientArray};
pub use drawing::{ArrayData, ClearMask, Indices};
pub use state::{LightParam, MaterialParam};

pub struct Renderer {
    core: Arc<Core>,
    ring: CommandRing,
    default_framebuffer: Arc<Framebuffer>,
    bound_framebuffer: Option<Arc<Framebuffer>>,
    config: RendererConfig,

    // Latched API-thread state, only ever read during draw expansion.
    matrix_mode: MatrixMode,
    current_color: [f32; 4],
    current_normal: [f32; 3],
    current_texcoord: [[f32; 4]; MAX_TEXTURE_UNITS],
    active_texture_unit: usize,
    client_active_texture: usize,
    array_buffer_binding: u32,
    element_array_buffer_binding: u32,
}

impl Renderer {
    /// Creates a renderer with a default-configured framebuffer of the given
    /// pixel size.
    pub fn new(size: (u32, u32)) -> Result<Self, RendererError> {
        Self::with_config(size, RendererConfig::default())
    }

    pub fn with_config(size: (u32, u32), config: RendererConfig) -> Result<Self, RendererError> {
        let tracker = Arc::new(MemoryTracker::new());
        let context = RenderContext::new(tracker.clone());
        let scheduler = Scheduler::new(config.effective_threads(), config.profile);
        let pools = JobPools::new(tracker.clone());
        let plugins = PluginRegistry::new();
        let core = Arc::new(Core::new(
            context,
            scheduler,
            pools,
            plugins,
            tracker.clone(),
            config.uv_mode,
        ));
        Scheduler::start(&core)?;

        let default_framebuffer = Arc::new(Framebuffer::new(
            size.0,
            size.1,
            config.tile_size,
            config.color_spec,
            tracker,
        )?);

        core.context.viewport.modify(|v| {
            v.x = 0;
            v.y = 0;
            v.width = size.0 as i32;
            v.height = size.1 as i32;
        });
        core.context.scissor.modify(|s| {
            s.x = 0;
            s.y = 0;
            s.width = size.0 as i32;
            s.height = size.1 as i32;
        });

        log::info!(
            "renderer initialized: {}x{} framebuffer, {} worker(s)",
            size.0,
            size.1,
            core.scheduler.num_threads(),
        );

        Ok(Self {
            core,
            ring: CommandRing::new(),
            default_framebuffer,
            bound_framebuffer: None,
            config,
            matrix_mode: MatrixMode::Modelview,
            current_color: [1.0, 1.0, 1.0, 1.0],
            current_normal: [0.0, 0.0, 1.0],
            current_texcoord: [[0.0, 0.0, 0.0, 1.0]; MAX_TEXTURE_UNITS],
            active_texture_unit: 0,
            client_active_texture: 0,
            array_buffer_binding: 0,
            element_array_buffer_binding: 0,
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.core.context
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.core.scheduler
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.core.plugins
    }

    pub fn memory_tracker(&self) -> Arc<MemoryTracker> {
        self.core.tracker.clone()
    }

    pub(crate) fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// The framebuffer draws currently target: the bound one, else the
    /// default.
    pub fn target_framebuffer(&self) -> &Arc<Framebuffer> {
        self.bound_framebuffer
            .as_ref()
            .unwrap_or(&self.default_framebuffer)
    }

    pub fn default_framebuffer(&self) -> &Arc<Framebuffer> {
        &self.default_framebuffer
    }

    /// Creates an additional framebuffer sharing this renderer's tile size,
    /// colour spec and allocation tracker.
    pub fn create_framebuffer(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Arc<Framebuffer>, RendererError> {
        Ok(Arc::new(Framebuffer::new(
            width,
            height,
            self.config.tile_size,
            self.config.color_spec,
            self.core.tracker.clone(),
        )?))
    }

    /// Redirects draws to `framebuffer`, or back to the default with `None`.
    pub fn bind_framebuffer(&mut self, framebuffer: Option<Arc<Framebuffer>>) {
        self.bound_framebuffer = framebuffer;
    }

    /// Hands every recorded command to the scheduler without waiting.
    pub fn flush(&mut self) {
        self.ring.flush(&self.core.scheduler);
    }

    /// Flushes and blocks until all submitted work has drained.
    pub fn finish(&mut self) {
        self.flush();
        self.core.scheduler.wait();
    }

    /// Flush plus a bounded wait; `false` means work was still in flight at
    /// the deadline and downstream state must be torn down by the caller.
    #[must_use]
    pub fn finish_timeout(&mut self, timeout: std::time::Duration) -> bool {
        self.flush();
        self.core.scheduler.wait_timeout(timeout)
    }

    /// Returns and clears the calling thread's sticky error.
    pub fn get_error(&self) -> Option<GlError> {
        self.core.context.take_error()
    }

    pub fn set_profiling(&self, enabled: bool) {
        self.core.scheduler.set_profiling(enabled);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.flush();
        self.core.scheduler.shutdown();
        if self.core.scheduler.profiling() {
            self.core.scheduler.profile_report();
        }
        log::info!("renderer shut down");
    }
}
