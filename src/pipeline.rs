//! The staged rasterization pipeline.
//!
//! Draw expansion produces vertex jobs; every later stage is submitted by its
//! predecessor as that stage's final action, so per-primitive ordering holds
//! without any scheduler-level sequencing. The stages are vertex (transform
//! and lighting), primitive (assembly and the cull test), raster (tile
//! bucketing) and fragment tile (the per-pixel fixed-function path).

use std::sync::Arc;

use crate::config::UvMode;
use crate::context::RenderContext;
use crate::math::Mat4;
use crate::memory::{JobPool, MemoryTracker, JOB_POOL_CAPACITY};
use crate::plugin::{PluginRegistry, StageJob};
use crate::scheduler::{Scheduler, Task, ThreadProfile};
use crate::snapshot::Snapshot;
use crate::stage::StageTag;
use crate::state::{
    AlphaTestState, BlendState, DepthState, FogState, MaskState, ScissorState, StencilState,
    TextureEnvState,
};
use crate::texture::MAX_TEXTURE_UNITS;
use crate::texture_cache::TextureCache;

pub mod jobs;

mod fragment;
mod primitive;
mod raster;
mod vertex;

use jobs::{FragmentTileJob, RasterJob, VertexJob};

/// Object pools for the job types that churn fastest.
pub struct JobPools {
    pub vertex: JobPool<VertexJob>,
    pub raster: JobPool<RasterJob>,
    pub fragment_tile: JobPool<FragmentTileJob>,
}

impl JobPools {
    pub fn new(tracker: Arc<MemoryTracker>) -> Self {
        Self {
            vertex: JobPool::new(
                JOB_POOL_CAPACITY,
                StageTag::Vertex,
                "vertex job pool",
                tracker.clone(),
            ),
            raster: JobPool::new(
                JOB_POOL_CAPACITY,
                StageTag::Raster,
                "raster job pool",
                tracker.clone(),
            ),
            fragment_tile: JobPool::new(
                JOB_POOL_CAPACITY,
                StageTag::Fragment,
                "fragment tile job pool",
                tracker,
            ),
        }
    }
}

/// Everything a worker needs to execute pipeline tasks.
pub struct Core {
    pub context: RenderContext,
    pub scheduler: Scheduler,
    pub pools: JobPools,
    pub plugins: PluginRegistry,
    pub tracker: Arc<MemoryTracker>,
    pub uv_mode: UvMode,
}

impl Core {
    pub(crate) fn new(
        context: RenderContext,
        scheduler: Scheduler,
        pools: JobPools,
        plugins: PluginRegistry,
        tracker: Arc<MemoryTracker>,
        uv_mode: UvMode,
    ) -> Self {
        Self {
            context,
            scheduler,
            pools,
            plugins,
            tracker,
            uv_mode,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(threads: usize) -> Self {
        let tracker = Arc::new(MemoryTracker::new());
        Self::new(
            RenderContext::new(tracker.clone()),
            Scheduler::new(threads, false),
            JobPools::new(tracker.clone()),
            PluginRegistry::new(),
            tracker,
            UvMode::FramebufferSpace,
        )
    }
}

/// The cached modelview-projection product, recomputed when either source
/// matrix publishes a new version.
#[derive(Debug, Default)]
pub(crate) struct MvpCache {
    seen: Option<(u32, u32)>,
    matrix: Mat4,
}

impl MvpCache {
    pub(crate) fn refresh(&mut self, context: &RenderContext) -> &Mat4 {
        let versions = (context.modelview.version(), context.projection.version());
        if self.seen != Some(versions) {
            let modelview = context.modelview.read().current;
            let projection = context.projection.read().current;
            self.matrix = projection.multiply(&modelview);
            self.seen = Some(versions);
        }
        &self.matrix
    }
}

/// Snapshot caches for the state groups the fragment stage consumes.
#[derive(Default)]
pub(crate) struct FragmentCaches {
    pub texture_env: [Snapshot<TextureEnvState>; MAX_TEXTURE_UNITS],
    pub blend: Snapshot<BlendState>,
    pub depth: Snapshot<DepthState>,
    pub stencil: Snapshot<StencilState>,
    pub fog: Snapshot<FogState>,
    pub alpha_test: Snapshot<AlphaTestState>,
    pub scissor: Snapshot<ScissorState>,
    pub masks: Snapshot<MaskState>,
}

/// Per-worker mutable state: the texel cache, state snapshots and profile
/// counters. One instance lives on each worker thread's stack; nothing here
/// is shared.
pub struct WorkerContext {
    pub worker_id: usize,
    pub texture_cache: TextureCache,
    pub profile: ThreadProfile,
    pub(crate) mvp: MvpCache,
    pub(crate) light0: Snapshot<crate::state::LightState>,
    pub(crate) material: Snapshot<crate::state::MaterialState>,
    pub(crate) frag: FragmentCaches,
}

impl WorkerContext {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            texture_cache: TextureCache::new(),
            profile: ThreadProfile::default(),
            mvp: MvpCache::default(),
            light0: Snapshot::new(),
            material: Snapshot::new(),
            frag: FragmentCaches::default(),
        }
    }
}

/// Runs one task: stage plugins first, then the built-in stage logic.
pub(crate) fn execute_task(core: &Arc<Core>, wcx: &mut WorkerContext, task: Task) {
    match task {
        Task::Vertex(mut job) => {
            core.plugins
                .invoke(StageTag::Vertex, &mut StageJob::Vertex(&mut job));
            vertex::process(core, wcx, job);
        }
        Task::Primitive(mut job) => {
            core.plugins
                .invoke(StageTag::Primitive, &mut StageJob::Primitive(&mut job));
            primitive::process(core, job);
        }
        Task::Raster(mut job) => {
            core.plugins
                .invoke(StageTag::Raster, &mut StageJob::Raster(&mut job));
            raster::process(core, job);
        }
        Task::FragmentTile(mut job) => {
            core.plugins
                .invoke(StageTag::Fragment, &mut StageJob::FragmentTile(&mut job));
            fragment::process(core, wcx, job);
        }
        Task::Run(_, f) => f(wcx),
    }
}

pub(crate) use raster::point_sprite_jobs;
