//! Stage plugin hooks and the texture decoder registry.
//!
//! Plugins are short callbacks invoked in registration order before a stage's
//! built-in logic runs. They receive a mutable view of the stage's job and may
//! queue extra work through [`PluginRegistry::submit`].

use std::sync::{Arc, RwLock};

use smallvec::SmallVec;

use crate::pipeline::jobs::{FragmentTileJob, PrimitiveJob, RasterJob, VertexJob};
use crate::scheduler::{Scheduler, Task};
use crate::stage::{StageTag, STAGE_COUNT};
use crate::texture::TextureId;

/// Callbacks registered per stage.
pub const MAX_PLUGINS_PER_STAGE: usize = 4;
pub const MAX_TEXTURE_DECODERS: usize = 4;

/// A mutable view of the job a stage is about to run.
pub enum StageJob<'a> {
    Vertex(&'a mut VertexJob),
    Primitive(&'a mut PrimitiveJob),
    Raster(&'a mut RasterJob),
    FragmentTile(&'a mut FragmentTileJob),
}

pub type StagePlugin = Arc<dyn Fn(&mut StageJob<'_>) + Send + Sync>;

/// Resolves a file path to a texture id, or `None` if the decoder does not
/// handle the file.
pub type TextureDecoder = Arc<dyn Fn(&str) -> Option<TextureId> + Send + Sync>;

#[derive(Clone)]
struct PluginEntry {
    name: &'static str,
    callback: StagePlugin,
}

type StageSlot = SmallVec<[PluginEntry; MAX_PLUGINS_PER_STAGE]>;

#[derive(Default)]
pub struct PluginRegistry {
    stages: RwLock<[StageSlot; STAGE_COUNT]>,
    decoders: RwLock<SmallVec<[TextureDecoder; MAX_TEXTURE_DECODERS]>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback to `stage`'s slot. Registrations beyond the
    /// per-stage limit are dropped with a warning.
    pub fn register(
        &self,
        stage: StageTag,
        name: &'static str,
        callback: impl Fn(&mut StageJob<'_>) + Send + Sync + 'static,
    ) {
        let mut stages = self.stages.write().unwrap();
        let slot = &mut stages[stage.index()];
        if slot.len() >= MAX_PLUGINS_PER_STAGE {
            log::warn!("plugin slot for stage {} is full, dropping {name}", stage.name());
            return;
        }
        slot.push(PluginEntry {
            name,
            callback: Arc::new(callback),
        });
        log::debug!("registered plugin {name} for stage {}", stage.name());
    }

    /// Invokes `stage`'s callbacks in registration order.
    pub fn invoke(&self, stage: StageTag, job: &mut StageJob<'_>) {
        // Clone the arcs out so plugin bodies run without the registry lock.
        let entries: StageSlot = self.stages.read().unwrap()[stage.index()].clone();
        for entry in &entries {
            (entry.callback)(job);
        }
    }

    pub fn is_empty(&self, stage: StageTag) -> bool {
        self.stages.read().unwrap()[stage.index()].is_empty()
    }

    /// Space-separated names of every registered plugin, in stage order.
    pub fn list(&self) -> String {
        let stages = self.stages.read().unwrap();
        let mut names = Vec::new();
        for slot in stages.iter() {
            names.extend(slot.iter().map(|entry| entry.name));
        }
        names.join(" ")
    }

    /// Queues extra work from a plugin body.
    pub fn submit(&self, scheduler: &Scheduler, task: Task) {
        scheduler.submit(task);
    }

    pub fn register_decoder(&self, decoder: impl Fn(&str) -> Option<TextureId> + Send + Sync + 'static) {
        let mut decoders = self.decoders.write().unwrap();
        if decoders.len() >= MAX_TEXTURE_DECODERS {
            log::warn!("texture decoder registry is full");
            return;
        }
        decoders.push(Arc::new(decoder));
    }

    /// Tries each registered decoder in order until one resolves the file.
    pub fn decode_texture(&self, file: &str) -> Option<TextureId> {
        let decoders = self.decoders.read().unwrap().clone();
        decoders.iter().find_map(|decoder| decoder(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn plugins_run_in_registration_order() {
        let registry = PluginRegistry::new();
        let order = Arc::new(RwLock::new(Vec::new()));

        let first = order.clone();
        registry.register(StageTag::Raster, "first", move |_| {
            first.write().unwrap().push(1)
        });
        let second = order.clone();
        registry.register(StageTag::Raster, "second", move |_| {
            second.write().unwrap().push(2)
        });

        let mut job = RasterJob::default();
        registry.invoke(StageTag::Raster, &mut StageJob::Raster(&mut job));
        assert_eq!(*order.read().unwrap(), vec![1, 2]);
    }

    #[test]
    fn registrations_beyond_the_slot_limit_are_dropped() {
        let registry = PluginRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        for _ in 0..MAX_PLUGINS_PER_STAGE + 2 {
            let count = count.clone();
            registry.register(StageTag::Vertex, "counter", move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            });
        }
        let mut job = VertexJob::default();
        registry.invoke(StageTag::Vertex, &mut StageJob::Vertex(&mut job));
        assert_eq!(count.load(Ordering::Relaxed), MAX_PLUGINS_PER_STAGE as u32);
    }

    #[test]
    fn plugins_can_mutate_the_job() {
        let registry = PluginRegistry::new();
        registry.register(StageTag::Fragment, "tint", |job| {
            if let StageJob::FragmentTile(tile) = job {
                tile.color = 0xFF12_3456;
            }
        });
        let mut job = FragmentTileJob::default();
        registry.invoke(StageTag::Fragment, &mut StageJob::FragmentTile(&mut job));
        assert_eq!(job.color, 0xFF12_3456);
    }

    #[test]
    fn decoders_resolve_in_order() {
        let registry = PluginRegistry::new();
        registry.register_decoder(|file| file.ends_with(".raw").then_some(TextureId(7)));
        registry.register_decoder(|_| Some(TextureId(9)));
        assert_eq!(registry.decode_texture("image.raw"), Some(TextureId(7)));
        assert_eq!(registry.decode_texture("image.png"), Some(TextureId(9)));
        assert_eq!(registry.list(), "");
    }
}
