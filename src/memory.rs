//! Stage-tagged memory accounting and the job object pools.
//!
//! Every long-lived allocation the renderer makes (framebuffer planes, pool
//! arenas, texture levels, fallback job boxes) is reported here with its stage
//! tag and a static origin site. The tracker keeps running and peak totals,
//! per stage and overall, and reports any site whose live count is nonzero at
//! shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ahash::{HashMap, HashMapExt};

use crate::stage::{StageTag, STAGE_COUNT};

#[derive(Debug, Default, Clone, Copy)]
struct SiteStats {
    live: usize,
    bytes: usize,
}

/// Tracks renderer allocations by stage and origin site.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
    stage_current: [AtomicUsize; STAGE_COUNT],
    stage_peak: [AtomicUsize; STAGE_COUNT],
    sites: Mutex<HashMap<&'static str, SiteStats>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_alloc(&self, size: usize, stage: StageTag, site: &'static str) {
        if size == 0 {
            return;
        }
        let current = self.current.fetch_add(size, Ordering::Relaxed) + size;
        self.peak.fetch_max(current, Ordering::Relaxed);
        let idx = stage.index();
        let stage_current = self.stage_current[idx].fetch_add(size, Ordering::Relaxed) + size;
        self.stage_peak[idx].fetch_max(stage_current, Ordering::Relaxed);

        let mut sites = self.sites.lock().unwrap();
        let stats = sites.entry(site).or_default();
        stats.live += 1;
        stats.bytes += size;
    }

    pub fn record_free(&self, size: usize, stage: StageTag, site: &'static str) {
        if size == 0 {
            return;
        }
        self.current.fetch_sub(size, Ordering::Relaxed);
        self.stage_current[stage.index()].fetch_sub(size, Ordering::Relaxed);

        let mut sites = self.sites.lock().unwrap();
        match sites.get_mut(site) {
            Some(stats) if stats.live > 0 => {
                stats.live -= 1;
                stats.bytes -= size.min(stats.bytes);
            }
            _ => log::warn!("free of untracked allocation site {site:?}"),
        }
    }

    /// Total bytes currently accounted for.
    pub fn current_usage(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak_usage(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn stage_usage(&self, stage: StageTag) -> usize {
        self.stage_current[stage.index()].load(Ordering::Relaxed)
    }

    pub fn stage_peak(&self, stage: StageTag) -> usize {
        self.stage_peak[stage.index()].load(Ordering::Relaxed)
    }

    /// Logs totals and any still-live sites. Returns the number of leaking
    /// sites so shutdown paths can surface a nonzero status.
    pub fn report(&self) -> usize {
        log::info!(
            "memory: current {} bytes, peak {} bytes",
            self.current_usage(),
            self.peak_usage(),
        );
        for stage in StageTag::ALL {
            let peak = self.stage_peak(stage);
            if peak > 0 {
                log::info!(
                    "memory[{}]: current {} bytes, peak {} bytes",
                    stage.name(),
                    self.stage_usage(stage),
                    peak,
                );
            }
        }

        let sites = self.sites.lock().unwrap();
        let mut leaks = 0;
        for (site, stats) in sites.iter() {
            if stats.live > 0 {
                log::error!(
                    "memory leak: {} allocation(s), {} bytes from {site}",
                    stats.live,
                    stats.bytes,
                );
                leaks += 1;
            }
        }
        if leaks == 0 {
            log::info!("no memory leaks detected");
        }
        leaks
    }
}

/// Number of preallocated nodes in each job pool.
pub const JOB_POOL_CAPACITY: usize = 512;

/// A mutex-protected free list of preallocated job boxes.
///
/// `acquire` pops in O(1) and returns `None` when the pool is drained;
/// `acquire_or_alloc` falls back to a fresh tracked allocation instead.
/// Released boxes return to the free list regardless of where they were
/// allocated, so the pool absorbs fallback nodes and frees everything on drop.
pub struct JobPool<T> {
    free: Mutex<Vec<Box<T>>>,
    stage: StageTag,
    site: &'static str,
    tracker: Arc<MemoryTracker>,
}

impl<T: Default> JobPool<T> {
    pub fn new(
        capacity: usize,
        stage: StageTag,
        site: &'static str,
        tracker: Arc<MemoryTracker>,
    ) -> Self {
        let node_size = std::mem::size_of::<T>();
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            tracker.record_alloc(node_size, stage, site);
            free.push(Box::new(T::default()));
        }
        Self {
            free: Mutex::new(free),
            stage,
            site,
            tracker,
        }
    }

    pub fn acquire(&self) -> Option<Box<T>> {
        self.free.lock().unwrap().pop()
    }

    /// Acquires a node, allocating a tracked fallback box if the pool is dry.
    pub fn acquire_or_alloc(&self) -> Box<T> {
        if let Some(node) = self.acquire() {
            return node;
        }
        log::debug!("{} pool exhausted, falling back to direct allocation", self.site);
        self.tracker
            .record_alloc(std::mem::size_of::<T>(), self.stage, self.site);
        Box::new(T::default())
    }

    pub fn release(&self, node: Box<T>) {
        self.free.lock().unwrap().push(node);
    }

    pub fn available(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

impl<T> Drop for JobPool<T> {
    fn drop(&mut self) {
        let node_size = std::mem::size_of::<T>();
        let free = self.free.get_mut().unwrap();
        for _ in free.drain(..) {
            self.tracker.record_free(node_size, self.stage, self.site);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_balances_to_zero_after_free() {
        let tracker = MemoryTracker::new();
        tracker.record_alloc(1024, StageTag::Vertex, "test alloc");
        tracker.record_alloc(512, StageTag::Fragment, "test alloc");
        assert_eq!(tracker.current_usage(), 1536);
        assert_eq!(tracker.stage_usage(StageTag::Vertex), 1024);

        tracker.record_free(1024, StageTag::Vertex, "test alloc");
        tracker.record_free(512, StageTag::Fragment, "test alloc");
        assert_eq!(tracker.current_usage(), 0);
        assert_eq!(tracker.peak_usage(), 1536);
        assert_eq!(tracker.report(), 0);
    }

    #[test]
    fn tracker_reports_unfreed_sites_as_leaks() {
        let tracker = MemoryTracker::new();
        tracker.record_alloc(64, StageTag::Raster, "leaky site");
        assert_eq!(tracker.report(), 1);
    }

    #[test]
    fn pool_acquire_drains_then_returns_none() {
        let tracker = Arc::new(MemoryTracker::new());
        let pool: JobPool<[u64; 4]> = JobPool::new(2, StageTag::Vertex, "test pool", tracker);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn pool_fallback_allocations_are_absorbed_and_freed() {
        let tracker = Arc::new(MemoryTracker::new());
        let pool: JobPool<u64> = JobPool::new(1, StageTag::Raster, "test pool", tracker.clone());
        let a = pool.acquire_or_alloc();
        let b = pool.acquire_or_alloc(); // fallback
        assert_eq!(tracker.current_usage(), 2 * std::mem::size_of::<u64>());
        pool.release(a);
        pool.release(b);
        drop(pool);
        assert_eq!(tracker.current_usage(), 0);
    }
}
