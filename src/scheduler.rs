//! The per-stage work-stealing scheduler.
//!
//! N worker threads each own a Chase-Lev deque (`crossbeam_deque::Worker`);
//! a global injector absorbs producer-thread submissions and local overflow.
//! Submission prefers the calling worker's own deque while it holds fewer
//! than [`LOCAL_QUEUE_LIMIT`] entries. A worker that runs dry pops from the
//! injector, then steals a batch from a victim deque and runs the first
//! stolen entry, stashing the rest locally.
//!
//! Stage tags route tasks to profile counters and allocation accounting only;
//! they impose no ordering. Pipeline order holds structurally because each
//! stage submits the next stage's task as its final action, and `wait`
//! observes true quiescence through an in-flight counter that covers queued
//! and currently executing tasks.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use crossbeam_utils::{Backoff, CachePadded};

use crate::pipeline::jobs::{FragmentTileJob, PrimitiveJob, RasterJob, VertexJob};
use crate::pipeline::{Core, WorkerContext};
use crate::stage::{StageTag, STAGE_COUNT};

/// Entries a worker keeps on its own deque before spilling to the injector.
pub const LOCAL_QUEUE_LIMIT: usize = 64;

type RunFn = Box<dyn FnOnce(&mut WorkerContext) + Send>;

/// A unit of work: one pooled pipeline job or an opaque callback.
pub enum Task {
    Vertex(Box<VertexJob>),
    Primitive(Box<PrimitiveJob>),
    Raster(Box<RasterJob>),
    FragmentTile(Box<FragmentTileJob>),
    Run(StageTag, RunFn),
}

impl Task {
    /// Wraps a callback as a task with the given stage tag.
    pub fn run(stage: StageTag, f: impl FnOnce(&mut WorkerContext) + Send + 'static) -> Self {
        Task::Run(stage, Box::new(f))
    }

    pub fn stage(&self) -> StageTag {
        match self {
            Task::Vertex(_) => StageTag::Vertex,
            Task::Primitive(_) => StageTag::Primitive,
            Task::Raster(_) => StageTag::Raster,
            Task::FragmentTile(_) => StageTag::Fragment,
            Task::Run(stage, _) => *stage,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task::{}", self.stage().name())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StageProfile {
    pub tasks: u64,
    pub steal_successes: u64,
    pub task_nanos: u64,
}

/// Per-worker counters, merged across workers at report time.
#[derive(Debug, Default, Clone)]
pub struct ThreadProfile {
    pub stages: [StageProfile; STAGE_COUNT],
    pub steal_attempts: u64,
    pub contention_events: u64,
    pub idle_nanos: u64,
    pub steal_nanos: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl ThreadProfile {
    fn accumulate(&mut self, other: &ThreadProfile) {
        for (into, from) in self.stages.iter_mut().zip(other.stages.iter()) {
            into.tasks += from.tasks;
            into.steal_successes += from.steal_successes;
            into.task_nanos += from.task_nanos;
        }
        self.steal_attempts += other.steal_attempts;
        self.contention_events += other.contention_events;
        self.idle_nanos += other.idle_nanos;
        self.steal_nanos += other.steal_nanos;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
    }
}

struct LocalQueue {
    /// Identifies the owning scheduler so a worker never pushes another
    /// scheduler's task onto its own deque.
    scheduler_tag: usize,
    worker: Worker<Task>,
}

thread_local! {
    static LOCAL: RefCell<Option<LocalQueue>> = const { RefCell::new(None) };
}

pub struct Scheduler {
    injector: Injector<Task>,
    stealers: Vec<Stealer<Task>>,
    /// Deques handed to worker threads by `start`.
    seed_queues: Mutex<Vec<Option<Worker<Task>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    profiling: AtomicBool,
    in_flight: CachePadded<AtomicUsize>,
    num_threads: usize,
    profiles: Vec<Mutex<ThreadProfile>>,
}

impl Scheduler {
    pub fn new(num_threads: usize, profiling: bool) -> Self {
        let num_threads = num_threads.max(1);
        let queues: Vec<Worker<Task>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers = queues.iter().map(Worker::stealer).collect();
        Self {
            injector: Injector::new(),
            stealers,
            seed_queues: Mutex::new(queues.into_iter().map(Some).collect()),
            handles: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            profiling: AtomicBool::new(profiling),
            in_flight: CachePadded::new(AtomicUsize::new(0)),
            num_threads,
            profiles: (0..num_threads)
                .map(|_| Mutex::new(ThreadProfile::default()))
                .collect(),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn tag(&self) -> usize {
        self as *const Scheduler as usize
    }

    /// Spawns the worker threads. Called once, after the shared core the
    /// workers execute against has been assembled.
    pub fn start(core: &Arc<Core>) -> std::io::Result<()> {
        let scheduler = &core.scheduler;
        let mut seeds = scheduler.seed_queues.lock().unwrap();
        let mut handles = scheduler.handles.lock().unwrap();
        for (worker_id, seed) in seeds.iter_mut().enumerate() {
            let queue = seed.take().expect("scheduler started twice");
            let core = Arc::clone(core);
            let handle = std::thread::Builder::new()
                .name(format!("tessera-worker-{worker_id}"))
                .spawn(move || worker_main(core, worker_id, queue))?;
            handles.push(handle);
        }
        log::info!("scheduler started with {} worker thread(s)", scheduler.num_threads);
        Ok(())
    }

    /// Queues a task: onto the calling worker's deque when it has room, else
    /// onto the global injector. Safe to call from tasks and from the API
    /// thread alike.
    pub fn submit(&self, task: Task) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let mut task = Some(task);
        LOCAL.with(|slot| {
            if let Some(local) = slot.borrow().as_ref() {
                if local.scheduler_tag == self.tag() && local.worker.len() < LOCAL_QUEUE_LIMIT {
                    local.worker.push(task.take().unwrap());
                }
            }
        });
        if let Some(task) = task {
            self.injector.push(task);
        }
    }

    fn find_task(&self, local: &Worker<Task>, worker_id: usize, profile: &mut ThreadProfile) -> Option<Task> {
        if let Some(task) = local.pop() {
            return Some(task);
        }

        loop {
            match self.injector.steal_batch_and_pop(local) {
                Steal::Success(task) => return Some(task),
                Steal::Retry => profile.contention_events += 1,
                Steal::Empty => break,
            }
        }

        let timed = self.profiling.load(Ordering::Relaxed);
        let started = timed.then(Instant::now);
        for (victim, stealer) in self.stealers.iter().enumerate() {
            if victim == worker_id {
                continue;
            }
            profile.steal_attempts += 1;
            loop {
                match stealer.steal_batch_and_pop(local) {
                    Steal::Success(task) => {
                        profile.stages[task.stage().index()].steal_successes += 1;
                        if let Some(start) = started {
                            profile.steal_nanos += start.elapsed().as_nanos() as u64;
                        }
                        return Some(task);
                    }
                    Steal::Retry => profile.contention_events += 1,
                    Steal::Empty => break,
                }
            }
        }
        if let Some(start) = started {
            profile.steal_nanos += start.elapsed().as_nanos() as u64;
        }
        None
    }

    /// Spins until every queued and executing task has completed.
    pub fn wait(&self) {
        let backoff = Backoff::new();
        while self.in_flight.load(Ordering::Acquire) > 0 {
            backoff.snooze();
        }
    }

    /// Like [`wait`](Scheduler::wait) but gives up after `timeout`, returning
    /// `false` if work was still in flight at the deadline.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        while self.in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            backoff.snooze();
        }
        true
    }

    /// Drains outstanding work, then stops and joins the workers.
    pub fn shutdown(&self) {
        self.wait();
        self.shutdown.store(true, Ordering::Release);
        let mut handles = self.handles.lock().unwrap();
        for handle in handles.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked during shutdown");
            }
        }
    }

    pub fn set_profiling(&self, enabled: bool) {
        self.profiling.store(enabled, Ordering::Release);
    }

    pub fn profiling(&self) -> bool {
        self.profiling.load(Ordering::Acquire)
    }

    fn flush_profile(&self, worker_id: usize, profile: &ThreadProfile) {
        *self.profiles[worker_id].lock().unwrap() = profile.clone();
    }

    /// Merges every worker's counters into one profile.
    pub fn merged_profile(&self) -> ThreadProfile {
        let mut total = ThreadProfile::default();
        for slot in &self.profiles {
            total.accumulate(&slot.lock().unwrap());
        }
        total
    }

    /// Logs the per-stage and global profiling summary.
    pub fn profile_report(&self) {
        let total = self.merged_profile();
        log::info!("scheduler profile:");
        let mut all_tasks = 0;
        let mut all_steals = 0;
        let mut all_task_nanos = 0;
        for stage in StageTag::ALL {
            let s = &total.stages[stage.index()];
            all_tasks += s.tasks;
            all_steals += s.steal_successes;
            all_task_nanos += s.task_nanos;
            if s.tasks > 0 || s.steal_successes > 0 {
                log::info!(
                    "  {}: {} task(s), {} stolen, avg {} ns/task",
                    stage.name(),
                    s.tasks,
                    s.steal_successes,
                    s.task_nanos / s.tasks.max(1),
                );
            }
        }
        log::info!(
            "  total: {} task(s), {} steal attempt(s), {} stolen, {} contention event(s), avg {} ns/task",
            all_tasks,
            total.steal_attempts,
            all_steals,
            total.contention_events,
            all_task_nanos / all_tasks.max(1),
        );
        log::info!(
            "  texture cache: {} hit(s), {} miss(es); idle {} ns, steal scan {} ns",
            total.cache_hits,
            total.cache_misses,
            total.idle_nanos,
            total.steal_nanos,
        );
    }
}

fn worker_main(core: Arc<Core>, worker_id: usize, queue: Worker<Task>) {
    let scheduler = &core.scheduler;
    LOCAL.with(|slot| {
        *slot.borrow_mut() = Some(LocalQueue {
            scheduler_tag: scheduler.tag(),
            worker: queue,
        });
    });

    let mut wcx = WorkerContext::new(worker_id);
    let backoff = Backoff::new();
    loop {
        let task = LOCAL.with(|slot| {
            let borrow = slot.borrow();
            let local = borrow.as_ref().expect("worker queue installed");
            scheduler.find_task(&local.worker, worker_id, &mut wcx.profile)
        });

        match task {
            Some(task) => {
                let timed = scheduler.profiling.load(Ordering::Relaxed);
                let stage = task.stage().index();
                let started = timed.then(Instant::now);
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    crate::pipeline::execute_task(&core, &mut wcx, task)
                }));
                scheduler.in_flight.fetch_sub(1, Ordering::AcqRel);
                if outcome.is_err() {
                    log::error!("task panicked on worker {worker_id}");
                }
                if let Some(start) = started {
                    wcx.profile.stages[stage].tasks += 1;
                    wcx.profile.stages[stage].task_nanos += start.elapsed().as_nanos() as u64;
                    let (hits, misses) = wcx.texture_cache.stats();
                    wcx.profile.cache_hits = hits;
                    wcx.profile.cache_misses = misses;
                    scheduler.flush_profile(worker_id, &wcx.profile);
                }
                backoff.reset();
            }
            None => {
                if scheduler.shutdown.load(Ordering::Acquire)
                    && scheduler.in_flight.load(Ordering::Acquire) == 0
                {
                    break;
                }
                let timed = scheduler.profiling.load(Ordering::Relaxed);
                let started = timed.then(Instant::now);
                backoff.snooze();
                if let Some(start) = started {
                    wcx.profile.idle_nanos += start.elapsed().as_nanos() as u64;
                }
            }
        }
    }

    let (hits, misses) = wcx.texture_cache.stats();
    wcx.profile.cache_hits = hits;
    wcx.profile.cache_misses = misses;
    scheduler.flush_profile(worker_id, &wcx.profile);
    LOCAL.with(|slot| *slot.borrow_mut() = None);
    log::debug!("worker {worker_id} exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn test_core(threads: usize) -> Arc<Core> {
        let core = Arc::new(Core::for_tests(threads));
        Scheduler::start(&core).unwrap();
        core
    }

    #[test]
    fn submitted_tasks_all_execute_before_wait_returns() {
        let core = test_core(4);
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..1000 {
            let counter = counter.clone();
            core.scheduler.submit(Task::run(StageTag::Vertex, move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            }));
        }
        core.scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
        core.scheduler.shutdown();
    }

    #[test]
    fn tasks_submitted_from_tasks_are_drained_by_wait() {
        let core = test_core(2);
        let counter = Arc::new(AtomicU32::new(0));
        let inner_core = Arc::clone(&core);
        let inner_counter = counter.clone();
        core.scheduler.submit(Task::run(StageTag::Vertex, move |_| {
            for _ in 0..10 {
                let counter = inner_counter.clone();
                inner_core
                    .scheduler
                    .submit(Task::run(StageTag::Fragment, move |_| {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }));
            }
        }));
        core.scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 10);
        core.scheduler.shutdown();
    }

    #[test]
    fn wait_timeout_expires_while_a_task_is_stuck() {
        let core = test_core(1);
        let release = Arc::new(AtomicBool::new(false));
        let gate = release.clone();
        core.scheduler.submit(Task::run(StageTag::Raster, move |_| {
            while !gate.load(Ordering::Acquire) {
                std::thread::yield_now();
            }
        }));
        assert!(!core.scheduler.wait_timeout(Duration::from_millis(50)));
        release.store(true, Ordering::Release);
        assert!(core.scheduler.wait_timeout(Duration::from_secs(5)));
        core.scheduler.shutdown();
    }

    #[test]
    fn profile_counts_executed_tasks_per_stage() {
        let core = test_core(2);
        core.scheduler.set_profiling(true);
        for _ in 0..8 {
            core.scheduler.submit(Task::run(StageTag::Raster, |_| {}));
        }
        core.scheduler.wait();
        // Flushes land after the in-flight counter drops; give workers a beat.
        std::thread::sleep(Duration::from_millis(20));
        let profile = core.scheduler.merged_profile();
        assert_eq!(profile.stages[StageTag::Raster.index()].tasks, 8);
        core.scheduler.shutdown();
    }
}
