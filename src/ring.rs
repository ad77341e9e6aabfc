//! The single-producer command ring between the API thread and the scheduler.
//!
//! Draw expansion records ready-to-run tasks here instead of submitting them
//! directly, so a burst of draw calls turns into one batched hand-off to the
//! scheduler at flush time. The API thread is both the producer and the
//! flusher; `tail` is published with release ordering and `head` is read with
//! acquire ordering so the slot payloads are visible to whichever thread
//! performs the next flush.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::scheduler::{Scheduler, Task};

pub const COMMAND_RING_SIZE: usize = 1024;

pub struct CommandRing {
    slots: Vec<Option<Task>>,
    head: AtomicU32,
    tail: AtomicU32,
}

impl Default for CommandRing {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRing {
    pub fn new() -> Self {
        Self {
            slots: (0..COMMAND_RING_SIZE).map(|_| None).collect(),
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }

    pub fn pending(&self) -> u32 {
        self.tail
            .load(Ordering::Acquire)
            .wrapping_sub(self.head.load(Ordering::Acquire))
    }

    /// Records a task, flushing first if the ring is full.
    pub fn record(&mut self, task: Task, scheduler: &Scheduler) {
        if self.pending() as usize >= COMMAND_RING_SIZE {
            self.flush(scheduler);
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = tail as usize % COMMAND_RING_SIZE;
        self.slots[slot] = Some(task);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
    }

    /// Drains every pending slot into scheduler submissions and equalizes
    /// head and tail.
    pub fn flush(&mut self, scheduler: &Scheduler) {
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        while head != tail {
            let slot = head as usize % COMMAND_RING_SIZE;
            if let Some(task) = self.slots[slot].take() {
                scheduler.submit(task);
            }
            head = head.wrapping_add(1);
        }
        self.head.store(tail, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Core;
    use crate::stage::StageTag;
    use std::sync::atomic::AtomicU32 as Counter;
    use std::sync::Arc;

    #[test]
    fn flush_forwards_recorded_tasks_in_order_and_empties_the_ring() {
        let core = Arc::new(Core::for_tests(1));
        Scheduler::start(&core).unwrap();
        let mut ring = CommandRing::new();
        let counter = Arc::new(Counter::new(0));

        for i in 0..10u32 {
            let counter = counter.clone();
            ring.record(
                Task::run(StageTag::Vertex, move |_| {
                    // Each task records its sequence position.
                    counter.fetch_max(i + 1, Ordering::Relaxed);
                }),
                &core.scheduler,
            );
        }
        assert_eq!(ring.pending(), 10);
        ring.flush(&core.scheduler);
        assert_eq!(ring.pending(), 0);
        core.scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 10);
        core.scheduler.shutdown();
    }

    #[test]
    fn recording_past_capacity_flushes_first() {
        let core = Arc::new(Core::for_tests(1));
        Scheduler::start(&core).unwrap();
        let mut ring = CommandRing::new();
        let counter = Arc::new(Counter::new(0));

        for _ in 0..COMMAND_RING_SIZE + 8 {
            let counter = counter.clone();
            ring.record(
                Task::run(StageTag::Vertex, move |_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
                &core.scheduler,
            );
        }
        // The implicit flush emptied the first ring's worth.
        assert_eq!(ring.pending(), 8);
        ring.flush(&core.scheduler);
        core.scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), (COMMAND_RING_SIZE + 8) as u32);
        core.scheduler.shutdown();
    }
}
