//! Primitive stage: triangle assembly and the winding cull.

use std::sync::Arc;

use crate::pipeline::jobs::PrimitiveJob;
use crate::pipeline::vertex::PRIMITIVE_JOB_SITE;
use crate::pipeline::Core;
use crate::scheduler::Task;
use crate::stage::StageTag;
use crate::vertex::Triangle;

pub(crate) fn process(core: &Arc<Core>, mut job: Box<PrimitiveJob>) {
    let tri = Triangle::new(job.verts[0], job.verts[1], job.verts[2]);
    let fb = job.fb.take();
    drop(job);
    core.tracker.record_free(
        std::mem::size_of::<PrimitiveJob>(),
        StageTag::Primitive,
        PRIMITIVE_JOB_SITE,
    );

    if tri.signed_area2() <= 0.0 {
        // Degenerate or clockwise: culled.
        return;
    }

    let mut next = core.pools.raster.acquire_or_alloc();
    next.tri = tri;
    next.fb = fb;
    core.scheduler.submit(Task::Raster(next));
}
