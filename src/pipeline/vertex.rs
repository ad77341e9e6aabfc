//! Vertex stage: transform by the cached modelview-projection product and
//! apply single-light Lambert shading.

use std::sync::Arc;

use crate::math::{dot3, normalize3};
use crate::pipeline::jobs::{PrimitiveJob, VertexJob};
use crate::pipeline::{Core, WorkerContext};
use crate::scheduler::Task;
use crate::stage::StageTag;
use crate::state::{LightState, MaterialParams};
use crate::vertex::Vertex;

pub(crate) const PRIMITIVE_JOB_SITE: &str = "primitive job";

pub(crate) fn process(core: &Arc<Core>, wcx: &mut WorkerContext, mut job: Box<VertexJob>) {
    let context = &core.context;
    let mvp = *wcx.mvp.refresh(context);

    let mut verts = job.verts;
    for v in &mut verts {
        v.position = mvp.transform_vec4(v.position);
    }

    if context.lighting.get() {
        let light = *wcx.light0.refresh(&context.lights[0]);
        let material = wcx.material.refresh(&context.material).front;
        if light.enabled {
            for v in &mut verts {
                shade_lambert(v, &light, &material);
            }
        }
    }

    let fb = job.fb.take();
    job.reset();
    core.pools.vertex.release(job);

    core.tracker.record_alloc(
        std::mem::size_of::<PrimitiveJob>(),
        StageTag::Primitive,
        PRIMITIVE_JOB_SITE,
    );
    let next = Box::new(PrimitiveJob { verts, fb });
    core.scheduler.submit(Task::Primitive(next));
}

/// `ambient * light.ambient + diffuse * light.diffuse * max(0, n.l)` per
/// channel, preserving the material's diffuse alpha. The light direction is
/// the normalized vector toward a directional light at `-position`.
fn shade_lambert(v: &mut Vertex, light: &LightState, material: &MaterialParams) {
    let mut direction = [-light.position[0], -light.position[1], -light.position[2]];
    normalize3(&mut direction);
    let lambert = dot3(v.normal, direction).max(0.0);
    for i in 0..3 {
        v.color[i] = material.ambient[i] * light.ambient[i]
            + material.diffuse[i] * light.diffuse[i] * lambert;
    }
    v.color[3] = material.diffuse[3];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambert_shading_is_ambient_only_when_the_light_is_behind() {
        let mut light = LightState::new(0);
        light.enabled = true;
        light.ambient = [0.25, 0.25, 0.25, 1.0];
        light.position = [0.0, 0.0, -1.0, 0.0]; // shining along +z

        let material = MaterialParams {
            ambient: [1.0, 1.0, 1.0, 1.0],
            diffuse: [1.0, 0.5, 0.0, 0.75],
            ..MaterialParams::default()
        };

        // Normal faces +z, light direction is -(-1) = +z: fully lit.
        let mut lit = Vertex::default();
        shade_lambert(&mut lit, &light, &material);
        assert!((lit.color[0] - 1.25).abs() < 1e-6);
        assert!((lit.color[1] - 0.75).abs() < 1e-6);
        assert_eq!(lit.color[3], 0.75);

        // Normal faces -z: the Lambert term clamps to zero.
        let mut unlit = Vertex {
            normal: [0.0, 0.0, -1.0],
            ..Vertex::default()
        };
        shade_lambert(&mut unlit, &light, &material);
        assert!((unlit.color[0] - 0.25).abs() < 1e-6);
        assert!((unlit.color[1] - 0.25).abs() < 1e-6);
    }
}
