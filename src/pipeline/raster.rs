//! Raster stage: clip the triangle's bounding box to the framebuffer and emit
//! one fragment-tile job per covered tile of the tile grid.

use std::sync::Arc;

use crate::color::pack_rgba;
use crate::framebuffer::Framebuffer;
use crate::pipeline::jobs::RasterJob;
use crate::pipeline::Core;
use crate::scheduler::Task;
use crate::vertex::{Triangle, Vertex};

pub(crate) fn process(core: &Arc<Core>, mut job: Box<RasterJob>) {
    if let Some(fb) = job.fb.take() {
        rasterize_triangle(core, &job.tri, &fb);
    }
    job.reset();
    core.pools.raster.release(job);
}

/// Edge-function coefficients `(a, b, c)` for each directed triangle edge;
/// `a*x + b*y + c >= 0` for every edge means the point is inside a
/// counter-clockwise triangle.
pub(crate) fn edge_functions(tri: &Triangle) -> [[f32; 3]; 3] {
    let edge = |p: &Vertex, q: &Vertex| -> [f32; 3] {
        let a = q.y() - p.y();
        let b = p.x() - q.x();
        let c = q.x() * p.y() - p.x() * q.y();
        [-a, -b, -c]
    };
    [
        edge(&tri.v0, &tri.v1),
        edge(&tri.v1, &tri.v2),
        edge(&tri.v2, &tri.v0),
    ]
}

fn rasterize_triangle(core: &Arc<Core>, tri: &Triangle, fb: &Arc<Framebuffer>) {
    let min_x = tri.v0.x().min(tri.v1.x()).min(tri.v2.x());
    let max_x = tri.v0.x().max(tri.v1.x()).max(tri.v2.x());
    let min_y = tri.v0.y().min(tri.v1.y()).min(tri.v2.y());
    let max_y = tri.v0.y().max(tri.v1.y()).max(tri.v2.y());

    let x0 = (min_x.floor() as i64).max(0);
    let y0 = (min_y.floor() as i64).max(0);
    let x1 = (max_x.ceil() as i64).min(fb.width() as i64 - 1);
    let y1 = (max_y.ceil() as i64).min(fb.height() as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let (x0, y0, x1, y1) = (x0 as u32, y0 as u32, x1 as u32, y1 as u32);

    let color = pack_rgba(tri.v0.color);
    let depth = tri.min_depth();
    let edges = edge_functions(tri);
    let texcoords = [
        [tri.v0.texcoord[0], tri.v0.texcoord[1]],
        [tri.v1.texcoord[0], tri.v1.texcoord[1]],
        [tri.v2.texcoord[0], tri.v2.texcoord[1]],
    ];

    let tile = fb.tile_size();
    let mut ty = y0 / tile;
    while ty * tile <= y1 {
        let row_y0 = (ty * tile).max(y0);
        let row_y1 = (ty * tile + tile - 1).min(y1);
        let mut tx = x0 / tile;
        while tx * tile <= x1 {
            let mut next = core.pools.fragment_tile.acquire_or_alloc();
            next.x0 = (tx * tile).max(x0);
            next.y0 = row_y0;
            next.x1 = (tx * tile + tile - 1).min(x1);
            next.y1 = row_y1;
            next.color = color;
            next.depth = depth;
            next.edges = edges;
            next.texcoords = texcoords;
            next.sprite_mode = false;
            next.fb = Some(Arc::clone(fb));
            core.scheduler.submit(Task::FragmentTile(next));
            tx += 1;
        }
        ty += 1;
    }
}

/// Emits sprite-mode fragment-tile jobs covering a square point sprite
/// centered on the transformed vertex.
pub(crate) fn point_sprite_jobs(core: &Arc<Core>, v: &Vertex, size: f32, fb: &Arc<Framebuffer>) {
    let half = size.max(1.0) * 0.5;
    let (cx, cy) = (v.x(), v.y());

    let x0 = ((cx - half).floor() as i64).max(0);
    let y0 = ((cy - half).floor() as i64).max(0);
    let x1 = ((cx + half).ceil() as i64 - 1).min(fb.width() as i64 - 1);
    let y1 = ((cy + half).ceil() as i64 - 1).min(fb.height() as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let (x0, y0, x1, y1) = (x0 as u32, y0 as u32, x1 as u32, y1 as u32);

    let color = pack_rgba(v.color);
    // Sprite coverage is the whole rectangle, so the edge test is a no-op.
    let edges = [[0.0, 0.0, 1.0]; 3];

    let tile = fb.tile_size();
    let mut ty = y0 / tile;
    while ty * tile <= y1 {
        let row_y0 = (ty * tile).max(y0);
        let row_y1 = (ty * tile + tile - 1).min(y1);
        let mut tx = x0 / tile;
        while tx * tile <= x1 {
            let mut next = core.pools.fragment_tile.acquire_or_alloc();
            next.x0 = (tx * tile).max(x0);
            next.y0 = row_y0;
            next.x1 = (tx * tile + tile - 1).min(x1);
            next.y1 = row_y1;
            next.color = color;
            next.depth = v.z();
            next.edges = edges;
            next.texcoords = [[0.0, 0.0]; 3];
            next.sprite_mode = true;
            next.sprite_cx = cx;
            next.sprite_cy = cy;
            next.sprite_size = size.max(1.0);
            next.fb = Some(Arc::clone(fb));
            core.scheduler.submit(Task::FragmentTile(next));
            tx += 1;
        }
        ty += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_at(x: f32, y: f32) -> Vertex {
        Vertex {
            position: [x, y, 0.0, 1.0],
            ..Vertex::default()
        }
    }

    fn covered(edges: &[[f32; 3]; 3], x: f32, y: f32) -> bool {
        edges.iter().all(|e| e[0] * x + e[1] * y + e[2] >= 0.0)
    }

    #[test]
    fn edge_functions_classify_pixel_centers() {
        let tri = Triangle::new(vertex_at(0.0, 0.0), vertex_at(7.0, 0.0), vertex_at(0.0, 7.0));
        let edges = edge_functions(&tri);
        assert!(covered(&edges, 0.5, 0.5));
        assert!(covered(&edges, 3.0, 3.0));
        assert!(!covered(&edges, 7.5, 7.5));
        assert!(!covered(&edges, 4.0, 4.5));
    }

    #[test]
    fn shared_diagonal_is_covered_from_both_sides() {
        // The two halves of a square split along y = x.
        let lower = Triangle::new(vertex_at(0.0, 0.0), vertex_at(4.0, 0.0), vertex_at(4.0, 4.0));
        let upper = Triangle::new(vertex_at(0.0, 0.0), vertex_at(4.0, 4.0), vertex_at(0.0, 4.0));
        let lower_edges = edge_functions(&lower);
        let upper_edges = edge_functions(&upper);
        for (x, y) in [(0.5, 0.5), (3.5, 3.5), (2.5, 1.5), (1.5, 2.5)] {
            assert!(
                covered(&lower_edges, x, y) || covered(&upper_edges, x, y),
                "({x}, {y}) missed by both halves",
            );
        }
    }
}
