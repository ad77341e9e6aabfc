//! Pipeline stage tags.

/// Identifies which pipeline stage a task or allocation belongs to.
///
/// Tags route work to per-stage profile counters and allocation accounting;
/// they impose no scheduling order. Stage ordering is achieved structurally:
/// each stage submits the next stage's task as its final action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageTag {
    Vertex,
    Primitive,
    Raster,
    Fragment,
    Framebuffer,
}

pub const STAGE_COUNT: usize = 5;

impl StageTag {
    pub const ALL: [StageTag; STAGE_COUNT] = [
        StageTag::Vertex,
        StageTag::Primitive,
        StageTag::Raster,
        StageTag::Fragment,
        StageTag::Framebuffer,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            StageTag::Vertex => 0,
            StageTag::Primitive => 1,
            StageTag::Raster => 2,
            StageTag::Fragment => 3,
            StageTag::Framebuffer => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageTag::Vertex => "Vertex",
            StageTag::Primitive => "Primitive",
            StageTag::Raster => "Raster",
            StageTag::Fragment => "Fragment",
            StageTag::Framebuffer => "Framebuffer",
        }
    }
}
