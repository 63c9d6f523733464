//! ----------------------------------------------------------------------------
//! **BSP front-to-back traversal**
//!
//! Responsible for
//! * visiting subsectors nearest-first, skipping subtrees whose bounding box
//!   is outside the view or already hidden behind solid walls
//! * picking the floor and ceiling visplanes of each visited subsector
//! * handing every seg to the wall stage (`engine::walls`)
//!
//! All per-frame clip state (solid ranges, per-column clips, stored draw
//! segs, visplanes) lives in [`BspRenderer`] and is reset by
//! [`BspRenderer::begin_frame`].
//! ----------------------------------------------------------------------------

use crate::{
    engine::{
        clip::ClipRangeArray,
        error::RenderError,
        trig::{AngleSpan, clip_angle_span, view_angle_to_x},
        types::{DrawSeg, FrameStats, RenderContext, Screen, View},
        visplane::{VisplaneId, Visplanes},
    },
    world::{Aabb, SubsectorId, bsp::BspChild},
};
use glam::Vec2;

/// Box sides in the order the corner table indexes them.
const BOX_TOP: usize = 0;
const BOX_BOTTOM: usize = 1;
const BOX_LEFT: usize = 2;
const BOX_RIGHT: usize = 3;

/// For each viewer position relative to a box (3×3 grid, row-major from the
/// top-left, with a padding column), the two corners spanning its silhouette
/// as `[x1, y1, x2, y2]` box-side indices.
const CHECK_COORD: [[usize; 4]; 11] = [
    [BOX_RIGHT, BOX_TOP, BOX_LEFT, BOX_BOTTOM],
    [BOX_RIGHT, BOX_TOP, BOX_LEFT, BOX_TOP],
    [BOX_RIGHT, BOX_BOTTOM, BOX_LEFT, BOX_TOP],
    [0; 4],
    [BOX_LEFT, BOX_TOP, BOX_LEFT, BOX_BOTTOM],
    [0; 4],
    [BOX_RIGHT, BOX_BOTTOM, BOX_RIGHT, BOX_TOP],
    [0; 4],
    [BOX_LEFT, BOX_TOP, BOX_RIGHT, BOX_BOTTOM],
    [BOX_LEFT, BOX_BOTTOM, BOX_RIGHT, BOX_BOTTOM],
    [BOX_LEFT, BOX_BOTTOM, BOX_RIGHT, BOX_TOP],
];

pub struct BspRenderer {
    pub(super) occlusion: ClipRangeArray,
    /// Lowest row hidden by something above, per column (-1 = nothing).
    pub(super) ceiling_clip: Vec<i32>,
    /// Highest row hidden by something below, per column (height = nothing).
    pub(super) floor_clip: Vec<i32>,
    pub(super) draw_segs: Vec<DrawSeg>,
    pub(super) visplanes: Visplanes,
    /// Planes of the subsector currently being drawn.
    pub(super) floor_plane: Option<VisplaneId>,
    pub(super) ceiling_plane: Option<VisplaneId>,
    pub(super) stats: FrameStats,
    visited: Vec<SubsectorId>,
}

impl Default for BspRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BspRenderer {
    pub fn new() -> Self {
        Self {
            occlusion: ClipRangeArray::new(),
            ceiling_clip: Vec::new(),
            floor_clip: Vec::new(),
            draw_segs: Vec::new(),
            visplanes: Visplanes::new(),
            floor_plane: None,
            ceiling_plane: None,
            stats: FrameStats::default(),
            visited: Vec::new(),
        }
    }

    /// Reset every per-frame structure for a frame of `view`'s size.
    pub fn begin_frame(&mut self, view: &View) {
        self.occlusion.reset(view.width);
        self.ceiling_clip.clear();
        self.ceiling_clip.resize(view.width, -1);
        self.floor_clip.clear();
        self.floor_clip.resize(view.width, view.height as i32);
        self.draw_segs.clear();
        self.visplanes.clear(view.width);
        self.floor_plane = None;
        self.ceiling_plane = None;
        self.stats = FrameStats::default();
        self.visited.clear();
    }

    /*──────────────────────────── accessors ─────────────────────────*/

    pub fn occlusion(&self) -> &ClipRangeArray {
        &self.occlusion
    }

    pub fn draw_segs(&self) -> &[DrawSeg] {
        &self.draw_segs
    }

    pub fn visplanes(&self) -> &Visplanes {
        &self.visplanes
    }

    /// The collected planes together with the counters their drawing
    /// updates.
    pub(super) fn planes_mut(&mut self) -> (&mut Visplanes, &mut FrameStats) {
        (&mut self.visplanes, &mut self.stats)
    }

    /// Subsectors in the order they were drawn this frame.
    pub fn visited(&self) -> &[SubsectorId] {
        &self.visited
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /*──────────────────────────── traversal ─────────────────────────*/

    /// Walk the subtree under the tagged child `raw`, near side first.
    pub fn render_bsp_node(
        &mut self,
        ctx: &RenderContext,
        screen: &mut Screen,
        raw: u16,
    ) -> Result<(), RenderError> {
        match BspChild::decode(raw) {
            BspChild::Subsector(ss) => self.render_subsector(ctx, screen, ss),
            BspChild::Node(idx) => {
                let node = &ctx.level.nodes[idx];
                let side = node.point_side(ctx.frame.pos);

                self.render_bsp_node(ctx, screen, node.child[side])?;

                if self.check_bbox(ctx, &node.bbox[side ^ 1]) {
                    self.render_bsp_node(ctx, screen, node.child[side ^ 1])?;
                }
                Ok(())
            }
        }
    }

    /// Whether any part of `bbox` may still show: inside the field of view
    /// and not completely behind solid walls.
    pub fn check_bbox(&self, ctx: &RenderContext, bbox: &Aabb) -> bool {
        let pos = ctx.frame.pos;

        let box_x = if pos.x <= bbox.left() {
            0
        } else if pos.x < bbox.right() {
            1
        } else {
            2
        };
        let box_y = if pos.y >= bbox.top() {
            0
        } else if pos.y > bbox.bottom() {
            1
        } else {
            2
        };

        let box_pos = box_y * 4 + box_x;
        if box_pos == 5 {
            // viewer inside the box
            return true;
        }

        let sides = [bbox.top(), bbox.bottom(), bbox.left(), bbox.right()];
        let [x1, y1, x2, y2] = CHECK_COORD[box_pos].map(|i| sides[i]);

        let (a1, a2) = match clip_angle_span(
            ctx.frame,
            ctx.view.clip_angle,
            Vec2::new(x1, y1),
            Vec2::new(x2, y2),
        ) {
            AngleSpan::OnLine => return true,
            AngleSpan::Outside => return false,
            AngleSpan::Visible { a1, a2 } => (a1, a2),
        };

        let sx1 = view_angle_to_x(ctx.view, a1);
        let sx2 = view_angle_to_x(ctx.view, a2);
        if sx1 == sx2 {
            return false;
        }
        !self.occlusion.is_covered(sx1, sx2 - 1)
    }

    fn render_subsector(
        &mut self,
        ctx: &RenderContext,
        screen: &mut Screen,
        id: SubsectorId,
    ) -> Result<(), RenderError> {
        let level = ctx.level;
        debug_assert!((id as usize) < level.subsectors.len(), "subsector {id} out of range");
        let ss = &level.subsectors[id as usize];
        let sector = &level.sectors[ss.sector as usize];
        let z = ctx.frame.z;

        self.visited.push(id);
        self.stats.subsectors += 1;

        self.floor_plane = (sector.floor_h < z).then(|| {
            self.visplanes
                .find(level.sky_flat, sector.floor_h, sector.floor_tex, sector.light)
        });
        self.ceiling_plane = (sector.ceil_h > z || Some(sector.ceil_tex) == level.sky_flat)
            .then(|| {
                self.visplanes
                    .find(level.sky_flat, sector.ceil_h, sector.ceil_tex, sector.light)
            });

        let first = ss.first_seg;
        for seg in first..first + ss.seg_count {
            self.render_line(ctx, screen, seg)?;
        }
        Ok(())
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
