//! Wall stage: project a seg, clip it against the solid ranges and draw the
//! visible columns, updating the per-column clips and marking floor/ceiling
//! rows on the current visplanes as it goes.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use smallvec::SmallVec;

use crate::{
    engine::{
        bsp::BspRenderer,
        column::{ColumnJob, draw_column},
        error::RenderError,
        lighting::LightingTables,
        trig::{
            AngleSpan, clip_angle_span, distance_to_line, normalize, scale_from_global_angle,
            view_angle_to_x, x_to_view_angle,
        },
        types::{DrawSeg, RenderContext, Screen},
        visplane::VisplaneId,
    },
    world::{LinedefFlags, NO_TEXTURE, Sector, SegmentId, TextureId},
};

/// One textured wall piece (upper, middle or lower) and the texture row
/// pinned to the screen's center row.
#[derive(Clone, Copy)]
struct WallPiece {
    texture: TextureId,
    texture_mid: f32,
}

/// Everything the column loop needs for one stored wall range.
struct SegLoop {
    mid: Option<WallPiece>,
    top: Option<WallPiece>,
    bottom: Option<WallPiece>,

    mark_floor: Option<VisplaneId>,
    mark_ceiling: Option<VisplaneId>,

    scale: f32,
    scale_step: f32,
    top_frac: f32,
    top_step: f32,
    bottom_frac: f32,
    bottom_step: f32,
    pix_high: f32,
    pix_high_step: f32,
    pix_low: f32,
    pix_low_step: f32,

    /// Texture-column mapping; only meaningful when a piece is drawn.
    offset: f32,
    center_angle: f32,
    distance: f32,
    light: usize,
}

impl SegLoop {
    fn textured(&self) -> bool {
        self.mid.is_some() || self.top.is_some() || self.bottom.is_some()
    }
}

fn piece(texture: TextureId, texture_mid: f32) -> Option<WallPiece> {
    (texture != NO_TEXTURE).then_some(WallPiece {
        texture,
        texture_mid,
    })
}

/// Same ceiling, floor, light and no middle texture: the line changes
/// nothing on screen.
fn is_invisible_boundary(front: &Sector, back: &Sector, middle: TextureId) -> bool {
    back.ceil_tex == front.ceil_tex
        && back.floor_tex == front.floor_tex
        && back.light == front.light
        && middle == NO_TEXTURE
}

/// Light row for a wall: axis-aligned walls get fake contrast, one row
/// darker when horizontal on the map and one brighter when vertical. The
/// bias joins the frame's extra light before the single clamp.
fn wall_light(level: i16, extra_light: i32, v1: Vec2, v2: Vec2) -> usize {
    let contrast = if v1.y == v2.y {
        -1
    } else if v1.x == v2.x {
        1
    } else {
        0
    };
    LightingTables::light_index(level, extra_light + contrast)
}

impl BspRenderer {
    /// Clip one seg against the view and the solid ranges, then draw what
    /// remains.
    pub(super) fn render_line(
        &mut self,
        ctx: &RenderContext,
        screen: &mut Screen,
        id: SegmentId,
    ) -> Result<(), RenderError> {
        let level = ctx.level;
        let seg = &level.segs[id as usize];
        let v1 = level.vertices[seg.v1 as usize].pos;
        let v2 = level.vertices[seg.v2 as usize].pos;

        let (a1, a2) = match clip_angle_span(ctx.frame, ctx.view.clip_angle, v1, v2) {
            AngleSpan::Visible { a1, a2 } => (a1, a2),
            AngleSpan::OnLine | AngleSpan::Outside => return Ok(()),
        };

        let x1 = view_angle_to_x(ctx.view, a1);
        let x2 = view_angle_to_x(ctx.view, a2);
        if x1 == x2 {
            return Ok(());
        }

        let front = &level.sectors[seg.front_sector as usize];
        let solid = match seg.back_sector.map(|b| &level.sectors[b as usize]) {
            None => true,
            Some(back) if back.ceil_h <= front.floor_h || back.floor_h >= front.ceil_h => true,
            Some(back) if back.ceil_h != front.ceil_h || back.floor_h != front.floor_h => false,
            Some(back) => {
                let middle = level.sidedefs[seg.sidedef as usize].middle;
                if is_invisible_boundary(front, back, middle) {
                    return Ok(());
                }
                false
            }
        };

        let mut fragments: SmallVec<[(i32, i32); 8]> = SmallVec::new();
        self.occlusion
            .clip_segment(x1, x2 - 1, solid, |first, last| fragments.push((first, last)))?;

        for (first, last) in fragments {
            self.store_wall_range(ctx, screen, id, first, last)?;
        }
        Ok(())
    }

    /// Project columns `start..=stop` of seg `id`, record the draw seg and
    /// run the column loop.
    fn store_wall_range(
        &mut self,
        ctx: &RenderContext,
        screen: &mut Screen,
        id: SegmentId,
        start: i32,
        stop: i32,
    ) -> Result<(), RenderError> {
        let (level, frame, view) = (ctx.level, ctx.frame, ctx.view);
        let seg = &level.segs[id as usize];
        let line = &level.linedefs[seg.linedef as usize];
        let side = &level.sidedefs[seg.sidedef as usize];
        let front = &level.sectors[seg.front_sector as usize];
        let back = seg.back_sector.map(|b| &level.sectors[b as usize]);
        let v1 = level.vertices[seg.v1 as usize].pos;
        let v2 = level.vertices[seg.v2 as usize].pos;
        let sky = level.sky_flat;
        let z = frame.z;

        self.stats.wall_ranges += 1;

        let normal_angle = normalize(seg.angle + FRAC_PI_2);
        let distance = distance_to_line(frame.pos, v1, v2);

        let scale1 = scale_from_global_angle(
            view,
            frame,
            normal_angle,
            distance,
            frame.angle + x_to_view_angle(view, start),
        );
        let (scale2, scale_step) = if stop > start {
            let scale2 = scale_from_global_angle(
                view,
                frame,
                normal_angle,
                distance,
                frame.angle + x_to_view_angle(view, stop),
            );
            (scale2, (scale2 - scale1) / (stop - start) as f32)
        } else {
            (scale1, 0.0)
        };

        self.draw_segs.push(DrawSeg {
            seg: id,
            x1: start,
            x2: stop,
            scale1,
            scale2,
            scale_step,
        });

        let mut world_top = front.ceil_h - z;
        let world_bottom = front.floor_h - z;
        let mut world_high = 0.0;
        let mut world_low = 0.0;

        let (mid, top, bottom, mut mark_floor, mut mark_ceiling) = match back {
            None => {
                let texture_mid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                    front.floor_h + ctx.catalog.height(side.middle) - z
                } else {
                    world_top
                };
                (piece(side.middle, texture_mid + side.y_off), None, None, true, true)
            }
            Some(back) => {
                world_high = back.ceil_h - z;
                world_low = back.floor_h - z;

                // both ceilings open to the sky: the upper wall is sky too
                if Some(front.ceil_tex) == sky && Some(back.ceil_tex) == sky {
                    world_top = world_high;
                }

                let mut mark_floor = world_low != world_bottom
                    || back.floor_tex != front.floor_tex
                    || back.light != front.light;
                let mut mark_ceiling = world_high != world_top
                    || back.ceil_tex != front.ceil_tex
                    || back.light != front.light;

                if back.ceil_h <= front.floor_h || back.floor_h >= front.ceil_h {
                    // closed door
                    mark_floor = true;
                    mark_ceiling = true;
                }

                let top = if world_high < world_top {
                    let texture_mid = if line.flags.contains(LinedefFlags::UPPER_UNPEGGED) {
                        world_top
                    } else {
                        back.ceil_h + ctx.catalog.height(side.upper) - z
                    };
                    piece(side.upper, texture_mid + side.y_off)
                } else {
                    None
                };
                let bottom = if world_low > world_bottom {
                    let texture_mid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                        world_top
                    } else {
                        world_low
                    };
                    piece(side.lower, texture_mid + side.y_off)
                } else {
                    None
                };
                (None, top, bottom, mark_floor, mark_ceiling)
            }
        };

        // surfaces on the far side of the eye never show
        if front.floor_h >= z {
            mark_floor = false;
        }
        if front.ceil_h <= z && Some(front.ceil_tex) != sky {
            mark_ceiling = false;
        }

        let light = wall_light(front.light, frame.extra_light, v1, v2);

        let dir = v2 - v1;
        let offset = (frame.pos - v1).dot(dir) / seg.length.max(f32::EPSILON) + side.x_off + seg.offset;

        let center_y = view.center_y_frac;
        let mut lp = SegLoop {
            mid,
            top,
            bottom,
            mark_floor: None,
            mark_ceiling: None,
            scale: scale1,
            scale_step,
            top_frac: center_y - world_top * scale1,
            top_step: -(scale_step * world_top),
            bottom_frac: center_y - world_bottom * scale1,
            bottom_step: -(scale_step * world_bottom),
            pix_high: center_y - world_high * scale1,
            pix_high_step: -(scale_step * world_high),
            pix_low: center_y - world_low * scale1,
            pix_low_step: -(scale_step * world_low),
            offset,
            center_angle: FRAC_PI_2 + frame.angle - normal_angle,
            distance,
            light,
        };

        if mark_ceiling {
            lp.mark_ceiling = self
                .ceiling_plane
                .map(|pl| self.visplanes.check(pl, start, stop));
            self.ceiling_plane = lp.mark_ceiling;
        }
        if mark_floor {
            lp.mark_floor = self
                .floor_plane
                .map(|pl| self.visplanes.check(pl, start, stop));
            self.floor_plane = lp.mark_floor;
        }

        self.render_seg_loop(ctx, screen, &mut lp, start, stop);
        Ok(())
    }

    /// Draw columns `start..=stop` and update the clip arrays.
    fn render_seg_loop(
        &mut self,
        ctx: &RenderContext,
        screen: &mut Screen,
        lp: &mut SegLoop,
        start: i32,
        stop: i32,
    ) {
        let view = ctx.view;
        let colormaps = ctx.catalog.colormaps();
        let height = view.height as i32;
        let textured = lp.textured();
        self.stats.wall_columns += (stop - start + 1) as usize;

        for x in start..=stop {
            let xi = x as usize;
            let ceil_clip = self.ceiling_clip[xi];
            let floor_clip = self.floor_clip[xi];

            let yl = (lp.top_frac.ceil() as i32).max(ceil_clip + 1);

            if let Some(pl) = lp.mark_ceiling {
                let top = ceil_clip + 1;
                let bottom = (yl - 1).min(floor_clip - 1);
                if top <= bottom {
                    self.visplanes.set_extents(pl, x, top, bottom);
                }
            }

            let yh = (lp.bottom_frac.floor() as i32).min(floor_clip - 1);

            if let Some(pl) = lp.mark_floor {
                let top = (yh + 1).max(ceil_clip + 1);
                let bottom = floor_clip - 1;
                if top <= bottom {
                    self.visplanes.set_extents(pl, x, top, bottom);
                }
            }

            let (column, colormap, step) = if textured {
                let angle = lp.center_angle + x_to_view_angle(view, x);
                let column = (lp.offset - (angle - FRAC_PI_2).tan() * lp.distance).floor() as i32;
                let row = ctx
                    .frame
                    .fixed_colormap
                    .unwrap_or_else(|| ctx.lighting.wall_row(lp.light, lp.scale));
                (column, &colormaps[row], 1.0 / lp.scale)
            } else {
                (0, &colormaps[0], 0.0)
            };

            let draw = |screen: &mut Screen, piece: WallPiece, y_start: i32, y_end: i32| {
                draw_column(
                    screen,
                    view,
                    &ColumnJob {
                        x,
                        y_start,
                        y_end,
                        texture_mid: piece.texture_mid,
                        step,
                        source: ctx.catalog.column(piece.texture, column),
                        colormap,
                    },
                )
            };

            if let Some(mid) = lp.mid {
                self.stats.wall_pixels += draw(screen, mid, yl, yh);
                self.ceiling_clip[xi] = height;
                self.floor_clip[xi] = -1;
            } else {
                if let Some(top) = lp.top {
                    let mid = (lp.pix_high.floor() as i32).min(floor_clip - 1);
                    lp.pix_high += lp.pix_high_step;
                    if mid >= yl {
                        self.stats.wall_pixels += draw(screen, top, yl, mid);
                        self.ceiling_clip[xi] = mid;
                    } else {
                        self.ceiling_clip[xi] = yl - 1;
                    }
                } else if lp.mark_ceiling.is_some() {
                    self.ceiling_clip[xi] = yl - 1;
                }

                if let Some(bottom) = lp.bottom {
                    let ceil_clip = self.ceiling_clip[xi];
                    let mid = (lp.pix_low.ceil() as i32).max(ceil_clip + 1);
                    lp.pix_low += lp.pix_low_step;
                    if mid <= yh {
                        self.stats.wall_pixels += draw(screen, bottom, mid, yh);
                        self.floor_clip[xi] = mid;
                    } else {
                        self.floor_clip[xi] = yh + 1;
                    }
                } else if lp.mark_floor.is_some() {
                    self.floor_clip[xi] = yh + 1;
                }
            }

            lp.scale += lp.scale_step;
            lp.top_frac += lp.top_step;
            lp.bottom_frac += lp.bottom_step;
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
