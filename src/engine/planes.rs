//! Floor, ceiling and sky rasterization.
//!
//! Runs once per frame after the BSP walk, turning every collected
//! [`Visplane`] into horizontal spans (or sky columns).

use crate::engine::{
    column::{ColumnJob, draw_column},
    lighting::LightingTables,
    trig::x_to_view_angle,
    types::{FrameStats, RenderContext, Screen, STANDARD_WIDTH, View},
    visplane::{Visplane, Visplanes},
};

/// Sky textures wrap once per this many columns around the circle.
pub const SKY_COLUMN_FACTOR: f32 = 1024.0;
/// Texture row drawn at the screen's center row.
pub const SKY_TEXTURE_MID: f32 = 100.0;

/// Per-row values that only change with the plane height.
#[derive(Clone, Copy)]
struct RowCache {
    height: f32,
    distance: f32,
    x_step: f32,
    y_step: f32,
}

const EMPTY_ROW: RowCache = RowCache {
    height: f32::NAN,
    distance: 0.0,
    x_step: 0.0,
    y_step: 0.0,
};

/// One plane being turned into spans.
struct SpanSource<'a> {
    flat: &'a [u8],
    /// Absolute height above or below the eye.
    height: f32,
    light: usize,
}

pub struct PlaneRenderer {
    /// Distance multiplier per screen row.
    y_slope: Vec<f32>,
    /// View angle and 1/cos of it per screen column.
    x_angle: Vec<f32>,
    dist_scale: Vec<f32>,
    span_start: Vec<i32>,
    cache: Vec<RowCache>,
    base_x_scale: f32,
    base_y_scale: f32,
}

impl Default for PlaneRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneRenderer {
    pub fn new() -> Self {
        Self {
            y_slope: Vec::new(),
            x_angle: Vec::new(),
            dist_scale: Vec::new(),
            span_start: Vec::new(),
            cache: Vec::new(),
            base_x_scale: 0.0,
            base_y_scale: 0.0,
        }
    }

    /// Rebuild the per-row and per-column tables for a resolution.
    pub fn resize(&mut self, view: &View) {
        self.y_slope = (0..view.height)
            .map(|y| {
                let dy = (y as f32 - view.center_y_frac + 0.5).abs();
                view.projection / dy
            })
            .collect();
        self.x_angle = (0..view.width as i32)
            .map(|x| x_to_view_angle(view, x))
            .collect();
        self.dist_scale = self.x_angle.iter().map(|a| 1.0 / a.cos()).collect();
        self.span_start = vec![0; view.height];
        self.cache = vec![EMPTY_ROW; view.height];
    }

    /// Draw every plane collected this frame.
    pub fn draw_planes(
        &mut self,
        ctx: &RenderContext,
        visplanes: &mut Visplanes,
        screen: &mut Screen,
        stats: &mut FrameStats,
    ) {
        let frame = ctx.frame;
        let (sin, cos) = frame.angle.sin_cos();
        self.base_x_scale = sin / ctx.view.projection;
        self.base_y_scale = cos / ctx.view.projection;
        self.cache.fill(EMPTY_ROW);

        for pl in visplanes.as_mut_slice() {
            if pl.min_x > pl.max_x {
                continue;
            }

            if Some(pl.flat) == ctx.level.sky_flat {
                stats.sky_columns += self.draw_sky(ctx, pl, screen);
                continue;
            }

            let light = match frame.fixed_colormap {
                Some(_) => 0,
                None => LightingTables::light_index(pl.light, frame.extra_light),
            };
            let source = SpanSource {
                flat: ctx.catalog.flat(pl.flat),
                height: (pl.height - frame.z).abs(),
                light,
            };

            pl.seal_edges();
            for x in pl.min_x..=pl.max_x + 1 {
                stats.spans += self.make_spans(
                    ctx,
                    &source,
                    screen,
                    x,
                    (pl.top(x - 1), pl.bottom(x - 1)),
                    (pl.top(x), pl.bottom(x)),
                );
            }
        }
    }

    /// Close the spans that end at column `x - 1` and open the ones starting
    /// at `x`, given the row ranges of the previous and current column.
    fn make_spans(
        &mut self,
        ctx: &RenderContext,
        source: &SpanSource,
        screen: &mut Screen,
        x: i32,
        prev: (u16, u16),
        cur: (u16, u16),
    ) -> usize {
        let (mut t1, mut b1) = (prev.0 as i32, prev.1 as i32);
        let (mut t2, mut b2) = (cur.0 as i32, cur.1 as i32);
        let mut spans = 0;

        while t1 < t2 && t1 <= b1 {
            self.map_plane(ctx, source, screen, t1, self.span_start[t1 as usize], x - 1);
            spans += 1;
            t1 += 1;
        }
        while b1 > b2 && b1 >= t1 {
            self.map_plane(ctx, source, screen, b1, self.span_start[b1 as usize], x - 1);
            spans += 1;
            b1 -= 1;
        }
        while t2 < t1 && t2 <= b2 {
            self.span_start[t2 as usize] = x;
            t2 += 1;
        }
        while b2 > b1 && b2 >= t2 {
            self.span_start[b2 as usize] = x;
            b2 -= 1;
        }
        spans
    }

    /// Texture one row of a flat from column `x1` to `x2`.
    fn map_plane(
        &mut self,
        ctx: &RenderContext,
        source: &SpanSource,
        screen: &mut Screen,
        y: i32,
        x1: i32,
        x2: i32,
    ) {
        let row = &mut self.cache[y as usize];
        if row.height != source.height {
            let distance = source.height * self.y_slope[y as usize];
            *row = RowCache {
                height: source.height,
                distance,
                x_step: distance * self.base_x_scale,
                y_step: distance * self.base_y_scale,
            };
        }
        let row = *row;

        let frame = ctx.frame;
        let length = row.distance * self.dist_scale[x1 as usize];
        let (sin, cos) = (frame.angle + self.x_angle[x1 as usize]).sin_cos();
        let mut u = frame.pos.x + cos * length;
        let mut v = -frame.pos.y - sin * length;

        let cmap_row = frame
            .fixed_colormap
            .unwrap_or_else(|| ctx.lighting.plane_row(source.light, row.distance));
        let colormap = &ctx.catalog.colormaps()[cmap_row];

        for x in x1..=x2 {
            let spot = ((v.floor() as i32 & 63) << 6) | (u.floor() as i32 & 63);
            screen.put(x as usize, y as usize, colormap[source.flat[spot as usize] as usize]);
            u += row.x_step;
            v += row.y_step;
        }
    }

    /// Sky: one texture column per screen column, chosen by view angle,
    /// always at full brightness.
    fn draw_sky(&self, ctx: &RenderContext, pl: &Visplane, screen: &mut Screen) -> usize {
        let view = ctx.view;
        let texture = ctx.level.sky_texture;
        let colormap = &ctx.catalog.colormaps()[0];
        let step = STANDARD_WIDTH as f32 / view.width as f32;
        let mut columns = 0;

        for x in pl.min_x..=pl.max_x {
            if !pl.is_set(x) {
                continue;
            }
            let (top, bottom) = (pl.top(x) as i32, pl.bottom(x) as i32);
            if top > bottom {
                continue;
            }
            let angle = ctx.frame.angle + self.x_angle[x as usize];
            let col = (angle / std::f32::consts::TAU * SKY_COLUMN_FACTOR).floor() as i32;
            draw_column(
                screen,
                view,
                &ColumnJob {
                    x,
                    y_start: top,
                    y_end: bottom,
                    texture_mid: SKY_TEXTURE_MID,
                    step,
                    source: ctx.catalog.column(texture, col),
                    colormap,
                },
            );
            columns += 1;
        }
        columns
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
