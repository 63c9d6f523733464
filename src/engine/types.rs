use std::f32::consts::TAU;

use glam::Vec2;

use crate::{
    engine::lighting::LightingTables,
    world::{Level, SegmentId, TextureCatalog},
};

/// Largest frame-buffer the fixed per-column/per-row tables are sized for.
pub const MAX_SCREEN_WIDTH: usize = 1280;
pub const MAX_SCREEN_HEIGHT: usize = 800;

/// Geometry the lighting and sky constants were tuned for.
pub const STANDARD_WIDTH: usize = 320;
pub const STANDARD_HEIGHT: usize = 200;

/// Horizontal field of view, fixed.
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_2;

/// Viewer state for one render call.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    pub pos: Vec2,
    /// Absolute eye height.
    pub z: f32,
    /// Facing, radians (0 = east, counter-clockwise).
    pub angle: f32,
    /// Added to every sector light level, in light-table steps.
    pub extra_light: i32,
    /// Replaces all lighting with one colour map row (full-bright effects).
    pub fixed_colormap: Option<usize>,
}

impl Frame {
    pub fn new(pos: Vec2, z: f32, angle: f32) -> Self {
        Self {
            pos,
            z,
            angle: angle.rem_euclid(TAU),
            extra_light: 0,
            fixed_colormap: None,
        }
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the viewer looks.
    #[inline(always)]
    pub fn forward(&self) -> Vec2 {
        let (s, c) = self.angle.sin_cos();
        Vec2::new(c, s)
    }

    /// Unit vector pointing to the viewer's right.
    #[inline(always)]
    pub fn right(&self) -> Vec2 {
        let f = self.forward();
        Vec2::new(f.y, -f.x)
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe, + right).
    pub fn step(&mut self, forward: f32, side: f32) {
        self.pos += self.forward() * forward + self.right() * side;
    }

    /// Rotate around Z (positive = turn left).
    pub fn turn(&mut self, delta: f32) {
        self.angle = (self.angle + delta).rem_euclid(TAU);
    }
}

/// Resolution-derived projection constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub width: usize,
    pub height: usize,
    pub center_x: i32,
    pub center_y: i32,
    pub center_x_frac: f32,
    pub center_y_frac: f32,
    /// Distance of the projection plane, in pixels.
    pub projection: f32,
    /// Half of the horizontal field of view.
    pub clip_angle: f32,
}

impl View {
    pub fn new(width: usize, height: usize) -> Self {
        let center_x = (width / 2) as i32;
        let center_y = (height / 2) as i32;
        let center_x_frac = center_x as f32;
        let projection = center_x_frac / (FIELD_OF_VIEW * 0.5).tan();
        Self {
            width,
            height,
            center_x,
            center_y,
            center_x_frac,
            center_y_frac: center_y as f32,
            projection,
            clip_angle: (center_x_frac / projection).atan(),
        }
    }
}

/// The 8-bit frame buffer the pipeline writes into.
#[derive(Clone, Debug, Default)]
pub struct Screen {
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
}

impl Screen {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            pixels: vec![0; w * h],
        }
    }

    #[inline(always)]
    pub fn put(&mut self, x: usize, y: usize, color: u8) {
        self.pixels[y * self.w + x] = color;
    }
}

/// One stored wall range, kept until the next frame starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawSeg {
    pub seg: SegmentId,
    pub x1: i32,
    pub x2: i32,
    pub scale1: f32,
    pub scale2: f32,
    pub scale_step: f32,
}

/// Read-only inputs shared by every stage of one frame.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub level: &'a Level,
    pub frame: &'a Frame,
    pub view: &'a View,
    pub catalog: &'a TextureCatalog,
    pub lighting: &'a LightingTables,
}

/// Counters gathered while rendering one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub subsectors: usize,
    pub wall_ranges: usize,
    pub wall_columns: usize,
    pub wall_pixels: usize,
    pub visplanes: usize,
    pub spans: usize,
    pub sky_columns: usize,
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn forward_and_right_are_orthonormal() {
        let f = Frame::new(Vec2::ZERO, 0.0, 0.3);
        assert!((f.forward().length() - 1.0).abs() < 1e-5);
        assert!((f.right().length() - 1.0).abs() < 1e-5);
        assert!(f.forward().dot(f.right()).abs() < 1e-5);
    }

    #[test]
    fn step_and_turn() {
        let mut f = Frame::new(Vec2::ZERO, 41.0, 0.0);
        f.step(10.0, 0.0);
        assert!((f.pos - Vec2::new(10.0, 0.0)).length() < 1e-5);
        f.step(0.0, 5.0);
        assert!((f.pos - Vec2::new(10.0, -5.0)).length() < 1e-5);
        f.turn(-FRAC_PI_2);
        assert!((f.angle - 3.0 * FRAC_PI_2).abs() < 1e-5, "angle wraps into [0, 2π)");
    }

    #[test]
    fn view_at_90_degrees() {
        let v = View::new(640, 400);
        assert_eq!((v.center_x, v.center_y), (320, 200));
        assert!((v.projection - 320.0).abs() < 1e-3);
        assert!((v.clip_angle - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
    }
}
