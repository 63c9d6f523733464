//! Angle helpers shared by the walker, the wall rasterizer and the planes.
//!
//! All angles are radians in `[0, 2π)`. "View" angles are measured from the
//! viewer's facing, positive to the left, so the visible wedge is
//! `[2π - clip, 2π) ∪ [0, clip]`.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;

use crate::engine::types::{Frame, View};

/// Perspective scale limits (1/256 .. 64 pixels per map unit).
pub const MIN_SCALE: f32 = 1.0 / 256.0;
pub const MAX_SCALE: f32 = 64.0;

/// Column edges closer than this to an integer snap onto it, so walls lying
/// exactly on the frustum edge still start at column 0.
const COLUMN_SNAP: f32 = 1.0 / 1024.0;

#[inline(always)]
pub fn normalize(a: f32) -> f32 {
    let r = a.rem_euclid(TAU);
    if r >= TAU { 0.0 } else { r }
}

/// World angle of the direction `from → to`.
#[inline]
pub fn point_to_angle(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    normalize(d.y.atan2(d.x))
}

/// Screen column at which the view angle `angle` lands, in `[0, width]`.
/// The right edge of the frustum maps to `width`, one past the last column.
pub fn view_angle_to_x(view: &View, angle: f32) -> i32 {
    let t = angle.tan() * view.projection;
    let x = (view.center_x_frac - t - COLUMN_SNAP).ceil();
    x.clamp(0.0, view.width as f32) as i32
}

/// View angle through the left edge of column `x`.
pub fn x_to_view_angle(view: &View, x: i32) -> f32 {
    normalize(((view.center_x_frac - x as f32) / view.projection).atan())
}

/// Signed perpendicular distance from `p` to the line `v1 → v2`;
/// positive on the right (front) side.
pub fn distance_to_line(p: Vec2, v1: Vec2, v2: Vec2) -> f32 {
    let d = v2 - v1;
    let normal = Vec2::new(d.y, -d.x).normalize_or_zero();
    (p - v1).dot(normal)
}

/// Wall scale at world angle `vis_angle`:
/// `projection·sin(B) / (distance·sin(A))`, clamped to `[MIN_SCALE, MAX_SCALE]`.
///
/// A vanishing or negative denominator yields `MAX_SCALE`, never NaN.
pub fn scale_from_global_angle(
    view: &View,
    frame: &Frame,
    normal_angle: f32,
    distance: f32,
    vis_angle: f32,
) -> f32 {
    let angle_a = FRAC_PI_2 + vis_angle - frame.angle;
    let angle_b = FRAC_PI_2 + vis_angle - normal_angle;
    let num = view.projection * angle_b.sin();
    let den = distance * angle_a.sin();

    if den > num * (1.0 / 65536.0) {
        (num / den).clamp(MIN_SCALE, MAX_SCALE)
    } else {
        MAX_SCALE
    }
}

/// Outcome of clipping the angular extent of an edge against the frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AngleSpan {
    /// Extent is half a circle or more: the viewer is on the line or behind
    /// it.
    OnLine,
    /// Entirely to one side of the field of view.
    Outside,
    /// View angles of both ends after clipping, `a1` left of `a2`.
    Visible { a1: f32, a2: f32 },
}

/// Project `p1 → p2` to view angles and clip them to `±clip_angle`.
pub fn clip_angle_span(frame: &Frame, clip_angle: f32, p1: Vec2, p2: Vec2) -> AngleSpan {
    let mut a1 = normalize(point_to_angle(frame.pos, p1) - frame.angle);
    let mut a2 = normalize(point_to_angle(frame.pos, p2) - frame.angle);

    let span = normalize(a1 - a2);
    if span >= PI {
        return AngleSpan::OnLine;
    }

    let wedge = 2.0 * clip_angle;

    let t = normalize(a1 + clip_angle);
    if t > wedge {
        if t - wedge >= span {
            return AngleSpan::Outside;
        }
        a1 = clip_angle;
    }

    let t = normalize(clip_angle - a2);
    if t > wedge {
        if t - wedge >= span {
            return AngleSpan::Outside;
        }
        a2 = normalize(-clip_angle);
    }

    AngleSpan::Visible { a1, a2 }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
