use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;

use crate::world::texture::{FlatId, TextureId};

pub type SubsectorId = u16;
pub type LinedefId = u16;
pub type SegmentId = u16;
pub type VertexId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;

/// Runtime snapshot of one map.
///
/// Built once by a loader (or [`LevelBuilder`](crate::world::LevelBuilder)),
/// then borrowed read-only by the renderer. Every index stored in here must
/// be valid: the renderer trusts the loader and only checks with
/// `debug_assert!`.
#[derive(Debug, Default)]
pub struct Level {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub sectors: Vec<Sector>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    /// Flat that marks a ceiling (or floor) as open sky.
    pub sky_flat: Option<FlatId>,
    /// Wall texture painted wherever `sky_flat` is visible.
    pub sky_texture: TextureId,
}

/*--------------------------- linedefs -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE      = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0008;
        const LOWER_UNPEGGED  = 0x0010;
        const SECRET          = 0x0020;
        const BLOCK_SOUND     = 0x0040;
        const NOT_ON_MAP      = 0x0080;
        const ALREADY_ON_MAP  = 0x0100;
    }
}

/// Orientation class of a line, used by the fake-contrast lighting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlopeType {
    #[default]
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

impl SlopeType {
    pub fn of(delta: Vec2) -> Self {
        if delta.x == 0.0 {
            SlopeType::Vertical
        } else if delta.y == 0.0 {
            SlopeType::Horizontal
        } else if delta.y / delta.x > 0.0 {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        }
    }
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    pub flags: LinedefFlags,
    pub special: u16,
    pub tag: u16,
    pub right_sidedef: Option<SidedefId>,
    pub left_sidedef: Option<SidedefId>,

    // derived by `Level::finalise`
    pub delta: Vec2,
    pub bbox: Aabb,
    pub slope: SlopeType,
    pub front_sector: Option<SectorId>,
    pub back_sector: Option<SectorId>,
}

impl Linedef {
    pub fn new(v1: VertexId, v2: VertexId, flags: LinedefFlags) -> Self {
        Self {
            v1,
            v2,
            flags,
            special: 0,
            tag: 0,
            right_sidedef: None,
            left_sidedef: None,
            delta: Vec2::ZERO,
            bbox: Aabb::default(),
            slope: SlopeType::default(),
            front_sector: None,
            back_sector: None,
        }
    }
}

/*--------------------------- sidedefs -------------------------------*/

#[derive(Clone, Debug)]
pub struct Sidedef {
    pub x_off: f32,
    pub y_off: f32,
    pub upper: TextureId,
    pub lower: TextureId,
    pub middle: TextureId,
    pub sector: SectorId,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub pos: Vec2,
}

/// A linedef clipped to the extent of one subsector.
#[derive(Clone, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    pub linedef: LinedefId,
    /// 0 = runs along the right sidedef, 1 = along the left one.
    pub dir: u16,
    /// Distance from the linedef start to `v1`, in map units.
    pub offset: f32,

    // derived by `Level::finalise`
    pub angle: f32,
    pub length: f32,
    pub sidedef: SidedefId,
    pub front_sector: SectorId,
    pub back_sector: Option<SectorId>,
}

impl Seg {
    pub fn new(v1: VertexId, v2: VertexId, linedef: LinedefId, dir: u16, offset: f32) -> Self {
        Self {
            v1,
            v2,
            linedef,
            dir,
            offset,
            angle: 0.0,
            length: 0.0,
            sidedef: 0,
            front_sector: 0,
            back_sector: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Subsector {
    pub seg_count: u16,
    pub first_seg: SegmentId,
    /// Filled by `Level::finalise` from the first seg.
    pub sector: SectorId,
}

/// Axis-aligned box: `min` = (left, bottom), `max` = (right, top).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min.x
    }
    #[inline]
    pub fn right(&self) -> f32 {
        self.max.x
    }
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.min.y
    }
    #[inline]
    pub fn top(&self) -> f32 {
        self.max.y
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub bbox: [Aabb; 2],
    /// Tagged children, see [`crate::world::bsp::SUBSECTOR_BIT`].
    pub child: [u16; 2],
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_h: f32,
    pub ceil_h: f32,
    pub floor_tex: FlatId,
    pub ceil_tex: FlatId,
    /// 0..=255, brightest at 255.
    pub light: i16,
    pub special: i16,
    pub tag: i16,
    /// Lines bounding the sector (filled by `Level::finalise`).
    pub lines: SmallVec<[LinedefId; 8]>,
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
