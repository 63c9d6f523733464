//! Programmatic level construction.
//!
//! Loaders that do not come from a WAD (procedural content, tests) describe
//! a map here with plain ids and let [`Level::finalise`] derive the rest.

use glam::{Vec2, vec2};
use smallvec::SmallVec;

use crate::world::{
    bsp::SUBSECTOR_BIT,
    geometry::{
        Aabb, Level, Linedef, LinedefFlags, LinedefId, Node, Sector, SectorId, Seg, SegmentId,
        Sidedef, SidedefId, Subsector, SubsectorId, Vertex, VertexId,
    },
    texture::{FlatId, TextureId},
};

#[derive(Debug, Default)]
pub struct LevelBuilder {
    level: Level,
}

impl LevelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            level: Level {
                name: name.into(),
                ..Level::default()
            },
        }
    }

    pub fn vertex(&mut self, x: f32, y: f32) -> VertexId {
        self.level.vertices.push(Vertex { pos: vec2(x, y) });
        (self.level.vertices.len() - 1) as VertexId
    }

    pub fn sector(
        &mut self,
        floor_h: f32,
        ceil_h: f32,
        floor_tex: FlatId,
        ceil_tex: FlatId,
        light: i16,
    ) -> SectorId {
        self.level.sectors.push(Sector {
            floor_h,
            ceil_h,
            floor_tex,
            ceil_tex,
            light,
            special: 0,
            tag: 0,
            lines: SmallVec::new(),
        });
        (self.level.sectors.len() - 1) as SectorId
    }

    pub fn side(
        &mut self,
        sector: SectorId,
        upper: TextureId,
        lower: TextureId,
        middle: TextureId,
    ) -> SidedefId {
        self.level.sidedefs.push(Sidedef {
            x_off: 0.0,
            y_off: 0.0,
            upper,
            lower,
            middle,
            sector,
        });
        (self.level.sidedefs.len() - 1) as SidedefId
    }

    /// Add a linedef. A left sidedef automatically makes it two-sided.
    pub fn line(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        right: SidedefId,
        left: Option<SidedefId>,
        flags: LinedefFlags,
    ) -> LinedefId {
        let mut ld = Linedef::new(v1, v2, flags);
        ld.right_sidedef = Some(right);
        ld.left_sidedef = left;
        if left.is_some() {
            ld.flags |= LinedefFlags::TWO_SIDED;
        }
        self.level.linedefs.push(ld);
        (self.level.linedefs.len() - 1) as LinedefId
    }

    /// Add a seg covering the whole of `linedef`, running along the right
    /// (`dir == 0`) or left (`dir == 1`) side.
    pub fn seg(&mut self, linedef: LinedefId, dir: u16) -> SegmentId {
        let ld = &self.level.linedefs[linedef as usize];
        let (v1, v2) = if dir == 0 { (ld.v1, ld.v2) } else { (ld.v2, ld.v1) };
        self.level.segs.push(Seg::new(v1, v2, linedef, dir, 0.0));
        (self.level.segs.len() - 1) as SegmentId
    }

    /// Group the segs added since the previous subsector into a new one.
    pub fn subsector(&mut self) -> SubsectorId {
        let first = self
            .level
            .subsectors
            .last()
            .map_or(0, |ss| ss.first_seg + ss.seg_count);
        let count = self.level.segs.len() as u16 - first;
        self.level.subsectors.push(Subsector {
            seg_count: count,
            first_seg: first,
            sector: 0,
        });
        (self.level.subsectors.len() - 1) as SubsectorId
    }

    /// Add a splitter. `front`/`back` are already-tagged child indices, use
    /// [`leaf`] for subsectors.
    pub fn node(&mut self, origin: Vec2, dir: Vec2, front: (u16, Aabb), back: (u16, Aabb)) -> u16 {
        self.level.nodes.push(Node {
            x: origin.x,
            y: origin.y,
            dx: dir.x,
            dy: dir.y,
            bbox: [front.1, back.1],
            child: [front.0, back.0],
        });
        (self.level.nodes.len() - 1) as u16
    }

    pub fn sky(&mut self, flat: FlatId, texture: TextureId) -> &mut Self {
        self.level.sky_flat = Some(flat);
        self.level.sky_texture = texture;
        self
    }

    pub fn build(mut self) -> Level {
        self.level.finalise();
        self.level
    }
}

/// Tag a subsector id as a BSP leaf.
#[inline]
pub fn leaf(ss: SubsectorId) -> u16 {
    ss | SUBSECTOR_BIT
}
