use glam::Vec2;

use crate::world::geometry::{Aabb, Level, LinedefFlags, Node, SlopeType, SubsectorId};

pub const CHILD_MASK: u16 = 0x7FFF;

pub const SUBSECTOR_BIT: u16 = 0x8000;

/// Root value used by maps that consist of a single subsector and no nodes.
pub const NO_NODE: u16 = 0xFFFF;

/// Decoded form of a tagged BSP child index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BspChild {
    Node(usize),
    Subsector(SubsectorId),
}

impl BspChild {
    #[inline(always)]
    pub fn decode(raw: u16) -> Self {
        if raw == NO_NODE {
            BspChild::Subsector(0)
        } else if raw & SUBSECTOR_BIT != 0 {
            BspChild::Subsector(raw & CHILD_MASK)
        } else {
            BspChild::Node(raw as usize)
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Level – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl Level {
    /// Tagged index of the BSP root (`nodes.len()-1` in Doom, or the single
    /// subsector when there are no nodes at all).
    #[inline(always)]
    pub fn bsp_root(&self) -> u16 {
        match self.nodes.len() {
            0 => NO_NODE,
            n => (n - 1) as u16,
        }
    }

    /// Walk the BSP and return the subsector id containing `p`.
    pub fn locate_subsector(&self, p: Vec2) -> SubsectorId {
        let mut raw = self.bsp_root();
        loop {
            match BspChild::decode(raw) {
                BspChild::Subsector(ss) => return ss,
                BspChild::Node(idx) => {
                    let node = &self.nodes[idx];
                    raw = node.child[node.point_side(p)];
                }
            }
        }
    }

    /// Floor height of the sector under `p`.
    pub fn floor_height_at(&self, p: Vec2) -> f32 {
        let ss = &self.subsectors[self.locate_subsector(p) as usize];
        self.sectors[ss.sector as usize].floor_h
    }

    /// Compute every derived field from the raw references: line deltas,
    /// boxes and slopes, seg angles and sectors, subsector sectors and the
    /// per-sector line lists.
    pub fn finalise(&mut self) {
        for sector in &mut self.sectors {
            sector.lines.clear();
        }

        for (idx, ld) in self.linedefs.iter_mut().enumerate() {
            let a = self.vertices[ld.v1 as usize].pos;
            let b = self.vertices[ld.v2 as usize].pos;
            ld.delta = b - a;
            ld.bbox = Aabb::from_points(a, b);
            ld.slope = SlopeType::of(ld.delta);
            ld.front_sector = ld
                .right_sidedef
                .map(|s| self.sidedefs[s as usize].sector);
            ld.back_sector = ld.left_sidedef.map(|s| self.sidedefs[s as usize].sector);

            if let Some(front) = ld.front_sector {
                self.sectors[front as usize].lines.push(idx as u16);
            }
            if let Some(back) = ld.back_sector.filter(|&b| Some(b) != ld.front_sector) {
                self.sectors[back as usize].lines.push(idx as u16);
            }
        }

        for seg in &mut self.segs {
            let a = self.vertices[seg.v1 as usize].pos;
            let b = self.vertices[seg.v2 as usize].pos;
            let d = b - a;
            seg.angle = d.y.atan2(d.x).rem_euclid(std::f32::consts::TAU);
            seg.length = d.length();

            let ld = &self.linedefs[seg.linedef as usize];
            let (front, back) = if seg.dir == 0 {
                (ld.right_sidedef, ld.left_sidedef)
            } else {
                (ld.left_sidedef, ld.right_sidedef)
            };
            debug_assert!(front.is_some(), "seg without a facing sidedef");
            seg.sidedef = front.unwrap_or_default();
            seg.front_sector = self.sidedefs[seg.sidedef as usize].sector;
            seg.back_sector = back
                .filter(|_| ld.flags.contains(LinedefFlags::TWO_SIDED))
                .map(|s| self.sidedefs[s as usize].sector);
        }

        for ss in &mut self.subsectors {
            ss.sector = self.segs[ss.first_seg as usize].front_sector;
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Node geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Node {
    /// 0 = *front* of splitter, 1 = *back*.
    ///
    /// Axis-aligned splitters are decided without multiplication so points
    /// exactly on the line fall on a stable side.
    #[inline(always)]
    pub fn point_side(&self, p: Vec2) -> usize {
        if self.dx == 0.0 {
            return if p.x <= self.x {
                (self.dy > 0.0) as usize
            } else {
                (self.dy < 0.0) as usize
            };
        }
        if self.dy == 0.0 {
            return if p.y <= self.y {
                (self.dx < 0.0) as usize
            } else {
                (self.dx > 0.0) as usize
            };
        }
        let left = (p.x - self.x) * self.dy;
        let right = (p.y - self.y) * self.dx;
        if right < left { 0 } else { 1 }
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    fn splitter(x: f32, y: f32, dx: f32, dy: f32) -> Node {
        Node {
            x,
            y,
            dx,
            dy,
            bbox: [Aabb::default(); 2],
            child: [SUBSECTOR_BIT, SUBSECTOR_BIT | 1],
        }
    }

    #[test]
    fn point_side_vertical_splitter() {
        let n = splitter(64.0, 0.0, 0.0, 64.0);
        assert_eq!(n.point_side(Vec2::new(32.0, 10.0)), 1);
        assert_eq!(n.point_side(Vec2::new(96.0, 10.0)), 0);
        // on the line counts as the left half
        assert_eq!(n.point_side(Vec2::new(64.0, 10.0)), 1);
    }

    #[test]
    fn point_side_diagonal_matches_cross_product() {
        let n = splitter(0.0, 0.0, 10.0, 10.0);
        // right of the direction vector is the front
        assert_eq!(n.point_side(Vec2::new(5.0, 0.0)), 0);
        assert_eq!(n.point_side(Vec2::new(0.0, 5.0)), 1);
    }

    #[test]
    fn child_decoding() {
        assert_eq!(BspChild::decode(3), BspChild::Node(3));
        assert_eq!(BspChild::decode(SUBSECTOR_BIT | 7), BspChild::Subsector(7));
        assert_eq!(BspChild::decode(NO_NODE), BspChild::Subsector(0));
    }

    #[test]
    fn finalise_fills_derived_fields() {
        let lvl = test_fixtures::square_room();
        assert_eq!(lvl.bsp_root(), NO_NODE);
        assert_eq!(lvl.locate_subsector(Vec2::new(32.0, 32.0)), 0);
        assert_eq!(lvl.sectors[0].lines.len(), 4);

        for seg in &lvl.segs {
            assert!((seg.length - 64.0).abs() < 1e-4);
            assert_eq!(seg.back_sector, None);
        }
        let east = &lvl.linedefs[test_fixtures::EAST_WALL as usize];
        assert_eq!(east.slope, SlopeType::Vertical);
        assert_eq!(east.front_sector, Some(0));
    }

    #[test]
    fn locate_in_split_room() {
        let lvl = test_fixtures::split_room(false);
        assert_eq!(lvl.locate_subsector(Vec2::new(32.0, 32.0)), 0);
        assert_eq!(lvl.locate_subsector(Vec2::new(96.0, 32.0)), 1);
        assert_eq!(lvl.floor_height_at(Vec2::new(96.0, 32.0)), 0.0);
    }
}
