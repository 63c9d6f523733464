//! ----------------------------------------------------------------------------
//!  "Vis-plane" collector
//!
//!  ▸ Runs **during** BSP traversal: every subsector asks for the plane of its
//!    floor and ceiling, the wall loop then records per column which rows of
//!    that plane are still uncovered.
//!  ▸ Runs **after** the walls: [`crate::engine::planes`] turns every plane
//!    into horizontal spans.
//!
//!  Planes are keyed by (height, flat, light). One key may own several
//!  planes when a later subsector would overwrite columns already filled.
//! ----------------------------------------------------------------------------

use log::trace;

use crate::world::FlatId;

pub type VisplaneId = usize;

/// Column has no rows assigned yet.
pub const UNSET: u16 = u16::MAX;

/// One floor or ceiling surface visible somewhere on screen.
#[derive(Clone, Debug)]
pub struct Visplane {
    pub height: f32,
    pub flat: FlatId,
    pub light: i16,

    /// Inclusive column range the plane may touch.
    pub min_x: i32,
    pub max_x: i32,

    /// Rows per column, stored at `x + 1` so `min_x - 1` and `max_x + 1`
    /// can hold the span-building sentinels.
    top: Vec<u16>,
    bottom: Vec<u16>,
}

impl Visplane {
    fn new(width: usize) -> Self {
        Self {
            height: 0.0,
            flat: 0,
            light: 0,
            min_x: width as i32,
            max_x: -1,
            top: vec![UNSET; width + 2],
            bottom: vec![0; width + 2],
        }
    }

    fn reset(&mut self, width: usize, height: f32, flat: FlatId, light: i16) {
        self.height = height;
        self.flat = flat;
        self.light = light;
        self.min_x = width as i32;
        self.max_x = -1;
        self.top.clear();
        self.top.resize(width + 2, UNSET);
        self.bottom.clear();
        self.bottom.resize(width + 2, 0);
    }

    #[inline(always)]
    pub fn top(&self, x: i32) -> u16 {
        self.top[(x + 1) as usize]
    }

    #[inline(always)]
    pub fn bottom(&self, x: i32) -> u16 {
        self.bottom[(x + 1) as usize]
    }

    #[inline(always)]
    pub fn is_set(&self, x: i32) -> bool {
        self.top(x) != UNSET
    }

    /// Clear the columns just outside `[min_x, max_x]` so span building
    /// closes every open span at the edges.
    pub(crate) fn seal_edges(&mut self) {
        self.top[self.min_x as usize] = UNSET;
        self.top[(self.max_x + 2) as usize] = UNSET;
    }
}

/// Frame-lifetime store of visplanes. Allocations survive between frames;
/// `clear` only rewinds the count.
#[derive(Default)]
pub struct Visplanes {
    planes: Vec<Visplane>,
    len: usize,
    width: usize,
}

impl Visplanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a frame at the given screen width.
    pub fn clear(&mut self, width: usize) {
        self.len = 0;
        self.width = width;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Visplane] {
        &self.planes[..self.len]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Visplane] {
        &mut self.planes[..self.len]
    }

    pub fn get(&self, id: VisplaneId) -> &Visplane {
        &self.planes[id]
    }

    /// Plane with exactly this key, creating an empty one if none exists.
    /// All sky surfaces share one plane (height and light ignored).
    pub fn find(
        &mut self,
        sky_flat: Option<FlatId>,
        mut height: f32,
        flat: FlatId,
        mut light: i16,
    ) -> VisplaneId {
        if Some(flat) == sky_flat {
            height = 0.0;
            light = 0;
        }

        if let Some(id) = self
            .as_slice()
            .iter()
            .position(|p| p.height == height && p.flat == flat && p.light == light)
        {
            return id;
        }
        self.push(height, flat, light)
    }

    /// Prepare plane `id` to receive columns `start..=stop`.
    ///
    /// Returns `id` with its range widened when none of the overlapping
    /// columns is set yet; otherwise a fresh plane with the same key.
    pub fn check(&mut self, id: VisplaneId, start: i32, stop: i32) -> VisplaneId {
        let pl = &mut self.planes[id];
        let (intersect_low, union_low) = if start < pl.min_x {
            (pl.min_x, start)
        } else {
            (start, pl.min_x)
        };
        let (intersect_high, union_high) = if stop > pl.max_x {
            (pl.max_x, stop)
        } else {
            (stop, pl.max_x)
        };

        if (intersect_low..=intersect_high).all(|x| !pl.is_set(x)) {
            pl.min_x = union_low;
            pl.max_x = union_high;
            return id;
        }

        let (height, flat, light) = (pl.height, pl.flat, pl.light);
        let new_id = self.push(height, flat, light);
        let fresh = &mut self.planes[new_id];
        fresh.min_x = start;
        fresh.max_x = stop;
        new_id
    }

    /// Record that column `x` shows this plane from row `top` to `bottom`.
    #[inline]
    pub fn set_extents(&mut self, id: VisplaneId, x: i32, top: i32, bottom: i32) {
        let pl = &mut self.planes[id];
        pl.top[(x + 1) as usize] = top as u16;
        pl.bottom[(x + 1) as usize] = bottom as u16;
    }

    fn push(&mut self, height: f32, flat: FlatId, light: i16) -> VisplaneId {
        let id = self.len;
        if id == self.planes.len() {
            self.planes.push(Visplane::new(self.width));
        }
        self.planes[id].reset(self.width, height, flat, light);
        self.len += 1;
        trace!("visplane {id}: height {height}, flat {flat}, light {light}");
        id
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 320;

    fn planes() -> Visplanes {
        let mut v = Visplanes::new();
        v.clear(W);
        v
    }

    fn fill(v: &mut Visplanes, id: VisplaneId, first: i32, last: i32) {
        for x in first..=last {
            v.set_extents(id, x, 100, 150);
        }
    }

    #[test]
    fn find_reuses_exact_key() {
        let mut v = planes();
        let a = v.find(None, 0.0, 3, 160);
        let b = v.find(None, 0.0, 3, 160);
        let c = v.find(None, 8.0, 3, 160);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(a).min_x, W as i32, "new plane has an empty range");
        assert_eq!(v.get(a).max_x, -1);
    }

    #[test]
    fn sky_planes_share_one_entry() {
        let mut v = planes();
        let a = v.find(Some(9), 128.0, 9, 200);
        let b = v.find(Some(9), 256.0, 9, 96);
        assert_eq!(a, b);
        assert_eq!(v.get(a).height, 0.0);
        assert_eq!(v.get(a).light, 0);
    }

    #[test]
    fn adjacent_ranges_merge() {
        let mut v = planes();
        let id = v.find(None, 0.0, 1, 160);
        let id = v.check(id, 0, 10);
        fill(&mut v, id, 0, 10);
        let again = v.check(id, 11, 20);
        assert_eq!(again, id);
        assert_eq!((v.get(id).min_x, v.get(id).max_x), (0, 20));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn overlapping_set_columns_split() {
        let mut v = planes();
        let id = v.find(None, 0.0, 1, 160);
        let id = v.check(id, 0, 10);
        fill(&mut v, id, 0, 10);
        let id = v.check(id, 11, 35);
        fill(&mut v, id, 11, 35);

        let other = v.check(id, 30, 40);
        assert_ne!(other, id);
        assert_eq!(v.len(), 2);
        assert_eq!((v.get(other).min_x, v.get(other).max_x), (30, 40));
        assert_eq!(v.get(other).flat, 1);
        assert!(!v.get(other).is_set(30), "new plane starts unset");
        assert_eq!((v.get(id).min_x, v.get(id).max_x), (0, 35));
    }

    #[test]
    fn clear_rewinds_and_reuses_storage() {
        let mut v = planes();
        let id = v.find(None, 0.0, 1, 160);
        v.set_extents(id, 5, 1, 2);
        v.clear(W);
        assert!(v.is_empty());
        let id = v.find(None, 4.0, 2, 100);
        assert!(!v.get(id).is_set(5), "stale extents survived clear");
    }
}
