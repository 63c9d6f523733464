//! Occlusion tracker: the sorted list of screen-column ranges already
//! covered by solid walls ("solid segs").

use crate::engine::{error::RenderError, types::MAX_SCREEN_WIDTH};

/// Inclusive range of fully occluded screen columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRange {
    pub first: i32,
    pub last: i32,
}

/// Worst case is every other column solid, plus the two sentinels.
pub const MAX_CLIP_RANGES: usize = MAX_SCREEN_WIDTH / 2 + 2;

/// Far-left/far-right sentinel bounds. One short of the integer limits so
/// `first - 1` and `last + 1` never overflow.
const NEG_INFINITY: i32 = -0x7FFF_FFFF;
const POS_INFINITY: i32 = 0x7FFF_FFFF;

/// Fixed-capacity, sorted, non-overlapping set of [`ClipRange`]s.
///
/// * Entry 0 always covers everything left of the screen and the last entry
///   everything right of it, so scans never run off either end.
/// * Touching or overlapping solid inserts are merged.
pub struct ClipRangeArray {
    ranges: Box<[ClipRange]>,
    len: usize,
}

impl Default for ClipRangeArray {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipRangeArray {
    pub fn new() -> Self {
        let mut array = Self {
            ranges: vec![ClipRange { first: 0, last: 0 }; MAX_CLIP_RANGES].into_boxed_slice(),
            len: 0,
        };
        array.reset(0);
        array
    }

    /// Start a frame: only the two off-screen sentinels remain.
    pub fn reset(&mut self, screen_width: usize) {
        self.ranges[0] = ClipRange {
            first: NEG_INFINITY,
            last: -1,
        };
        self.ranges[1] = ClipRange {
            first: screen_width as i32,
            last: POS_INFINITY,
        };
        self.len = 2;
    }

    pub fn as_slice(&self) -> &[ClipRange] {
        &self.ranges[..self.len]
    }

    /// Index of the first range whose `last >= x`.
    #[inline]
    pub fn first_touching(&self, x: i32) -> usize {
        self.as_slice()
            .iter()
            .position(|r| r.last >= x)
            .unwrap_or(self.len - 1)
    }

    /// Whether every column of `first..=last` is already solid.
    pub fn is_covered(&self, first: i32, last: i32) -> bool {
        let r = self.ranges[self.first_touching(last)];
        first >= r.first && last <= r.last
    }

    /// Insert a new range in front of entry `pos`.
    pub fn insert(&mut self, pos: usize, first: i32, last: i32) -> Result<(), RenderError> {
        if self.len == self.ranges.len() {
            return Err(RenderError::ClipRangeOverflow(self.ranges.len()));
        }
        self.ranges.copy_within(pos..self.len, pos + 1);
        self.ranges[pos] = ClipRange { first, last };
        self.len += 1;
        Ok(())
    }

    /// Drop entries `from+1 ..= to` after `from` has absorbed them.
    pub fn remove(&mut self, from: usize, to: usize) {
        if to <= from {
            return;
        }
        self.ranges.copy_within(to + 1..self.len, from + 1);
        self.len -= to - from;
    }

    /// Clip the candidate columns `first..=last` against the solid ranges.
    ///
    /// `visible` is called once per uncovered fragment, left to right. When
    /// `solid` is set the candidate is merged into the set afterwards.
    pub fn clip_segment(
        &mut self,
        first: i32,
        last: i32,
        solid: bool,
        mut visible: impl FnMut(i32, i32),
    ) -> Result<(), RenderError> {
        let start = self.first_touching(first - 1);

        // fragment left of the first touching range
        if first < self.ranges[start].first {
            if last < self.ranges[start].first - 1 {
                visible(first, last);
                if solid {
                    self.insert(start, first, last)?;
                }
                return Ok(());
            }
            visible(first, self.ranges[start].first - 1);
            if solid {
                self.ranges[start].first = first;
            }
        }

        if last <= self.ranges[start].last {
            return Ok(());
        }

        // gaps between the following ranges
        let mut current = start;
        while last >= self.ranges[current + 1].first - 1 {
            visible(self.ranges[current].last + 1, self.ranges[current + 1].first - 1);
            current += 1;
            if last <= self.ranges[current].last {
                if solid {
                    self.ranges[start].last = self.ranges[current].last;
                    self.remove(start, current);
                }
                return Ok(());
            }
        }

        // tail past the last touched range
        visible(self.ranges[current].last + 1, last);
        if solid {
            self.ranges[start].last = last;
            self.remove(start, current);
        }
        Ok(())
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
