//! Light-diminishing tables.
//!
//! Both tables store colour-map *row numbers*; the rasterizers resolve them
//! against the catalog's [`ColorMaps`](crate::world::ColorMaps) block.

use crate::engine::types::STANDARD_WIDTH;

pub const LIGHT_LEVELS: usize = 16;
pub const LIGHT_SEG_SHIFT: i32 = 4;
pub const LIGHT_BRIGHT: usize = 1;
pub const NUM_COLOR_MAPS: i32 = 32;

/// Wall scale buckets; bucket = `scale * LIGHT_SCALE_FACTOR`.
pub const MAX_LIGHT_SCALE: usize = 48;
pub const LIGHT_SCALE_FACTOR: f32 = 16.0;

/// Plane distance buckets; bucket = `distance * LIGHT_Z_FACTOR`.
pub const MAX_LIGHT_Z: usize = 128;
pub const LIGHT_Z_FACTOR: f32 = 1.0 / 16.0;

const DIST_MAP: i32 = 2;

pub struct LightingTables {
    scale_light: [[u8; MAX_LIGHT_SCALE]; LIGHT_LEVELS],
    z_light: [[u8; MAX_LIGHT_Z]; LIGHT_LEVELS],
}

impl Default for LightingTables {
    fn default() -> Self {
        Self::new()
    }
}

fn start_map(level: usize) -> i32 {
    ((LIGHT_LEVELS - LIGHT_BRIGHT - level) as i32 * 2) * NUM_COLOR_MAPS / LIGHT_LEVELS as i32
}

fn row(level: i32) -> u8 {
    level.clamp(0, NUM_COLOR_MAPS - 1) as u8
}

impl LightingTables {
    /// Build the distance table and a scale table for the standard width.
    pub fn new() -> Self {
        let mut tables = Self {
            scale_light: [[0; MAX_LIGHT_SCALE]; LIGHT_LEVELS],
            z_light: [[0; MAX_LIGHT_Z]; LIGHT_LEVELS],
        };
        for (i, zrow) in tables.z_light.iter_mut().enumerate() {
            let start = start_map(i);
            for (j, slot) in zrow.iter_mut().enumerate() {
                let scale = (STANDARD_WIDTH as i32 / 2) / (j as i32 + 1);
                *slot = row(start - scale / DIST_MAP);
            }
        }
        tables.rebuild(STANDARD_WIDTH);
        tables
    }

    /// Recompute the scale table for a new view width.
    pub fn rebuild(&mut self, view_width: usize) {
        let width = view_width.max(1) as i32;
        for (i, srow) in self.scale_light.iter_mut().enumerate() {
            let start = start_map(i);
            for (j, slot) in srow.iter_mut().enumerate() {
                let level = start - j as i32 * STANDARD_WIDTH as i32 / width / DIST_MAP;
                *slot = row(level);
            }
        }
    }

    /// Table row for a sector light level (0..=255) plus the frame bias.
    #[inline]
    pub fn light_index(level: i16, extra_light: i32) -> usize {
        ((level as i32 >> LIGHT_SEG_SHIFT) + extra_light).clamp(0, LIGHT_LEVELS as i32 - 1) as usize
    }

    /// Colour-map row for a wall column drawn at `scale`.
    #[inline]
    pub fn wall_row(&self, light: usize, scale: f32) -> usize {
        let bucket = ((scale * LIGHT_SCALE_FACTOR) as usize).min(MAX_LIGHT_SCALE - 1);
        self.scale_light[light][bucket] as usize
    }

    /// Colour-map row for a floor/ceiling row at `distance`.
    #[inline]
    pub fn plane_row(&self, light: usize, distance: f32) -> usize {
        let bucket = ((distance * LIGHT_Z_FACTOR).max(0.0) as usize).min(MAX_LIGHT_Z - 1);
        self.z_light[light][bucket] as usize
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
