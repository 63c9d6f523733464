//! Raw map lumps as stored on disk, one `#[repr(C)]` record type per lump.

use crate::wad::{Wad, WadError};
use bincode::Decode;
use once_cell::sync::Lazy;
use regex::Regex;

/*=======================================================================*/
/*                         Raw binary records                            */
/*=======================================================================*/

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawThing {
    pub x: i16,
    pub y: i16,
    pub angle: i16,
    pub kind: i16,
    pub options: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawLinedef {
    pub v1: u16,
    pub v2: u16,
    pub flags: u16,
    pub special: u16,
    pub tag: u16,
    /// Right and left sidedef; `-1` for none.
    pub sides: [i16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSidedef {
    pub x_off: i16,
    pub y_off: i16,
    pub upper: [u8; 8],
    pub lower: [u8; 8],
    pub middle: [u8; 8],
    pub sector: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawVertex {
    pub x: i16,
    pub y: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSeg {
    pub v1: u16,
    pub v2: u16,
    /// Binary angle, recomputed from the vertices on load.
    pub angle: i16,
    pub linedef: u16,
    pub side: u16,
    pub offset: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSubsector {
    pub seg_count: u16,
    pub first_seg: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawNode {
    pub x: i16,
    pub y: i16,
    pub dx: i16,
    pub dy: i16,
    /// Front and back box as top, bottom, left, right.
    pub bbox: [[i16; 4]; 2],
    pub child: [u16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSector {
    pub floor_h: i16,
    pub ceil_h: i16,
    pub floor_tex: [u8; 8],
    pub ceil_tex: [u8; 8],
    pub light: i16,
    pub special: i16,
    pub tag: i16,
}

/// Every lump of one map, still in disk form.
#[derive(Debug)]
pub struct RawLevel {
    pub name: String,
    pub things: Vec<RawThing>,
    pub linedefs: Vec<RawLinedef>,
    pub sidedefs: Vec<RawSidedef>,
    pub vertices: Vec<RawVertex>,
    pub segs: Vec<RawSeg>,
    pub subsectors: Vec<RawSubsector>,
    pub nodes: Vec<RawNode>,
    pub sectors: Vec<RawSector>,
}

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("marker index {0} out of bounds")]
    MarkerOob(usize),

    #[error("expected lump `{0}` not found after level marker")]
    Missing(&'static str),

    #[error(transparent)]
    Wad(#[from] WadError),
}

/// Lumps that follow a map marker, in their mandatory order.
const MAP_LUMPS: [&str; 8] = [
    "THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS",
];

static MAP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(E[1-9]M[1-9]|MAP[0-9][0-9])$").unwrap_or_else(|e| panic!("map marker regex: {e}"))
});

impl Wad {
    /// Directory indices of every map marker (`E#M#`, `MAP##`), in file
    /// order.
    pub fn level_indices(&self) -> Vec<usize> {
        self.lumps()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.size == 0 && MAP_MARKER.is_match(Self::lump_name_str(&l.name)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the marker called `name` (`"E1M1"`, `"map07"`).
    pub fn level_by_name(&self, name: &str) -> Option<usize> {
        self.level_indices()
            .into_iter()
            .find(|&i| Self::lump_name_str(&self.lumps()[i].name).eq_ignore_ascii_case(name))
    }

    /// Decode the eight lumps that make up a classic map. REJECT and
    /// BLOCKMAP are not needed for rendering and are ignored.
    pub fn parse_level(&self, marker: usize) -> Result<RawLevel, LevelError> {
        let name = self
            .lump_name(marker)
            .map_err(|_| LevelError::MarkerOob(marker))?
            .to_owned();

        let mut idx = [0usize; MAP_LUMPS.len()];
        for (k, expected) in MAP_LUMPS.iter().enumerate() {
            let i = marker + 1 + k;
            match self.lump_name(i) {
                Ok(n) if n == *expected => idx[k] = i,
                _ => return Err(LevelError::Missing(expected)),
            }
        }

        Ok(RawLevel {
            name,
            things: self.lump_to_vec(idx[0])?,
            linedefs: self.lump_to_vec(idx[1])?,
            sidedefs: self.lump_to_vec(idx[2])?,
            vertices: self.lump_to_vec(idx[3])?,
            segs: self.lump_to_vec(idx[4])?,
            subsectors: self.lump_to_vec(idx[5])?,
            nodes: self.lump_to_vec(idx[6])?,
            sectors: self.lump_to_vec(idx[7])?,
        })
    }
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
