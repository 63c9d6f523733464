// Format-agnostic catalog of wall textures, flats and colour maps.
// The renderer and world logic interact through `TextureId`/`FlatId` only;
// the WAD loader (or a test) fills the catalog once at start-up.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use byteorder::{LittleEndian as LE, ReadBytesExt};
use log::warn;
use once_cell::unsync::OnceCell;

/// Runtime handle for a wall texture in the catalog.
///
/// *Guaranteed* to remain stable for the lifetime of the catalog.
pub type TextureId = u16;

/// Handle for a 64×64 floor/ceiling flat.
pub type FlatId = u16;

/// Handle for a raw patch.
pub type PatchId = u16;

/// The texture id written for `"-"`; never drawn.
pub const NO_TEXTURE: TextureId = 0;

/// Upper bound on the composite buffer of one texture.
pub const COMPOSITE_LIMIT: usize = 0x10000;

/// Flats are always 64×64 palette indices.
pub const FLAT_SIZE: usize = 64 * 64;

/// Light-diminishing colour maps every COLORMAP block must provide.
pub const MIN_COLOR_MAPS: usize = 32;

/// Things that can go wrong when filling or querying the catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second entry with an existing name.
    #[error("name `{0}` already present in catalog")]
    Duplicate(String),

    /// Name lookup failed.
    #[error("There is no texture called `{0}`")]
    NotFound(String),

    /// Requested ID is outside `0 .. catalog.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    #[error("texture `{texture}` references missing patch `{patch}`")]
    MissingPatch { texture: String, patch: String },

    #[error("texture `{texture}` needs a composite of {size} bytes, more than 64KiB")]
    CompositeTooLarge { texture: String, size: usize },

    #[error("patch `{0}` is malformed")]
    BadPatch(String),

    #[error("flat `{name}` has {len} bytes, expected 4096")]
    BadFlat { name: String, len: usize },

    #[error("colour map block has {0} rows, at least 32 are required")]
    ColorMapTooShort(usize),
}

/*──────────────────────────── palette / colour maps ─────────────────*/

/// PLAYPAL entry 0 as 0x00RRGGBB; only needed for presentation.
pub struct Palette(pub [u32; 256]);
impl Default for Palette {
    fn default() -> Self {
        Palette([0u32; 256])
    }
}
impl Palette {
    /// Build from the first 768 bytes of a PLAYPAL lump.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let rgb = bytes.get(..256 * 3)?;
        let mut pal = Palette::default();
        for (i, c) in rgb.chunks_exact(3).enumerate() {
            pal[i] = (c[0] as u32) << 16 | (c[1] as u32) << 8 | c[2] as u32;
        }
        Some(pal)
    }
}
impl Index<usize> for Palette {
    type Output = u32;
    fn index(&self, idx: usize) -> &u32 {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.0[idx]
    }
}

/// Block of 256-entry palette remap rows (COLORMAP). Row 0 is full bright.
#[derive(Clone, Debug)]
pub struct ColorMaps(Vec<[u8; 256]>);

impl ColorMaps {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let rows: Vec<[u8; 256]> = bytes
            .chunks_exact(256)
            .map(|c| {
                let mut row = [0u8; 256];
                row.copy_from_slice(c);
                row
            })
            .collect();
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<[u8; 256]>) -> Result<Self, TextureError> {
        if rows.len() < MIN_COLOR_MAPS {
            return Err(TextureError::ColorMapTooShort(rows.len()));
        }
        Ok(Self(rows))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl Index<usize> for ColorMaps {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

/*──────────────────────────── patches ───────────────────────────────*/

/// A patch kept in its on-disk column/post format so single-patch texture
/// columns can be sampled straight from it.
#[derive(Clone, Debug)]
pub struct Patch {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub left_offset: i16,
    pub top_offset: i16,
    column_offsets: Vec<u32>,
    data: Vec<u8>,
}

impl Patch {
    /// Parse and validate a patch lump. Every post of every column must lie
    /// inside the lump.
    pub fn from_lump(name: impl Into<String>, data: Vec<u8>) -> Result<Self, TextureError> {
        let name = name.into();
        let bad = |_| TextureError::BadPatch(name.clone());

        let mut cur = data.as_slice();
        let width = cur.read_u16::<LE>().map_err(bad)?;
        let height = cur.read_u16::<LE>().map_err(bad)?;
        let left_offset = cur.read_i16::<LE>().map_err(bad)?;
        let top_offset = cur.read_i16::<LE>().map_err(bad)?;
        let column_offsets = (0..width)
            .map(|_| cur.read_u32::<LE>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(bad)?;

        for &start in &column_offsets {
            Self::validate_column(&data, start as usize)
                .ok_or_else(|| TextureError::BadPatch(name.clone()))?;
        }

        Ok(Self {
            name,
            width,
            height,
            left_offset,
            top_offset,
            column_offsets,
            data,
        })
    }

    /// Encode a patch from posts given as `(top_delta, pixels)` per column.
    pub fn from_columns(name: impl Into<String>, height: u16, columns: &[Vec<(u8, Vec<u8>)>]) -> Self {
        let width = columns.len();
        let mut data = Vec::with_capacity(8 + width * 4);
        data.extend((width as u16).to_le_bytes());
        data.extend(height.to_le_bytes());
        data.extend([0u8; 4]);
        data.resize(8 + width * 4, 0);

        let mut column_offsets = Vec::with_capacity(width);
        for (x, posts) in columns.iter().enumerate() {
            let start = data.len() as u32;
            column_offsets.push(start);
            data[8 + x * 4..12 + x * 4].copy_from_slice(&start.to_le_bytes());
            for (top, pixels) in posts {
                data.push(*top);
                data.push(pixels.len() as u8);
                data.push(0);
                data.extend(pixels);
                data.push(0);
            }
            data.push(0xFF);
        }

        Self {
            name: name.into(),
            width: width as u16,
            height,
            left_offset: 0,
            top_offset: 0,
            column_offsets,
            data,
        }
    }

    fn validate_column(data: &[u8], mut p: usize) -> Option<()> {
        loop {
            let top = *data.get(p)?;
            if top == 0xFF {
                return Some(());
            }
            let len = *data.get(p + 1)? as usize;
            data.get(p + 3..p + 3 + len + 1)?;
            p += len + 4;
        }
    }

    /// Posts of column `x` as `(top_delta, pixels)`.
    pub fn posts(&self, x: usize) -> PostIter<'_> {
        PostIter {
            data: &self.data,
            pos: self.column_offsets.get(x).map_or(usize::MAX, |&o| o as usize),
        }
    }

    /// Byte offset of the first pixel of column `x`.
    fn first_pixel(&self, x: usize) -> usize {
        self.column_offsets[x] as usize + 3
    }
}

pub struct PostIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for PostIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let top = *self.data.get(self.pos)?;
        if top == 0xFF {
            return None;
        }
        let len = *self.data.get(self.pos + 1)? as usize;
        let pixels = self.data.get(self.pos + 3..self.pos + 3 + len)?;
        self.pos += len + 4;
        Some((top, pixels))
    }
}

/*──────────────────────────── textures ──────────────────────────────*/

#[derive(Clone, Copy, Debug)]
pub struct PatchPlacement {
    pub origin_x: i16,
    pub origin_y: i16,
    pub patch: PatchId,
}

/// A wall texture as declared by TEXTURE1/TEXTURE2.
#[derive(Clone, Debug)]
pub struct TextureDef {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub patches: Vec<PatchPlacement>,
}

/// Where the pixels of one texture column live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnSource {
    /// Covered by exactly one patch: read from the patch bytes.
    Patch { patch: PatchId, offset: u32 },
    /// Covered by several (or no) patches: read from the composite buffer.
    Composite { offset: u32 },
}

struct Texture {
    def: TextureDef,
    width_mask: i32,
    columns: Vec<ColumnSource>,
    composite_size: usize,
    composite: OnceCell<Box<[u8]>>,
}

/// Largest power of two not above `w`, minus one.
fn width_mask(w: u16) -> i32 {
    match w {
        0 => 0,
        w => (1i32 << (15 - w.leading_zeros())) - 1,
    }
}

/*──────────────────────────── flats ─────────────────────────────────*/

pub struct Flat {
    pub name: String,
    pixels: Vec<u8>,
}

/*──────────────────────────── catalog ───────────────────────────────*/

/// Dense id → texture store with lazily built composites.
///
/// * Names are case-insensitive (stored upper-case).
/// * ID **0** is always the reserved "no texture" entry.
/// * Composite buffers are built on first use through a shared reference
///   and kept for the lifetime of the catalog.
///
/// **Thread-safety:** the lazy composites use an unsynchronised cell, so the
/// catalog is not `Sync`; render from one thread.
pub struct TextureCatalog {
    textures: Vec<Texture>,
    by_name: HashMap<String, TextureId>,
    patches: Vec<Patch>,
    patch_by_name: HashMap<String, PatchId>,
    flats: Vec<Flat>,
    flat_by_name: HashMap<String, FlatId>,
    colormaps: ColorMaps,
    palette: Palette,
}

/// Counts only; the pixel stores are too large to print.
impl fmt::Debug for TextureCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureCatalog")
            .field("textures", &self.textures.len())
            .field("patches", &self.patches.len())
            .field("flats", &self.flats.len())
            .field("colormaps", &self.colormaps.len())
            .finish()
    }
}

impl TextureCatalog {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    pub fn new(colormaps: ColorMaps) -> Self {
        let placeholder = Texture {
            def: TextureDef {
                name: "-".into(),
                width: 1,
                height: 1,
                patches: Vec::new(),
            },
            width_mask: 0,
            columns: vec![ColumnSource::Composite { offset: 0 }],
            composite_size: 1,
            composite: OnceCell::new(),
        };
        let mut by_name = HashMap::new();
        by_name.insert("-".into(), NO_TEXTURE);
        Self {
            textures: vec![placeholder],
            by_name,
            patches: Vec::new(),
            patch_by_name: HashMap::new(),
            flats: Vec::new(),
            flat_by_name: HashMap::new(),
            colormaps,
            palette: Palette::default(),
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn colormaps(&self) -> &ColorMaps {
        &self.colormaps
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of wall textures (including the reserved one).
    pub fn len(&self) -> usize {
        self.textures.len()
    }
    pub fn is_empty(&self) -> bool {
        self.textures.len() == 1
    }

    pub fn flat_count(&self) -> usize {
        self.flats.len()
    }

    /// Resolve a side texture name. `"-"` means "no texture" and maps to 0.
    pub fn texture_num(&self, name: &str) -> Result<TextureId, TextureError> {
        if name == "-" {
            return Ok(NO_TEXTURE);
        }
        self.by_name
            .get(&name.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| TextureError::NotFound(name.into()))
    }

    pub fn flat_num(&self, name: &str) -> Result<FlatId, TextureError> {
        self.flat_by_name
            .get(&name.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| TextureError::NotFound(name.into()))
    }

    pub fn patch_id(&self, name: &str) -> Option<PatchId> {
        self.patch_by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Declaration of a texture, with bounds-checking.
    pub fn def(&self, id: TextureId) -> Result<&TextureDef, TextureError> {
        self.textures
            .get(id as usize)
            .map(|t| &t.def)
            .ok_or(TextureError::BadId(id))
    }

    #[inline]
    pub fn height(&self, id: TextureId) -> f32 {
        self.textures[id as usize].def.height as f32
    }

    /// Pixels (one per row, `height` of them) of texture column `col`,
    /// wrapped to the texture's power-of-two width.
    pub fn column(&self, id: TextureId, col: i32) -> &[u8] {
        let tex = &self.textures[id as usize];
        let h = tex.def.height as usize;
        match tex.columns[(col & tex.width_mask) as usize] {
            ColumnSource::Patch { patch, offset } => {
                let start = offset as usize;
                &self.patches[patch as usize].data[start..start + h]
            }
            ColumnSource::Composite { offset } => {
                let start = offset as usize;
                &self.composite_of(tex)[start..start + h]
            }
        }
    }

    /// Composite buffer of `id`, built on first access.
    pub fn composite(&self, id: TextureId) -> &[u8] {
        self.composite_of(&self.textures[id as usize])
    }

    pub fn is_composite_built(&self, id: TextureId) -> bool {
        self.textures
            .get(id as usize)
            .is_some_and(|t| t.composite.get().is_some())
    }

    pub fn flat(&self, id: FlatId) -> &[u8] {
        &self.flats[id as usize].pixels
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    pub fn add_patch(&mut self, patch: Patch) -> Result<PatchId, TextureError> {
        let key = patch.name.to_ascii_uppercase();
        if self.patch_by_name.contains_key(&key) {
            return Err(TextureError::Duplicate(patch.name));
        }
        let id = self.patches.len() as PatchId;
        self.patches.push(patch);
        self.patch_by_name.insert(key, id);
        Ok(id)
    }

    /// Register a texture and build its column lookup.
    ///
    /// * Fails if the name exists (`Duplicate`), a placement references an
    ///   unknown patch (`MissingPatch`) or the multi-patch columns need more
    ///   than 64KiB of composite (`CompositeTooLarge`).
    pub fn add_texture(&mut self, def: TextureDef) -> Result<TextureId, TextureError> {
        let key = def.name.to_ascii_uppercase();
        if self.by_name.contains_key(&key) {
            return Err(TextureError::Duplicate(def.name));
        }
        if let Some(bad) = def
            .patches
            .iter()
            .find(|p| p.patch as usize >= self.patches.len())
        {
            return Err(TextureError::MissingPatch {
                texture: def.name.clone(),
                patch: format!("#{}", bad.patch),
            });
        }

        let (columns, composite_size) = self.generate_lookup(&def)?;
        let id = self.textures.len() as TextureId;
        self.textures.push(Texture {
            width_mask: width_mask(def.width),
            def,
            columns,
            composite_size,
            composite: OnceCell::new(),
        });
        self.by_name.insert(key, id);
        Ok(id)
    }

    pub fn add_flat(&mut self, name: &str, pixels: Vec<u8>) -> Result<FlatId, TextureError> {
        if pixels.len() != FLAT_SIZE {
            return Err(TextureError::BadFlat {
                name: name.into(),
                len: pixels.len(),
            });
        }
        let key = name.to_ascii_uppercase();
        if self.flat_by_name.contains_key(&key) {
            return Err(TextureError::Duplicate(name.into()));
        }
        let id = self.flats.len() as FlatId;
        self.flats.push(Flat {
            name: name.into(),
            pixels,
        });
        self.flat_by_name.insert(key, id);
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Column lookup and compositing
    // ---------------------------------------------------------------------

    fn generate_lookup(&self, def: &TextureDef) -> Result<(Vec<ColumnSource>, usize), TextureError> {
        let w = def.width as usize;
        let h = def.height as usize;
        let mut count = vec![0u16; w];
        let mut single = vec![None; w];

        for placement in &def.patches {
            let patch = &self.patches[placement.patch as usize];
            let x1 = placement.origin_x as i32;
            let x2 = (x1 + patch.width as i32).min(w as i32);
            for x in x1.max(0)..x2 {
                let px = (x - x1) as usize;
                count[x as usize] += 1;
                single[x as usize] = Some((placement.patch, patch.first_pixel(px)));
            }
        }

        let mut columns = Vec::with_capacity(w);
        let mut composite_size = 0usize;
        for x in 0..w {
            if count[x] == 0 {
                warn!("texture `{}`: column {x} without a patch", def.name);
            }
            match single[x] {
                Some((patch, offset))
                    if count[x] == 1 && offset + h <= self.patches[patch as usize].data.len() =>
                {
                    columns.push(ColumnSource::Patch {
                        patch,
                        offset: offset as u32,
                    });
                }
                _ => {
                    if composite_size > COMPOSITE_LIMIT - h {
                        return Err(TextureError::CompositeTooLarge {
                            texture: def.name.clone(),
                            size: composite_size + h,
                        });
                    }
                    columns.push(ColumnSource::Composite {
                        offset: composite_size as u32,
                    });
                    composite_size += h;
                }
            }
        }
        Ok((columns, composite_size))
    }

    fn composite_of<'a>(&'a self, tex: &'a Texture) -> &'a [u8] {
        tex.composite.get_or_init(|| self.generate_composite(tex))
    }

    /// Stamp every patch, in declaration order, into the composite columns.
    /// Later patches overwrite earlier ones.
    fn generate_composite(&self, tex: &Texture) -> Box<[u8]> {
        let mut block = vec![0u8; tex.composite_size];
        let w = tex.def.width as i32;
        let h = tex.def.height as usize;

        for placement in &tex.def.patches {
            let patch = &self.patches[placement.patch as usize];
            let x1 = placement.origin_x as i32;
            let x2 = (x1 + patch.width as i32).min(w);
            for x in x1.max(0)..x2 {
                let ColumnSource::Composite { offset } = tex.columns[x as usize] else {
                    continue;
                };
                let dest = &mut block[offset as usize..offset as usize + h];
                draw_column_in_cache(patch.posts((x - x1) as usize), dest, placement.origin_y as i32);
            }
        }
        block.into_boxed_slice()
    }
}

fn draw_column_in_cache<'a>(posts: PostIter<'a>, dest: &mut [u8], origin_y: i32) {
    let height = dest.len() as i32;
    for (top, pixels) in posts {
        let mut position = origin_y + top as i32;
        let mut src = pixels;
        if position < 0 {
            src = src.get((-position) as usize..).unwrap_or(&[]);
            position = 0;
        }
        if position >= height {
            continue;
        }
        let count = src.len().min((height - position) as usize);
        let start = position as usize;
        dest[start..start + count].copy_from_slice(&src[..count]);
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
