// ──────────────────────────────────────────────────────────────────────────
// wad/loader.rs
//
//  *   PLAYPAL / COLORMAP / PNAMES     ──╮
//  *   TEXTURE1/2 / F_START..F_END       │  --->  world::TextureCatalog
//  *   RawLevel (wad::level)             │  --->  world::Level + player start
//                                        ╯
// ──────────────────────────────────────────────────────────────────────────

use crate::{
    wad::{
        level::{LevelError, RawLevel},
        raw::{Wad, WadError},
    },
    world::{
        Aabb, ColorMaps, FLAT_SIZE, FlatId, Level, Linedef, LinedefFlags, Node,
        Palette, Patch, PatchId, PatchPlacement, Sector, Seg, Sidedef, Subsector, TextureCatalog,
        TextureDef, TextureError, TextureId, Vertex,
    },
};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use glam::{Vec2, vec2};
use log::{info, warn};
use smallvec::SmallVec;
use thiserror::Error;

/// Flat that marks open sky.
pub const SKY_FLAT_NAME: &str = "F_SKY1";

/// Thing type of the first player start.
const PLAYER1_START: i16 = 1;

/*──────────────────────────── Error type ───────────────────────────*/

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("required lump {0} missing")]
    MissingLump(&'static str),

    #[error("lump {0} is truncated")]
    Truncated(String),
}

/// Where and which way the first player spawns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerStart {
    pub pos: Vec2,
    pub angle: f32,
}

/// A map converted to runtime form.
#[derive(Debug)]
pub struct LoadedLevel {
    pub level: Level,
    pub player_start: Option<PlayerStart>,
}

/*====================================================================*/
/*                       Catalog                                      */
/*====================================================================*/

/// Build the texture catalog from the archive's shared resources:
/// colour maps, palette, patches, wall textures and flats.
pub fn load_catalog(wad: &Wad) -> Result<TextureCatalog, LoadError> {
    let colormap = lump(wad, "COLORMAP")?;
    let mut catalog = TextureCatalog::new(ColorMaps::from_bytes(colormap)?);

    let playpal = lump(wad, "PLAYPAL")?;
    let palette =
        Palette::from_bytes(playpal).ok_or_else(|| LoadError::Truncated("PLAYPAL".into()))?;
    catalog.set_palette(palette);

    let patches = load_patches(wad, &mut catalog)?;
    for table in ["TEXTURE1", "TEXTURE2"] {
        if let Some(idx) = wad.find_lump(table) {
            load_texture_table(table, wad.lump_bytes(idx)?, &patches, &mut catalog)?;
        }
    }
    load_flats(wad, &mut catalog)?;

    info!(
        "catalog: {} textures, {} flats, {} colour maps",
        catalog.len() - 1,
        catalog.flat_count(),
        catalog.colormaps().len()
    );
    Ok(catalog)
}

fn lump<'w>(wad: &'w Wad, name: &'static str) -> Result<&'w [u8], LoadError> {
    let idx = wad.find_lump(name).ok_or(LoadError::MissingLump(name))?;
    Ok(wad.lump_bytes(idx)?)
}

fn read_name(cur: &mut &[u8]) -> Option<String> {
    let raw: [u8; 8] = cur.get(..8)?.try_into().ok()?;
    *cur = &cur[8..];
    Some(Wad::lump_name_str(&raw).to_ascii_uppercase())
}

/// One PNAMES entry: the name and, if the archive has the lump, its id.
type PatchSlot = (String, Option<PatchId>);

/// PNAMES order → catalog patch id. Names without a lump get no id;
/// only a texture that places one of them is an error.
fn load_patches(wad: &Wad, catalog: &mut TextureCatalog) -> Result<Vec<PatchSlot>, LoadError> {
    let truncated = || LoadError::Truncated("PNAMES".into());
    let mut cur = lump(wad, "PNAMES")?;
    let count = cur.read_u32::<LE>().map_err(|_| truncated())? as usize;

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_name(&mut cur).ok_or_else(truncated)?;
        if let Some(id) = catalog.patch_id(&name) {
            ids.push((name, Some(id)));
            continue;
        }
        let Some(idx) = wad.find_lump(&name) else {
            warn!("patch {name} listed in PNAMES but not in the archive");
            ids.push((name, None));
            continue;
        };
        let patch = Patch::from_lump(name.clone(), wad.lump_bytes(idx)?.to_vec())?;
        ids.push((name, Some(catalog.add_patch(patch)?)));
    }
    Ok(ids)
}

/// One TEXTURE1/TEXTURE2 lump: a count, an offset table, then one
/// `maptexture` record per texture.
fn load_texture_table(
    table: &str,
    bytes: &[u8],
    patches: &[PatchSlot],
    catalog: &mut TextureCatalog,
) -> Result<(), LoadError> {
    let truncated = || LoadError::Truncated(table.into());
    let mut cur = bytes;
    let count = cur.read_i32::<LE>().map_err(|_| truncated())?.max(0) as usize;

    for _ in 0..count {
        let offset = cur.read_i32::<LE>().map_err(|_| truncated())? as usize;
        let mut entry = bytes.get(offset..).ok_or_else(truncated)?;
        let def = read_texture_def(&mut entry, patches)?.ok_or_else(truncated)?;
        if catalog.texture_num(&def.name).is_ok() {
            warn!("{table}: duplicate texture {} ignored", def.name);
            continue;
        }
        catalog.add_texture(def)?;
    }
    Ok(())
}

/// `Ok(None)` when the record runs past the end of the lump. A placement
/// whose PNAMES entry has no patch lump fails the whole table.
fn read_texture_def(
    cur: &mut &[u8],
    patches: &[PatchSlot],
) -> Result<Option<TextureDef>, TextureError> {
    let Some(name) = read_name(cur) else {
        return Ok(None);
    };
    let mut header = [0i16; 7];
    if cur.read_i16_into::<LE>(&mut header).is_err() {
        return Ok(None);
    }
    // masked (i32), width, height, column directory (i32), patch count
    let [_, _, width, height, _, _, patch_count] = header;

    let mut placements = Vec::with_capacity(patch_count.max(0) as usize);
    for _ in 0..patch_count.max(0) {
        // origin x, origin y, PNAMES index, step dir, colour map
        let mut rec = [0i16; 5];
        if cur.read_i16_into::<LE>(&mut rec).is_err() {
            return Ok(None);
        }
        let [origin_x, origin_y, index, _, _] = rec;
        let patch = match patches.get(index as usize) {
            Some((_, Some(id))) => *id,
            Some((patch, None)) => {
                return Err(TextureError::MissingPatch {
                    texture: name,
                    patch: patch.clone(),
                });
            }
            None => {
                return Err(TextureError::MissingPatch {
                    texture: name,
                    patch: format!("#{index}"),
                });
            }
        };
        placements.push(PatchPlacement {
            origin_x,
            origin_y,
            patch,
        });
    }

    Ok(Some(TextureDef {
        name,
        width: width.max(1) as u16,
        height: height.max(1) as u16,
        patches: placements,
    }))
}

/// Every 4096-byte lump between `F_START` and `F_END`. Nested markers
/// (`F1_START` …) are empty and skipped.
fn load_flats(wad: &Wad, catalog: &mut TextureCatalog) -> Result<(), LoadError> {
    for idx in wad.lumps_between("F_START", "F_END") {
        let bytes = wad.lump_bytes(idx)?;
        let name = wad.lump_name(idx)?;
        match bytes.len() {
            0 => continue,
            FLAT_SIZE if catalog.flat_num(name).is_err() => {
                catalog.add_flat(name, bytes.to_vec())?;
            }
            FLAT_SIZE => warn!("duplicate flat {name} ignored"),
            len => warn!("flat {name} has {len} bytes, skipped"),
        }
    }
    Ok(())
}

/*====================================================================*/
/*                       Level                                        */
/*====================================================================*/

/// Sky texture used by the original episodes and MAP slots.
pub fn default_sky(map_name: &str) -> &'static str {
    let name = map_name.to_ascii_uppercase();
    if let Some(rest) = name.strip_prefix("MAP") {
        return match rest.parse::<u32>().unwrap_or(1) {
            0..=11 => "SKY1",
            12..=20 => "SKY2",
            _ => "SKY3",
        };
    }
    match name.as_bytes().get(1) {
        Some(b'2') => "SKY2",
        Some(b'3') => "SKY3",
        Some(b'4') => "SKY4",
        _ => "SKY1",
    }
}

/// Convert the map at `marker` to runtime form, resolving every texture and
/// flat name through `catalog`. Any name the catalog does not know, the
/// sky texture included, fails the load with [`TextureError::NotFound`].
pub fn load_level(
    wad: &Wad,
    marker: usize,
    catalog: &TextureCatalog,
    sky: Option<&str>,
) -> Result<LoadedLevel, LoadError> {
    let raw = wad.parse_level(marker)?;
    let player_start = raw
        .things
        .iter()
        .find(|t| t.kind == PLAYER1_START)
        .map(|t| PlayerStart {
            pos: vec2(t.x as f32, t.y as f32),
            angle: (t.angle as f32).to_radians(),
        });
    let level = convert(raw, catalog, sky)?;

    info!(
        "{}: {} vertices, {} lines, {} sectors, {} subsectors, {} nodes",
        level.name,
        level.vertices.len(),
        level.linedefs.len(),
        level.sectors.len(),
        level.subsectors.len(),
        level.nodes.len()
    );
    Ok(LoadedLevel {
        level,
        player_start,
    })
}

/// `-` resolves to the catalog's placeholder id.
fn texture(catalog: &TextureCatalog, raw: &[u8; 8]) -> Result<TextureId, TextureError> {
    catalog.texture_num(Wad::lump_name_str(raw))
}

fn flat(catalog: &TextureCatalog, raw: &[u8; 8]) -> Result<FlatId, TextureError> {
    catalog.flat_num(Wad::lump_name_str(raw))
}

const BOX_TOP: usize = 0;
const BOX_BOTTOM: usize = 1;
const BOX_LEFT: usize = 2;
const BOX_RIGHT: usize = 3;

fn bbox(raw: &[i16; 4]) -> Aabb {
    Aabb {
        min: vec2(raw[BOX_LEFT] as f32, raw[BOX_BOTTOM] as f32),
        max: vec2(raw[BOX_RIGHT] as f32, raw[BOX_TOP] as f32),
    }
}

fn convert(raw: RawLevel, catalog: &TextureCatalog, sky: Option<&str>) -> Result<Level, LoadError> {
    let vertices = raw
        .vertices
        .iter()
        .map(|v| Vertex {
            pos: vec2(v.x as f32, v.y as f32),
        })
        .collect();

    let side = |s: i16| (s >= 0).then_some(s as u16);
    let linedefs = raw
        .linedefs
        .iter()
        .map(|l| Linedef {
            special: l.special,
            tag: l.tag,
            right_sidedef: side(l.sides[0]),
            left_sidedef: side(l.sides[1]),
            ..Linedef::new(l.v1, l.v2, LinedefFlags::from_bits_truncate(l.flags))
        })
        .collect();

    let sidedefs = raw
        .sidedefs
        .iter()
        .map(|s| {
            Ok(Sidedef {
                x_off: s.x_off as f32,
                y_off: s.y_off as f32,
                upper: texture(catalog, &s.upper)?,
                lower: texture(catalog, &s.lower)?,
                middle: texture(catalog, &s.middle)?,
                sector: s.sector,
            })
        })
        .collect::<Result<_, TextureError>>()?;

    let sectors = raw
        .sectors
        .iter()
        .map(|s| {
            Ok(Sector {
                floor_h: s.floor_h as f32,
                ceil_h: s.ceil_h as f32,
                floor_tex: flat(catalog, &s.floor_tex)?,
                ceil_tex: flat(catalog, &s.ceil_tex)?,
                light: s.light.clamp(0, 255),
                special: s.special,
                tag: s.tag,
                lines: SmallVec::new(),
            })
        })
        .collect::<Result<_, TextureError>>()?;

    let segs = raw
        .segs
        .iter()
        .map(|s| Seg::new(s.v1, s.v2, s.linedef, s.side, s.offset as f32))
        .collect();

    let subsectors = raw
        .subsectors
        .iter()
        .map(|s| Subsector {
            seg_count: s.seg_count,
            first_seg: s.first_seg,
            sector: 0,
        })
        .collect();

    let nodes = raw
        .nodes
        .iter()
        .map(|n| Node {
            x: n.x as f32,
            y: n.y as f32,
            dx: n.dx as f32,
            dy: n.dy as f32,
            bbox: [bbox(&n.bbox[0]), bbox(&n.bbox[1])],
            child: n.child,
        })
        .collect();

    let sky_name = sky.unwrap_or_else(|| default_sky(&raw.name));
    let sky_texture = catalog.texture_num(sky_name)?;

    let mut level = Level {
        name: raw.name,
        vertices,
        linedefs,
        sidedefs,
        sectors,
        segs,
        subsectors,
        nodes,
        sky_flat: catalog.flat_num(SKY_FLAT_NAME).ok(),
        sky_texture,
    };
    level.finalise();
    Ok(level)
}

/*====================================================================*/
/*                               Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{Engine, Frame},
        wad::raw::build_wad,
    };

    const WALL_COLOR: u8 = 7;
    const FLOOR_COLOR: u8 = 3;

    fn words(v: &[i16]) -> Vec<u8> {
        v.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn name8(s: &str) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw[..s.len()].copy_from_slice(s.as_bytes());
        raw
    }

    /// Single-post patch of `w` columns filled with `color`.
    fn patch_lump(w: u16, h: u8, color: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(w.to_le_bytes());
        out.extend((h as u16).to_le_bytes());
        out.extend([0u8; 4]);
        let column_len = 4 + h as u32 + 1;
        for x in 0..w as u32 {
            out.extend((8 + w as u32 * 4 + x * column_len).to_le_bytes());
        }
        for _ in 0..w {
            out.extend([0, h, 0]);
            out.extend(vec![color; h as usize]);
            out.extend([0, 0xFF]);
        }
        out
    }

    fn pnames(names: &[&str]) -> Vec<u8> {
        let mut out = (names.len() as u32).to_le_bytes().to_vec();
        for n in names {
            out.extend(name8(n));
        }
        out
    }

    /// TEXTURE1 with `(name, width, height, [patch index])` entries.
    fn texture_table(defs: &[(&str, i16, i16, &[i16])]) -> Vec<u8> {
        let mut out = (defs.len() as i32).to_le_bytes().to_vec();
        let mut offset = 4 + 4 * defs.len();
        let mut records = Vec::new();
        for (name, w, h, patches) in defs {
            out.extend((offset as i32).to_le_bytes());
            let mut rec = name8(name).to_vec();
            rec.extend(0i32.to_le_bytes());
            rec.extend(words(&[*w, *h]));
            rec.extend(0i32.to_le_bytes());
            rec.extend(words(&[patches.len() as i16]));
            for &p in patches.iter() {
                rec.extend(words(&[0, 0, p, 1, 0]));
            }
            offset += rec.len();
            records.extend(rec);
        }
        out.extend(records);
        out
    }

    fn sidedef(mid: &str, sector: i16) -> Vec<u8> {
        let mut out = words(&[0, 0]);
        out.extend(name8("-"));
        out.extend(name8("-"));
        out.extend(name8(mid));
        out.extend(words(&[sector]));
        out
    }

    /// 64×64 room, one subsector, player facing east from (32, 32).
    fn e1m1() -> Vec<(&'static str, Vec<u8>)> {
        let mut sidedefs = Vec::new();
        for _ in 0..4 {
            sidedefs.extend(sidedef("WALL", 0));
        }
        let mut sector = words(&[0, 128]);
        sector.extend(name8("FLOOR"));
        sector.extend(name8("F_SKY1"));
        sector.extend(words(&[255, 0, 0]));

        vec![
            ("E1M1", vec![]),
            ("THINGS", words(&[10, 10, 0, 3004, 7, 32, 32, 0, 1, 7])),
            (
                "LINEDEFS",
                words(&[
                    0, 3, 1, 0, 0, 0, -1, //
                    3, 2, 1, 0, 0, 1, -1, //
                    2, 1, 1, 0, 0, 2, -1, //
                    1, 0, 1, 0, 0, 3, -1,
                ]),
            ),
            ("SIDEDEFS", sidedefs),
            ("VERTEXES", words(&[0, 0, 64, 0, 64, 64, 0, 64])),
            (
                "SEGS",
                words(&[
                    0, 3, 0, 0, 0, 0, //
                    3, 2, 0, 1, 0, 0, //
                    2, 1, 0, 2, 0, 0, //
                    1, 0, 0, 3, 0, 0,
                ]),
            ),
            ("SSECTORS", words(&[4, 0])),
            ("NODES", vec![]),
            ("SECTORS", sector),
        ]
    }

    /// Shared resources plus E1M1. `LOST` is listed in PNAMES without a
    /// lump, which is fine while no texture places it.
    fn lumps() -> Vec<(&'static str, Vec<u8>)> {
        let mut colormap = Vec::new();
        for _ in 0..34 {
            colormap.extend(0..=255u8);
        }
        let mut lumps = vec![
            ("PLAYPAL", (0..768).map(|i| i as u8).collect()),
            ("COLORMAP", colormap),
            ("PNAMES", pnames(&["WALLP", "SKYP", "LOST"])),
            (
                "TEXTURE1",
                texture_table(&[("WALL", 64, 64, &[0]), ("SKY1", 64, 128, &[1])]),
            ),
            ("TEXTURE2", texture_table(&[("WALL", 8, 8, &[1])])),
            ("WALLP", patch_lump(64, 64, WALL_COLOR)),
            ("SKYP", patch_lump(64, 128, 5)),
            ("F_START", vec![]),
            ("F1_START", vec![]),
            ("FLOOR", vec![FLOOR_COLOR; FLAT_SIZE]),
            ("F_SKY1", vec![5; FLAT_SIZE]),
            ("SHORT", vec![1; 100]),
            ("F1_END", vec![]),
            ("F_END", vec![]),
        ];
        lumps.extend(e1m1());
        lumps
    }

    fn lump_mut<'a>(lumps: &'a mut [(&'static str, Vec<u8>)], name: &str) -> &'a mut Vec<u8> {
        &mut lumps.iter_mut().find(|(n, _)| *n == name).unwrap().1
    }

    fn wad_of(lumps: &[(&str, Vec<u8>)]) -> Wad {
        Wad::from_bytes(build_wad(b"IWAD", lumps)).unwrap()
    }

    fn archive() -> Wad {
        wad_of(&lumps())
    }

    #[test]
    fn catalog_loads_textures_and_flats() {
        let cat = load_catalog(&archive()).unwrap();
        assert_eq!(cat.len(), 3, "placeholder + WALL, SKY1");
        assert_eq!(cat.flat_count(), 2);
        assert_eq!(cat.colormaps().len(), 34);
        assert_eq!(cat.palette()[1], 0x03_04_05);

        let wall = cat.texture_num("wall").unwrap();
        assert_eq!(cat.def(wall).unwrap().width, 64, "TEXTURE1 wins");
        assert!(cat.flat_num("SHORT").is_err());
    }

    #[test]
    fn texture_placing_a_missing_patch_is_an_error() {
        let mut lumps = lumps();
        *lump_mut(&mut lumps, "TEXTURE1") = texture_table(&[
            ("WALL", 64, 64, &[0]),
            ("SKY1", 64, 128, &[1]),
            ("GHOST", 16, 16, &[2]),
        ]);
        let err = load_catalog(&wad_of(&lumps)).unwrap_err();
        assert!(
            matches!(
                &err,
                LoadError::Texture(TextureError::MissingPatch { texture, patch })
                    if texture == "GHOST" && patch == "LOST"
            ),
            "{err}"
        );
    }

    #[test]
    fn patch_index_past_pnames_is_an_error() {
        let mut lumps = lumps();
        *lump_mut(&mut lumps, "TEXTURE1") = texture_table(&[("WALL", 64, 64, &[9])]);
        let err = load_catalog(&wad_of(&lumps)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Texture(TextureError::MissingPatch { .. })
        ));
    }

    #[test]
    fn missing_colormap_is_reported() {
        let wad = Wad::from_bytes(build_wad(b"PWAD", &[("PLAYPAL", vec![0; 768])])).unwrap();
        let err = load_catalog(&wad).unwrap_err();
        assert!(matches!(err, LoadError::MissingLump("COLORMAP")));
    }

    #[test]
    fn level_resolves_names() {
        let wad = archive();
        let cat = load_catalog(&wad).unwrap();
        let marker = wad.level_indices()[0];
        let loaded = load_level(&wad, marker, &cat, None).unwrap();
        let level = &loaded.level;

        assert_eq!(level.name, "E1M1");
        assert_eq!(level.sectors[0].floor_tex, cat.flat_num("FLOOR").unwrap());
        assert_eq!(level.sky_flat, cat.flat_num("F_SKY1").ok());
        assert_eq!(level.sky_texture, cat.texture_num("SKY1").unwrap());
        assert_eq!(level.sidedefs[2].middle, cat.texture_num("WALL").unwrap());
        assert_eq!(level.subsectors[0].sector, 0);
        assert_eq!(level.segs[2].length, 64.0);
        assert_eq!(level.sectors[0].lines.len(), 4);
        assert_eq!(
            loaded.player_start,
            Some(PlayerStart {
                pos: vec2(32.0, 32.0),
                angle: 0.0
            })
        );
    }

    fn level_error(lumps: &[(&str, Vec<u8>)], sky: Option<&str>) -> LoadError {
        let wad = wad_of(lumps);
        let cat = load_catalog(&wad).unwrap();
        load_level(&wad, wad.level_indices()[0], &cat, sky).unwrap_err()
    }

    #[test]
    fn unknown_flat_is_an_error() {
        let mut lumps = lumps();
        lump_mut(&mut lumps, "SECTORS")[4..12].copy_from_slice(&name8("NOFLAT"));
        let err = level_error(&lumps, None);
        assert!(
            matches!(&err, LoadError::Texture(TextureError::NotFound(n)) if n == "NOFLAT"),
            "{err}"
        );
    }

    #[test]
    fn unknown_wall_texture_is_an_error() {
        let mut lumps = lumps();
        // middle name of the third sidedef
        lump_mut(&mut lumps, "SIDEDEFS")[2 * 30 + 20..2 * 30 + 28]
            .copy_from_slice(&name8("NOSUCHTX"));
        let err = level_error(&lumps, None);
        assert!(
            matches!(&err, LoadError::Texture(TextureError::NotFound(n)) if n == "NOSUCHTX"),
            "{err}"
        );
    }

    #[test]
    fn unknown_sky_texture_is_an_error() {
        let err = level_error(&lumps(), Some("NOSKY"));
        assert!(
            matches!(&err, LoadError::Texture(TextureError::NotFound(n)) if n == "NOSKY"),
            "{err}"
        );
    }

    #[test]
    fn sky_names_per_map() {
        assert_eq!(default_sky("E1M1"), "SKY1");
        assert_eq!(default_sky("e3m4"), "SKY3");
        assert_eq!(default_sky("MAP11"), "SKY1");
        assert_eq!(default_sky("MAP12"), "SKY2");
        assert_eq!(default_sky("MAP25"), "SKY3");
    }

    #[test]
    fn loaded_map_renders() {
        let wad = archive();
        let cat = load_catalog(&wad).unwrap();
        let loaded = load_level(&wad, wad.level_indices()[0], &cat, None).unwrap();
        let start = loaded.player_start.unwrap();

        let mut engine = Engine::new(cat);
        engine.on_resolution_changed(64, 200).unwrap();
        let frame = Frame::new(start.pos, 41.0, start.angle);
        engine.render_frame(&loaded.level, &frame).unwrap();

        let screen = engine.screen();
        assert_eq!(screen.pixels[100 * 64 + 32], WALL_COLOR);
        assert_eq!(screen.pixels[0], 5, "sky above the wall");
        assert_eq!(screen.pixels[199 * 64 + 32], FLOOR_COLOR);
    }
}
