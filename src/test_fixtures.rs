//! Small hand-built maps and a catalog with flat-coloured and striped
//! textures, shared by the unit tests.

use glam::{Vec2, vec2};

use crate::world::{
    Aabb, ColorMaps, FLAT_SIZE, FlatId, Level, LevelBuilder, LinedefFlags, LinedefId, NO_TEXTURE,
    Patch, PatchPlacement, SectorId, SegmentId, TextureCatalog, TextureDef, TextureId, VertexId,
    leaf,
};

pub const WALL_TEX: TextureId = 1;
pub const STEP_TEX: TextureId = 2;
pub const SKY_TEX: TextureId = 3;
/// 64×64, column `x` coloured `STRIPE_BASE + x`.
pub const STRIPE_TEX: TextureId = 4;
/// 8 wide, [`RAMP_HEIGHT`] tall, row `y` coloured `RAMP_BASE + y`.
pub const RAMP_TEX: TextureId = 5;
pub const RAMP_HEIGHT: u8 = 48;

pub const FLOOR: FlatId = 0;
pub const CEIL: FlatId = 1;
pub const SKY_FLAT: FlatId = 2;

pub const WALL_COLOR: u8 = 7;
pub const STEP_COLOR: u8 = 9;
pub const SKY_COLOR: u8 = 5;
pub const FLOOR_COLOR: u8 = 3;
pub const CEIL_COLOR: u8 = 4;
pub const STRIPE_BASE: u8 = 10;
pub const RAMP_BASE: u8 = 100;

/// Colour-map row that maps every index `c` to `255 - c`.
pub const INVERSE_MAP: usize = 33;

/// Linedef and seg of the wall at x = 64 in [`square_room`].
pub const EAST_WALL: LinedefId = 2;
pub const EAST_WALL_SEG: SegmentId = 2;

/// First seg on the x = 64 boundary of the two-room maps, seen from the
/// left room.
pub const BOUNDARY_SEG: SegmentId = 3;

fn identity_row() -> [u8; 256] {
    std::array::from_fn(|i| i as u8)
}

pub fn identity_colormaps() -> ColorMaps {
    ColorMaps::from_rows(vec![identity_row(); 34]).unwrap()
}

/// One single-post patch per column, wrapped in a texture of the same size.
fn texture(cat: &mut TextureCatalog, name: &str, h: u8, columns: Vec<Vec<u8>>) -> TextureId {
    let w = columns.len();
    let posts: Vec<_> = columns.into_iter().map(|c| vec![(0, c)]).collect();
    let patch = cat
        .add_patch(Patch::from_columns(name, h as u16, &posts))
        .unwrap();
    cat.add_texture(TextureDef {
        name: name.into(),
        width: w as u16,
        height: h as u16,
        patches: vec![PatchPlacement {
            origin_x: 0,
            origin_y: 0,
            patch,
        }],
    })
    .unwrap()
}

fn solid_texture(cat: &mut TextureCatalog, name: &str, w: usize, h: u8, color: u8) -> TextureId {
    texture(cat, name, h, vec![vec![color; h as usize]; w])
}

/// Identity lighting except for [`INVERSE_MAP`], so drawn pixels equal the
/// texture colour regardless of distance.
pub fn catalog() -> TextureCatalog {
    let mut rows = vec![identity_row(); INVERSE_MAP + 1];
    rows[INVERSE_MAP] = std::array::from_fn(|i| 255 - i as u8);
    let mut cat = TextureCatalog::new(ColorMaps::from_rows(rows).unwrap());

    assert_eq!(solid_texture(&mut cat, "WALL", 64, 64, WALL_COLOR), WALL_TEX);
    assert_eq!(solid_texture(&mut cat, "STEP", 64, 64, STEP_COLOR), STEP_TEX);
    assert_eq!(solid_texture(&mut cat, "SKY", 64, 128, SKY_COLOR), SKY_TEX);
    let stripes = (0..64).map(|x| vec![STRIPE_BASE + x; 64]).collect();
    assert_eq!(texture(&mut cat, "STRIPES", 64, stripes), STRIPE_TEX);
    let ramp: Vec<u8> = (0..RAMP_HEIGHT).map(|y| RAMP_BASE + y).collect();
    assert_eq!(texture(&mut cat, "RAMP", RAMP_HEIGHT, vec![ramp; 8]), RAMP_TEX);

    assert_eq!(cat.add_flat("FLOOR", vec![FLOOR_COLOR; FLAT_SIZE]), Ok(FLOOR));
    assert_eq!(cat.add_flat("CEIL", vec![CEIL_COLOR; FLAT_SIZE]), Ok(CEIL));
    assert_eq!(cat.add_flat("F_SKY1", vec![SKY_COLOR; FLAT_SIZE]), Ok(SKY_FLAT));
    cat
}

fn solid_line(b: &mut LevelBuilder, v1: VertexId, v2: VertexId, sector: SectorId) -> LinedefId {
    textured_line(b, v1, v2, sector, WALL_TEX, LinedefFlags::empty())
}

fn textured_line(
    b: &mut LevelBuilder,
    v1: VertexId,
    v2: VertexId,
    sector: SectorId,
    middle: TextureId,
    flags: LinedefFlags,
) -> LinedefId {
    let side = b.side(sector, NO_TEXTURE, NO_TEXTURE, middle);
    b.line(v1, v2, side, None, LinedefFlags::IMPASSABLE | flags)
}

/// 64×64 room, floor 0, ceiling 128, light 160. One subsector, no nodes.
///
/// Lines run clockwise so every front side faces inwards:
/// west (0), north (1), east (2), south (3).
pub fn square_room() -> Level {
    square_room_with(WALL_TEX, LinedefFlags::empty())
}

/// [`square_room`] with the east wall's middle texture and extra line flags
/// replaced. The east wall runs from (64, 64) down to (64, 0).
pub fn square_room_with(east_middle: TextureId, east_flags: LinedefFlags) -> Level {
    let mut b = LevelBuilder::new("SQUARE");
    let v = [(0.0, 0.0), (64.0, 0.0), (64.0, 64.0), (0.0, 64.0)].map(|(x, y)| b.vertex(x, y));
    let sector = b.sector(0.0, 128.0, FLOOR, CEIL, 160);

    for (i, (v1, v2)) in [(v[0], v[3]), (v[3], v[2]), (v[2], v[1]), (v[1], v[0])]
        .into_iter()
        .enumerate()
    {
        let line = if i == EAST_WALL as usize {
            textured_line(&mut b, v1, v2, sector, east_middle, east_flags)
        } else {
            solid_line(&mut b, v1, v2, sector)
        };
        b.seg(line, 0);
    }
    b.subsector();
    b.sky(SKY_FLAT, SKY_TEX);
    b.build()
}

enum Boundary {
    Open,
    Solid,
    TwoSided,
}

/// Two 64×64 rooms side by side (x 0..64 and 64..128) split by one node at
/// x = 64. Subsector 0 is the left room (the node's back), 1 the right.
fn two_rooms(right_floor: f32, boundary: Boundary) -> Level {
    let mut b = LevelBuilder::new("HALVES");
    let v = [
        (0.0, 0.0),
        (64.0, 0.0),
        (64.0, 64.0),
        (0.0, 64.0),
        (128.0, 0.0),
        (128.0, 64.0),
    ]
    .map(|(x, y)| b.vertex(x, y));
    let left = b.sector(0.0, 128.0, FLOOR, CEIL, 160);
    let right = b.sector(right_floor, 128.0, FLOOR, CEIL, 160);

    let left_walls = [
        solid_line(&mut b, v[0], v[3], left),
        solid_line(&mut b, v[3], v[2], left),
        solid_line(&mut b, v[1], v[0], left),
    ];
    let right_walls = [
        solid_line(&mut b, v[2], v[5], right),
        solid_line(&mut b, v[5], v[4], right),
        solid_line(&mut b, v[4], v[1], right),
    ];
    let divider = match boundary {
        Boundary::Open => None,
        Boundary::Solid => Some((solid_line(&mut b, v[2], v[1], left), false)),
        Boundary::TwoSided => {
            let front = b.side(left, NO_TEXTURE, STEP_TEX, NO_TEXTURE);
            let back = b.side(right, NO_TEXTURE, NO_TEXTURE, NO_TEXTURE);
            Some((b.line(v[2], v[1], front, Some(back), LinedefFlags::empty()), true))
        }
    };

    for line in left_walls {
        b.seg(line, 0);
    }
    if let Some((line, _)) = divider {
        b.seg(line, 0);
    }
    let left_ss = b.subsector();

    if let Some((line, true)) = divider {
        b.seg(line, 1);
    }
    for line in right_walls {
        b.seg(line, 0);
    }
    let right_ss = b.subsector();

    b.node(
        vec2(64.0, 0.0),
        vec2(0.0, 64.0),
        (
            leaf(right_ss),
            Aabb::from_points(vec2(64.0, 0.0), vec2(128.0, 64.0)),
        ),
        (leaf(left_ss), Aabb::from_points(Vec2::ZERO, vec2(64.0, 64.0))),
    );
    b.sky(SKY_FLAT, SKY_TEX);
    b.build()
}

/// Two rooms with nothing between them, or a one-sided wall at x = 64
/// belonging to the left room.
pub fn split_room(solid_divider: bool) -> Level {
    two_rooms(
        0.0,
        if solid_divider {
            Boundary::Solid
        } else {
            Boundary::Open
        },
    )
}

/// The right room's floor is 24 units higher; the boundary is two-sided
/// with a lower texture facing the left room.
pub fn step_room() -> Level {
    two_rooms(24.0, Boundary::TwoSided)
}

/// Two identical rooms joined by a two-sided line with no middle texture.
pub fn open_split_room() -> Level {
    two_rooms(0.0, Boundary::TwoSided)
}
