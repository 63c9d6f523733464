pub mod bsp;
mod builder;
mod geometry;
mod texture;

pub use geometry::{
    Aabb, Level, Linedef, LinedefFlags, LinedefId, Node, Sector, SectorId, Seg, SegmentId,
    Sidedef, SidedefId, SlopeType, Subsector, SubsectorId, Vertex, VertexId,
};

pub use builder::{LevelBuilder, leaf};

pub use texture::{
    COMPOSITE_LIMIT, ColorMaps, FLAT_SIZE, FlatId, MIN_COLOR_MAPS, NO_TEXTURE, Palette, Patch,
    PatchId, PatchPlacement, PostIter, TextureCatalog, TextureDef, TextureError, TextureId,
};
