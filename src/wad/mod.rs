pub mod level;
pub mod loader;
pub mod raw;

pub use self::{
    level::{LevelError, RawLevel},
    loader::{LoadError, LoadedLevel, PlayerStart, default_sky, load_catalog, load_level},
    raw::{LumpInfo, Wad, WadError, WadKind},
};
