pub mod bsp;
pub mod clip;
pub mod column;
pub mod error;
pub mod lighting;
pub mod planes;
pub mod trig;
pub mod types;
pub mod visplane;

#[allow(clippy::module_inception)]
mod engine;
mod walls;

pub use self::{
    engine::Engine,
    error::RenderError,
    types::{DrawSeg, Frame, FrameStats, RenderContext, Screen, View},
};
