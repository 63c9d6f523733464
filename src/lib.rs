//! Classic BSP software renderer: front-to-back traversal, solid-range
//! occlusion, textured wall columns, visplanes and flat spans, all drawn
//! into an 8-bit palettized frame buffer.

pub mod engine;
pub mod wad;
pub mod world;

#[cfg(test)]
mod test_fixtures;
