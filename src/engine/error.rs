use thiserror::Error;

use crate::world::TextureError;

/// Failures surfaced by the render entry points.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Texture(#[from] TextureError),

    /// More disjoint solid ranges than the occlusion tracker can hold.
    #[error("occlusion tracker full ({0} ranges)")]
    ClipRangeOverflow(usize),

    #[error("resolution {width}x{height} outside 1x1 ..= {max_width}x{max_height}")]
    BadResolution {
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
    },

    #[error("render_frame called before on_resolution_changed")]
    NoView,
}
