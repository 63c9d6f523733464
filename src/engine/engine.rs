use log::{debug, info};

use crate::{
    engine::{
        bsp::BspRenderer,
        clip::ClipRangeArray,
        error::RenderError,
        lighting::LightingTables,
        planes::PlaneRenderer,
        types::{
            DrawSeg, Frame, FrameStats, MAX_SCREEN_HEIGHT, MAX_SCREEN_WIDTH, RenderContext, Screen,
            View,
        },
        visplane::Visplanes,
    },
    world::{FlatId, Level, SubsectorId, TextureCatalog, TextureId},
};

/// The software renderer: owns the texture catalog, the resolution-derived
/// tables and all per-frame scratch state.
///
/// Level geometry is borrowed for the duration of one [`render_frame`]
/// call only.
///
/// [`render_frame`]: Engine::render_frame
pub struct Engine {
    catalog: TextureCatalog,
    lighting: LightingTables,
    view: Option<View>,
    screen: Screen,
    bsp: BspRenderer,
    planes: PlaneRenderer,
}

impl Engine {
    pub fn new(catalog: TextureCatalog) -> Self {
        Self {
            catalog,
            lighting: LightingTables::new(),
            view: None,
            screen: Screen::default(),
            bsp: BspRenderer::new(),
            planes: PlaneRenderer::new(),
        }
    }

    pub fn catalog(&self) -> &TextureCatalog {
        &self.catalog
    }

    /// Resolve a wall texture name for the geometry loader.
    pub fn texture_num(&self, name: &str) -> Result<TextureId, RenderError> {
        Ok(self.catalog.texture_num(name)?)
    }

    pub fn flat_num(&self, name: &str) -> Result<FlatId, RenderError> {
        Ok(self.catalog.flat_num(name)?)
    }

    /// Rebuild the view, the light tables and the frame buffer. Must be
    /// called before the first frame and after every resize.
    pub fn on_resolution_changed(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        if !(1..=MAX_SCREEN_WIDTH).contains(&width) || !(1..=MAX_SCREEN_HEIGHT).contains(&height) {
            return Err(RenderError::BadResolution {
                width,
                height,
                max_width: MAX_SCREEN_WIDTH,
                max_height: MAX_SCREEN_HEIGHT,
            });
        }

        let view = View::new(width, height);
        self.lighting.rebuild(width);
        self.planes.resize(&view);
        self.screen = Screen::new(width, height);
        self.view = Some(view);

        info!(
            "resolution {width}x{height}, projection {:.1}",
            view.projection
        );
        Ok(())
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// Render one frame of `level` seen from `frame` into the screen buffer.
    pub fn render_frame(&mut self, level: &Level, frame: &Frame) -> Result<(), RenderError> {
        let view = self.view.ok_or(RenderError::NoView)?;
        let ctx = RenderContext {
            level,
            frame,
            view: &view,
            catalog: &self.catalog,
            lighting: &self.lighting,
        };

        self.bsp.begin_frame(&view);
        self.bsp
            .render_bsp_node(&ctx, &mut self.screen, level.bsp_root())?;

        let (visplanes, stats) = self.bsp.planes_mut();
        stats.visplanes = visplanes.len();
        self.planes
            .draw_planes(&ctx, visplanes, &mut self.screen, stats);

        let stats = self.bsp.stats();
        debug!(
            "frame: {} subsectors, {} wall ranges ({} columns), {} visplanes, {} spans, {} sky columns",
            stats.subsectors,
            stats.wall_ranges,
            stats.wall_columns,
            stats.visplanes,
            stats.spans,
            stats.sky_columns
        );
        Ok(())
    }

    /*──────────────────────── frame results ─────────────────────────*/

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn stats(&self) -> &FrameStats {
        self.bsp.stats()
    }

    pub fn visited(&self) -> &[SubsectorId] {
        self.bsp.visited()
    }

    pub fn draw_segs(&self) -> &[DrawSeg] {
        self.bsp.draw_segs()
    }

    pub fn occlusion(&self) -> &ClipRangeArray {
        self.bsp.occlusion()
    }

    pub fn visplanes(&self) -> &Visplanes {
        self.bsp.visplanes()
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
