use crate::engine::types::{Screen, View};

/// One vertical run of texels mapped onto screen column `x`.
pub struct ColumnJob<'a> {
    pub x: i32,
    pub y_start: i32,
    pub y_end: i32,
    /// Texture row at the screen's center row.
    pub texture_mid: f32,
    /// Texture rows per screen row.
    pub step: f32,
    pub source: &'a [u8],
    pub colormap: &'a [u8; 256],
}

/// Draw `y_start..=y_end`, wrapping the source vertically. Returns the
/// number of pixels written.
pub fn draw_column(screen: &mut Screen, view: &View, job: &ColumnJob) -> usize {
    let y_start = job.y_start.max(0);
    let y_end = job.y_end.min(screen.h as i32 - 1);
    if y_start > y_end || job.source.is_empty() || job.x < 0 || job.x >= screen.w as i32 {
        return 0;
    }

    let len = job.source.len();
    let mask = len.is_power_of_two().then_some(len as i32 - 1);
    let mut frac = job.texture_mid + (y_start - view.center_y) as f32 * job.step;

    for y in y_start..=y_end {
        let row = frac.floor() as i32;
        let idx = match mask {
            Some(m) => row & m,
            None => row.rem_euclid(len as i32),
        };
        screen.put(job.x as usize, y as usize, job.colormap[job.source[idx as usize] as usize]);
        frac += job.step;
    }
    (y_end - y_start + 1) as usize
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> [u8; 256] {
        std::array::from_fn(|i| i as u8)
    }

    #[test]
    fn column_wraps_power_of_two_source() {
        let view = View::new(8, 8);
        let mut screen = Screen::new(8, 8);
        let cmap = identity();
        let source = [10, 11, 12, 13];
        let n = draw_column(
            &mut screen,
            &view,
            &ColumnJob {
                x: 2,
                y_start: 0,
                y_end: 7,
                texture_mid: 0.0,
                step: 1.0,
                source: &source,
                colormap: &cmap,
            },
        );
        assert_eq!(n, 8);
        let col: Vec<u8> = (0..8).map(|y| screen.pixels[y * 8 + 2]).collect();
        // center row 4 samples texture row 0
        assert_eq!(col, vec![10, 11, 12, 13, 10, 11, 12, 13]);
    }

    #[test]
    fn column_applies_colormap_and_clips() {
        let view = View::new(4, 4);
        let mut screen = Screen::new(4, 4);
        let mut cmap = identity();
        cmap[7] = 99;
        let source = [7, 7, 7];
        let n = draw_column(
            &mut screen,
            &view,
            &ColumnJob {
                x: 0,
                y_start: -3,
                y_end: 10,
                texture_mid: 0.0,
                step: 0.5,
                source: &source,
                colormap: &cmap,
            },
        );
        assert_eq!(n, 4);
        assert!((0..4).all(|y| screen.pixels[y * 4] == 99));
    }
}
