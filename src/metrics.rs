use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Abstract linear unit returned by glyph measurement.
pub type Px = usize;

/// Measures rendered text. Layout never estimates width from character
/// counts; every width goes through this trait.
pub trait GlyphMetrics {
    /// Whether a live surface exists to measure against. Without one a layout
    /// pass is skipped.
    fn has_render_surface(&self) -> bool {
        true
    }

    fn measure_width(&self, text: &str) -> Px;

    fn measure_glyph(&self, glyph: char) -> Px {
        let mut buf = [0u8; 4];
        self.measure_width(glyph.encode_utf8(&mut buf))
    }
}

/// Terminal metrics: one column is `cell_px` pixels, column counts come from
/// `unicode-width` so wide CJK glyphs measure two columns.
#[derive(Clone, Copy, Debug)]
pub struct CellMetrics {
    pub cell_px: Px,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self { cell_px: 8 }
    }
}

impl CellMetrics {
    pub fn columns(&self, px: Px) -> usize {
        if self.cell_px == 0 {
            return 0;
        }
        (px + self.cell_px - 1) / self.cell_px
    }
}

impl GlyphMetrics for CellMetrics {
    fn measure_width(&self, text: &str) -> Px {
        UnicodeWidthStr::width(text) * self.cell_px
    }

    fn measure_glyph(&self, glyph: char) -> Px {
        UnicodeWidthChar::width(glyph).unwrap_or(0) * self.cell_px
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_metrics_scale_columns() {
        let metrics = CellMetrics::default();
        assert_eq!(metrics.measure_width("abc"), 24);
        assert_eq!(metrics.measure_width("表"), 16);
        assert_eq!(metrics.measure_glyph('│'), 8);
        assert_eq!(metrics.columns(16), 2);
        assert_eq!(metrics.columns(17), 3);
    }
}
