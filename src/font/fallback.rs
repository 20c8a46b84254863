//! Built-in monospace bitmap face.
//!
//! Always available, fixed at the 7×13 cell of `embedded-graphics`'
//! `FONT_7X13`, which covers printable ASCII. Characters outside it are
//! drawn with the font's replacement glyph.

use super::{Coverage, Face, FaceMetrics};
use embedded_graphics::mono_font::ascii::FONT_7X13;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use std::convert::Infallible;

const FONT: &MonoFont<'static> = &FONT_7X13;

fn cell_width() -> u32 {
    FONT.character_size.width + FONT.character_spacing
}

fn cell_height() -> u32 {
    FONT.character_size.height
}

/// Rows from the top of the cell down to and including the font's baseline
/// row, which is the last row ink rests on.
fn ascent() -> i32 {
    FONT.baseline as i32 + 1
}

/// Collects lit pixels of one rendered line into a coverage mask.
struct CoverageCanvas {
    width: u32,
    height: u32,
    alpha: Vec<f32>,
}

impl CoverageCanvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0.0; (width * height) as usize],
        }
    }
}

impl OriginDimensions for CoverageCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for CoverageCanvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if color != BinaryColor::On || point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.alpha[(y * self.width + x) as usize] = 1.0;
            }
        }
        Ok(())
    }
}

/// The always-available fallback face.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackFace;

impl Face for FallbackFace {
    fn point_size(&self) -> f32 {
        cell_height() as f32
    }

    fn measure(&self, text: &str) -> u32 {
        text.chars().count() as u32 * cell_width()
    }

    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascent: ascent(),
            descent: cell_height() as i32 - ascent(),
        }
    }

    fn rasterize(&self, text: &str) -> Coverage {
        let width = self.measure(text);
        if width == 0 {
            return Coverage::empty();
        }
        let mut canvas = CoverageCanvas::new(width, cell_height());
        let style = MonoTextStyle::new(FONT, BinaryColor::On);
        let Ok(_) =
            Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut canvas);

        Coverage {
            left: 0,
            top: -ascent(),
            width,
            height: canvas.height,
            alpha: canvas.alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(c: &Coverage) -> usize {
        c.alpha.iter().filter(|&&a| a > 0.0).count()
    }

    #[test]
    fn measure_is_monospace() {
        let face = FallbackFace;
        assert_eq!(face.measure(""), 0);
        assert_eq!(face.measure("1"), 7);
        assert_eq!(face.measure("2021-07-04 10:20:30"), 19 * 7);
    }

    #[test]
    fn metrics_fill_the_cell() {
        let m = FallbackFace.metrics();
        assert_eq!(m.line_height(), 13);
        assert!(m.ascent > m.descent && m.descent > 0);
    }

    #[test]
    fn rasterize_covers_the_whole_line() {
        let c = FallbackFace.rasterize("10");
        assert_eq!(c.width, 14);
        assert_eq!(c.height, 13);
        assert_eq!(c.top, -FallbackFace.metrics().ascent);
        assert_eq!(c.alpha.len(), 14 * 13);
        assert!(lit(&c) > 0);
    }

    #[test]
    fn letters_have_distinct_glyphs() {
        let a = FallbackFace.rasterize("a");
        let z = FallbackFace.rasterize("Z");
        let q = FallbackFace.rasterize("?");
        assert!(lit(&a) > 0 && lit(&z) > 0);
        assert_ne!(a, z);
        assert_ne!(a, q);
        assert_ne!(z, q);
    }

    #[test]
    fn spaces_are_blank() {
        let blank = FallbackFace.rasterize("   ");
        assert_eq!(blank.width, 21);
        assert_eq!(lit(&blank), 0);
    }

    #[test]
    fn digits_rest_on_the_baseline() {
        let c = FallbackFace.rasterize("2021-07-04 10:20:30");
        // Row index of the baseline inside the mask.
        let baseline_row = (-c.top) as u32;
        let ink_below = (baseline_row..c.height)
            .flat_map(|y| (0..c.width).map(move |x| (x, y)))
            .any(|(x, y)| c.get(x, y) > 0.0);
        assert!(!ink_below, "digits have no descenders");
        let ink_on_last_row = (0..c.width).any(|x| c.get(x, baseline_row - 1) > 0.0);
        assert!(ink_on_last_row);
    }

    #[test]
    fn descenders_hang_below_the_baseline() {
        let c = FallbackFace.rasterize("gjpqy");
        let baseline_row = (-c.top) as u32;
        let ink_below = (baseline_row..c.height)
            .flat_map(|y| (0..c.width).map(move |x| (x, y)))
            .any(|(x, y)| c.get(x, y) > 0.0);
        assert!(ink_below);
    }
}
