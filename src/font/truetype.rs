//! Outline fonts through `ab_glyph`.
//!
//! Sizes are in points at 72 DPI, so one point is one pixel em. The
//! conversion to `ab_glyph`'s height-based [`PxScale`] goes through
//! [`Font::pt_to_px_scale`], which assumes 96 DPI and needs the font's
//! units-per-em; fonts without it cannot be instantiated and the solver
//! skips them.
//!
//! [`PxScale`]: ab_glyph::PxScale

use super::{Coverage, Face, FaceMetrics, FaceSource, FontError};
use ab_glyph::{Font, FontArc, GlyphId, OutlinedGlyph, PxScaleFont, ScaleFont, point};
use std::path::Path;

/// Undoes the 96 DPI assumption of [`Font::pt_to_px_scale`].
const PT_AT_96_DPI: f32 = 72.0 / 96.0;

/// Read and parse a TrueType/OpenType font file.
pub fn load_font(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid(path.to_path_buf()))
}

/// An `ab_glyph` font scaled to a single point size.
pub struct TrueTypeFace {
    scaled: PxScaleFont<FontArc>,
    point_size: f32,
}

impl TrueTypeFace {
    pub fn new(font: &FontArc, point_size: f32) -> Option<Self> {
        if !point_size.is_finite() || point_size <= 0.0 {
            return None;
        }
        let scale = font.pt_to_px_scale(point_size * PT_AT_96_DPI)?;
        Some(Self {
            scaled: font.clone().into_scaled(scale),
            point_size,
        })
    }

    /// Pen positions for each glyph of `text`, kerning applied.
    fn layout(&self, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = self.scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += self.scaled.kern(prev, id);
            }
            glyphs.push((id, caret));
            caret += self.scaled.h_advance(id);
            previous = Some(id);
        }
        (glyphs, caret)
    }
}

impl Face for TrueTypeFace {
    fn point_size(&self) -> f32 {
        self.point_size
    }

    fn measure(&self, text: &str) -> u32 {
        let (_, width) = self.layout(text);
        width.max(0.0).ceil() as u32
    }

    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascent: self.scaled.ascent().ceil() as i32,
            descent: (-self.scaled.descent()).ceil() as i32,
        }
    }

    fn rasterize(&self, text: &str) -> Coverage {
        let (glyphs, _) = self.layout(text);
        let scale = self.scaled.scale();
        let outlined: Vec<OutlinedGlyph> = glyphs
            .into_iter()
            .filter_map(|(id, x)| {
                let glyph = id.with_scale_and_position(scale, point(x, 0.0));
                self.scaled.font().outline_glyph(glyph)
            })
            .collect();

        let Some(first) = outlined.first() else {
            return Coverage::empty();
        };
        let mut bounds = first.px_bounds();
        for g in &outlined[1..] {
            let b = g.px_bounds();
            bounds.min.x = bounds.min.x.min(b.min.x);
            bounds.min.y = bounds.min.y.min(b.min.y);
            bounds.max.x = bounds.max.x.max(b.max.x);
            bounds.max.y = bounds.max.y.max(b.max.y);
        }

        let left = bounds.min.x.floor() as i32;
        let top = bounds.min.y.floor() as i32;
        let width = (bounds.max.x.ceil() as i32 - left).max(0) as u32;
        let height = (bounds.max.y.ceil() as i32 - top).max(0) as u32;
        let mut alpha = vec![0.0f32; (width * height) as usize];

        for g in &outlined {
            let b = g.px_bounds();
            let ox = b.min.x as i32 - left;
            let oy = b.min.y as i32 - top;
            g.draw(|x, y, c| {
                let px = ox + x as i32;
                let py = oy + y as i32;
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    let idx = (py as u32 * width + px as u32) as usize;
                    alpha[idx] = (alpha[idx] + c).min(1.0);
                }
            });
        }

        Coverage {
            left,
            top,
            width,
            height,
            alpha,
        }
    }
}

impl FaceSource for FontArc {
    fn face_at(&self, point_size: f32) -> Option<Box<dyn Face>> {
        TrueTypeFace::new(self, point_size).map(|f| Box::new(f) as Box<dyn Face>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{self, FitTarget, HeightPolicy};
    use crate::test_helpers::embedded_font;

    const DATE: &str = "2021-07-04 10:20:30";

    fn face(point_size: f32) -> TrueTypeFace {
        TrueTypeFace::new(&embedded_font(), point_size).unwrap()
    }

    /// Lowest row with ink, relative to the baseline (positive is below).
    fn ink_bottom(c: &Coverage) -> i32 {
        c.top + c.height as i32
    }

    #[test]
    fn load_missing_font_is_io_error() {
        let err = load_font(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
    }

    #[test]
    fn load_garbage_is_invalid() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        let err = load_font(&path).unwrap_err();
        assert!(matches!(err, FontError::Invalid(_)));
    }

    #[test]
    fn load_reads_a_real_font_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mono.ttf");
        std::fs::write(&path, crate::test_helpers::EMBEDDED_FONT).unwrap();
        let font = load_font(&path).unwrap();
        assert!(font.face_at(12.0).is_some());
    }

    #[test]
    fn one_point_is_one_pixel_em() {
        // DejaVu Sans Mono advances are 1233/2048 em.
        let advance = face(100.0).measure("0");
        assert!((59..=61).contains(&advance), "advance {advance}");
        let ten = face(100.0).measure("0000000000");
        assert!((600..=605).contains(&ten), "ten advances {ten}");
    }

    #[test]
    fn measure_grows_with_point_size() {
        let mut previous = (0, 0);
        for size in (4..=200).map(|s| s as f32) {
            let f = face(size);
            let current = (f.measure(DATE), f.metrics().line_height());
            assert!(
                current.0 >= previous.0 && current.1 >= previous.1,
                "shrank at {size}: {previous:?} -> {current:?}"
            );
            previous = current;
        }
        assert!(face(12.0).measure(DATE) < face(48.0).measure(DATE));
    }

    #[test]
    fn metrics_bracket_the_em() {
        let m = face(100.0).metrics();
        assert!(m.ascent > 70 && m.ascent < 100, "ascent {}", m.ascent);
        assert!(m.descent > 15 && m.descent < 30, "descent {}", m.descent);
    }

    #[test]
    fn digits_sit_on_the_baseline() {
        let f = face(40.0);
        let c = f.rasterize("2021");
        assert!(c.width > 0 && c.height > 0);
        assert!(c.alpha.iter().any(|&a| a > 0.5));
        assert!(c.top < 0, "digits are drawn above the baseline");
        assert!(c.top >= -f.metrics().ascent);
        assert!((-1..=1).contains(&ink_bottom(&c)), "bottom {}", ink_bottom(&c));
        assert!(c.left >= -1 && c.left + c.width as i32 <= f.measure("2021") as i32 + 1);
    }

    #[test]
    fn descenders_hang_below_the_baseline() {
        let f = face(40.0);
        let c = f.rasterize("gjpqy");
        assert!(ink_bottom(&c) > 4);
        assert!(ink_bottom(&c) <= f.metrics().descent + 1);
    }

    #[test]
    fn spaces_rasterize_to_nothing() {
        assert_eq!(face(20.0).rasterize("   "), Coverage::empty());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let font = embedded_font();
        assert!(TrueTypeFace::new(&font, 0.0).is_none());
        assert!(TrueTypeFace::new(&font, f32::NAN).is_none());
        assert!(font.face_at(-3.0).is_none());
    }

    #[test]
    fn solver_picks_the_largest_fitting_real_size() {
        let font = embedded_font();
        let target = FitTarget::new(300, 60, 1000.0);
        let fitted = fit::solve(Some(&font), DATE, target, HeightPolicy::Shrink);

        assert!(!fitted.fallback);
        assert!(fit::fits_box(fitted.face(), DATE, &target));
        let larger = font.face_at(fitted.point_size + 1.0).unwrap();
        assert!(!fit::fits_box(larger.as_ref(), DATE, &target));
    }
}
