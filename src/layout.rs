//! Placement and drawing of the wrapped date block.
//!
//! The block is right-aligned and anchored to the bottom-right corner, one
//! margin in from each edge. All positions are pen origins: `x` is the left
//! end of the line, `y` its baseline.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │                              │
//! │                  2021-07-04  │ ← y0
//! │                    10:20:30  │ ← y0 + line_height
//! │                              │ ← margin + descent
//! └──────────────────────────────┘
//! ```
//!
//! Drawing stamps a line's coverage mask around the origin in the outline
//! colour and then once at the origin in the fill colour, so the text reads
//! on both light and dark photos.

use crate::font::{Coverage, Face};
use image::{Rgba, RgbaImage};

pub const FILL: Rgba<u8> = Rgba([255, 255, 255, 230]);
pub const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 200]);

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Position each line right-aligned against the bottom-right corner.
///
/// The first baseline is pushed down to at least `ascent + margin` so a
/// block taller than the image starts at the top instead of above it; lines
/// wider than the image start at the left margin.
pub fn place(lines: &[String], face: &dyn Face, bounds: Bounds, margin: u32) -> Vec<PlacedLine> {
    let metrics = face.metrics();
    let line_height = metrics.line_height();
    let margin = margin as i32;
    let (width, height) = (bounds.width as i32, bounds.height as i32);
    let extra_lines = lines.len().saturating_sub(1) as i32;

    let y0 = (height - margin - metrics.descent - extra_lines * line_height)
        .max(metrics.ascent + margin);

    lines
        .iter()
        .enumerate()
        .map(|(i, text)| PlacedLine {
            text: text.clone(),
            x: (width - face.measure(text) as i32 - margin).max(margin),
            y: y0 + i as i32 * line_height,
        })
        .collect()
}

/// Outline radius for a line height: a twentieth of it, never below 1px.
pub fn outline_radius(line_height: i32) -> i32 {
    (line_height / 20).max(1)
}

/// Colours and outline thickness for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub fill: Rgba<u8>,
    pub outline: Rgba<u8>,
    pub outline_radius: i32,
}

impl TextStyle {
    pub fn for_line_height(line_height: i32) -> Self {
        Self {
            fill: FILL,
            outline: OUTLINE,
            outline_radius: outline_radius(line_height),
        }
    }
}

/// Draw `placed` lines onto `canvas`.
pub fn render(canvas: &mut RgbaImage, placed: &[PlacedLine], face: &dyn Face, style: &TextStyle) {
    let r = style.outline_radius;
    for line in placed {
        let coverage = face.rasterize(&line.text);
        if coverage.width == 0 || coverage.height == 0 {
            continue;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                stamp(canvas, &coverage, line.x + dx, line.y + dy, style.outline);
            }
        }
        stamp(canvas, &coverage, line.x, line.y, style.fill);
    }
}

/// Blend `coverage` in `colour` with its pen origin at `(ox, oy)`, clipped.
fn stamp(canvas: &mut RgbaImage, coverage: &Coverage, ox: i32, oy: i32, colour: Rgba<u8>) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    let left = ox + coverage.left;
    let top = oy + coverage.top;

    let x_start = (-left).max(0);
    let y_start = (-top).max(0);
    let x_end = (cw - left).min(coverage.width as i32);
    let y_end = (ch - top).min(coverage.height as i32);

    for my in y_start..y_end {
        for mx in x_start..x_end {
            let a = coverage.get(mx as u32, my as u32);
            if a <= 0.0 {
                continue;
            }
            let px = canvas.get_pixel_mut((left + mx) as u32, (top + my) as u32);
            blend(px, colour, a);
        }
    }
}

/// Source-over blend of `src`, scaled by `coverage`, onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = (src[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src[c] as f32;
        let d = dst[c] as f32;
        let v = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
