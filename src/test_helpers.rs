//! Shared test utilities: synthetic images and predictable faces.
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("a.jpg"), 120, 80);
//!
//! let source = MonoSource::new(0.5);
//! let face = source.face_at(20.0).unwrap();
//! assert_eq!(face.measure("abcd"), 40);
//! ```

use crate::font::{Coverage, Face, FaceMetrics, FaceSource};
use ab_glyph::FontArc;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

// =========================================================================
// Fonts
// =========================================================================

/// DejaVu Sans Mono, for tests that need real outlines and metrics.
pub const EMBEDDED_FONT: &[u8] = include_bytes!("font/fonts/DejaVuSansMono.ttf");

pub fn embedded_font() -> FontArc {
    FontArc::try_from_slice(EMBEDDED_FONT).unwrap()
}

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG with a colour gradient.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG with a colour gradient.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::png::PngEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// A JPEG whose APP1 segment carries the given ASCII EXIF tags.
pub fn jpeg_with_exif(tags: &[(exif::Tag, &str)]) -> Vec<u8> {
    use exif::experimental::Writer;
    use exif::{Field, In, Value};

    let fields: Vec<Field> = tags
        .iter()
        .map(|(tag, text)| Field {
            tag: *tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        })
        .collect();
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = std::io::Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
        .write_image(gradient(16, 8).as_raw(), 16, 8, image::ExtendedColorType::Rgb8)
        .unwrap();

    let segment_len = (2 + 6 + tiff.len()) as u16;
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A uniform grey RGBA canvas.
pub fn grey_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba([128, 128, 128, 255]))
}

// =========================================================================
// Predictable faces
// =========================================================================

/// Monospace face whose every character advances `size * ratio` pixels.
///
/// Ascent is 80% and descent 20% of the size. Rasterizes to a solid block so
/// rendering tests can count covered pixels.
pub struct MonoFace {
    pub size: f32,
    pub ratio: f32,
}

impl Face for MonoFace {
    fn point_size(&self) -> f32 {
        self.size
    }

    fn measure(&self, text: &str) -> u32 {
        (text.chars().count() as f32 * self.size * self.ratio).ceil() as u32
    }

    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascent: (self.size * 0.8).ceil() as i32,
            descent: (self.size * 0.2).ceil() as i32,
        }
    }

    fn rasterize(&self, text: &str) -> Coverage {
        let width = self.measure(text);
        let height = self.metrics().ascent as u32;
        Coverage {
            left: 0,
            top: -(height as i32),
            width,
            height,
            alpha: vec![1.0; (width * height) as usize],
        }
    }
}

/// Builds [`MonoFace`]s at any positive size.
pub struct MonoSource {
    pub ratio: f32,
}

impl MonoSource {
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }
}

impl FaceSource for MonoSource {
    fn face_at(&self, point_size: f32) -> Option<Box<dyn Face>> {
        if !point_size.is_finite() || point_size <= 0.0 {
            return None;
        }
        Some(Box::new(MonoFace {
            size: point_size,
            ratio: self.ratio,
        }))
    }
}

/// A font that cannot be instantiated at any size.
pub struct BrokenSource;

impl FaceSource for BrokenSource {
    fn face_at(&self, _point_size: f32) -> Option<Box<dyn Face>> {
        None
    }
}
