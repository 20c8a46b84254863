//! Decoding photos to an RGBA raster and encoding them back.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` (magic bytes, not the extension) |
//! | Decode | `image::load_from_memory_with_format` → `to_rgba8` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` at [`Quality`], alpha dropped |
//! | Encode PNG | `image::codecs::png::PngEncoder`, lossless RGBA |
//!
//! The output format is always the input format; nothing is converted.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Unsupported image format: {0}")]
    Unsupported(String),
}

/// JPEG encoding quality (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// The formats a photo can come in and go out as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Extension used when the source file has none.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

pub struct Decoded {
    pub raster: RgbaImage,
    pub format: OutputFormat,
}

pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let guessed = image::guess_format(bytes).map_err(CodecError::Decode)?;
    let format = match guessed {
        ImageFormat::Jpeg => OutputFormat::Jpeg,
        ImageFormat::Png => OutputFormat::Png,
        other => return Err(CodecError::Unsupported(format!("{other:?}"))),
    };
    let image = image::load_from_memory_with_format(bytes, guessed).map_err(CodecError::Decode)?;
    Ok(Decoded {
        raster: image.to_rgba8(),
        format,
    })
}

pub fn encode(
    raster: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, CodecError> {
    let (width, height) = raster.dimensions();
    let mut out = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality.value())
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(CodecError::Encode)?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(raster.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(CodecError::Encode)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, create_test_png, grey_canvas};
    use tempfile::TempDir;

    #[test]
    fn quality_is_clamped() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(250).value(), 100);
        assert_eq!(Quality::new(80).value(), 80);
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn decodes_jpeg_and_png() {
        let tmp = TempDir::new().unwrap();
        let jpg = tmp.path().join("a.jpg");
        let png = tmp.path().join("b.png");
        create_test_jpeg(&jpg, 64, 32);
        create_test_png(&png, 30, 40);

        let d = decode(&std::fs::read(&jpg).unwrap()).unwrap();
        assert_eq!(d.format, OutputFormat::Jpeg);
        assert_eq!(d.raster.dimensions(), (64, 32));

        let d = decode(&std::fs::read(&png).unwrap()).unwrap();
        assert_eq!(d.format, OutputFormat::Png);
        assert_eq!(d.raster.dimensions(), (30, 40));
    }

    #[test]
    fn format_comes_from_content_not_name() {
        let tmp = TempDir::new().unwrap();
        let lying = tmp.path().join("actually-png.jpg");
        create_test_png(&lying, 8, 8);
        let d = decode(&std::fs::read(&lying).unwrap()).unwrap();
        assert_eq!(d.format, OutputFormat::Png);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode(b"this is not an image"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn other_formats_are_unsupported() {
        // Minimal BMP header magic
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0u8; 64]);
        assert!(matches!(decode(&bmp), Err(CodecError::Unsupported(_))));
    }

    #[test]
    fn encode_keeps_format_and_dimensions() {
        let canvas = grey_canvas(40, 20);
        for format in [OutputFormat::Jpeg, OutputFormat::Png] {
            let bytes = encode(&canvas, format, Quality::default()).unwrap();
            let back = decode(&bytes).unwrap();
            assert_eq!(back.format, format);
            assert_eq!(back.raster.dimensions(), (40, 20));
        }
    }

    #[test]
    fn png_is_lossless() {
        let canvas = grey_canvas(5, 5);
        let bytes = encode(&canvas, OutputFormat::Png, Quality::default()).unwrap();
        assert_eq!(decode(&bytes).unwrap().raster, canvas);
    }

    #[test]
    fn extension_per_format() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
    }
}
