//! Text faces: measurement, metrics and rasterization.
//!
//! | Type | Backing | Used for |
//! |---|---|---|
//! | [`TrueTypeFace`] | `ab_glyph` outline font scaled to a point size | regular stamping |
//! | [`FallbackFace`] | `embedded-graphics` 7×13 monospace bitmap | no font, unreadable font, or no size fits the width |
//!
//! Everything above this module talks to the [`Face`] trait, so the size
//! solver and the layout engine can be exercised with a mock face that has
//! exact, predictable advances.
//!
//! A parsed font is shared between workers as an immutable [`FaceSource`]
//! behind an `Arc`. Each size trial asks the source for a brand new face;
//! no face state is ever shared across threads.

mod fallback;
pub mod system;
mod truetype;

pub use fallback::FallbackFace;
pub use system::{find_system_font, resolve_font_path};
pub use truetype::{TrueTypeFace, load_font};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error reading font {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid font file {}", .0.display())]
    Invalid(PathBuf),
}

/// Vertical metrics in whole pixels.
///
/// Both values are distances from the baseline, so `descent` is positive for
/// glyphs that hang below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceMetrics {
    pub ascent: i32,
    pub descent: i32,
}

impl FaceMetrics {
    pub fn line_height(self) -> i32 {
        self.ascent + self.descent
    }
}

/// Rasterized coverage of a string, positioned relative to its pen origin.
///
/// The pen origin is the left end of the baseline. `left`/`top` locate the
/// mask's top-left pixel relative to that origin (`top` is negative for
/// anything drawn above the baseline).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    /// Row-major alpha in `0.0..=1.0`, `width * height` entries.
    pub alpha: Vec<f32>,
}

impl Coverage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.alpha[(y * self.width + x) as usize]
    }
}

/// A font instantiated at one size.
pub trait Face {
    /// Nominal size this face was built for.
    fn point_size(&self) -> f32;

    /// Advance width of `text` in device pixels, rounded up.
    fn measure(&self, text: &str) -> u32;

    fn metrics(&self) -> FaceMetrics;

    /// Render `text` into a coverage mask.
    fn rasterize(&self, text: &str) -> Coverage;
}

/// Something that can build independent faces at arbitrary sizes.
///
/// Returns `None` when a face cannot be built at `point_size`; the size
/// solver treats that size as infeasible.
pub trait FaceSource: Send + Sync {
    fn face_at(&self, point_size: f32) -> Option<Box<dyn Face>>;
}
