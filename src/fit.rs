//! Adaptive font sizing: the largest size whose wrapped text still fits.
//!
//! ## Search
//!
//! Bisection over point size in `[MIN_POINT_SIZE, target.max_point_size]`
//! for a fixed [`SEARCH_ITERATIONS`] budget. Each step builds a fresh trial
//! face from the shared [`FaceSource`], wraps the text against the target
//! width and keeps the size when the widest line fits:
//!
//! ```text
//! lo ──────────── mid ──────────── hi
//!       fits? ──▶ lo = mid, best = mid
//!       else  ──▶ hi = mid
//! ```
//!
//! Bisection is sound because feasibility is monotonic: glyph advances grow
//! with size, so if the text fits at `p` it fits at every size below `p`.
//!
//! ## Height
//!
//! Width is always searched. What happens when the width-fitting block is
//! taller than the target is a [`HeightPolicy`]:
//!
//! - [`HeightPolicy::Shrink`] runs a second search, bounded above by the
//!   width-only result, with the height constraint added. When even the
//!   smallest size is too tall, the block is drawn at [`MIN_POINT_SIZE`] and
//!   overflows the height.
//! - [`HeightPolicy::AcceptOverflow`] keeps the width-only size.
//!
//! ## Fallback
//!
//! No font, a font that never instantiates, or no size narrow enough for
//! the target width end in the built-in [`FallbackFace`]. Sizing never fails.

use crate::font::{Face, FaceSource, FallbackFace};
use crate::wrap::wrap_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Smallest point size the search considers.
pub const MIN_POINT_SIZE: f32 = 4.0;
/// Bisection steps per search.
pub const SEARCH_ITERATIONS: u32 = 12;
/// Target widths below this are raised to it.
pub const MIN_TARGET_WIDTH: u32 = 10;

/// What to do when the width-fitting block is taller than the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeightPolicy {
    #[default]
    Shrink,
    AcceptOverflow,
}

/// The box the text block has to fit in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTarget {
    pub width: u32,
    pub height: u32,
    /// Upper bound of the search; the image width is a loose but safe choice.
    pub max_point_size: f32,
}

impl FitTarget {
    pub fn new(width: u32, height: u32, max_point_size: f32) -> Self {
        Self {
            width: width.max(MIN_TARGET_WIDTH),
            height: height.max(1),
            max_point_size: max_point_size.max(MIN_POINT_SIZE),
        }
    }
}

/// The face a job settled on, with its metrics.
pub struct FittedFace {
    pub point_size: f32,
    pub ascent: i32,
    pub descent: i32,
    pub line_height: i32,
    /// True when the built-in bitmap face is in use.
    pub fallback: bool,
    face: Box<dyn Face>,
}

impl FittedFace {
    fn new(face: Box<dyn Face>, fallback: bool) -> Self {
        let metrics = face.metrics();
        Self {
            point_size: face.point_size(),
            ascent: metrics.ascent,
            descent: metrics.descent,
            line_height: metrics.line_height(),
            fallback,
            face,
        }
    }

    pub fn fallback() -> Self {
        Self::new(Box::new(FallbackFace), true)
    }

    pub fn face(&self) -> &dyn Face {
        self.face.as_ref()
    }
}

impl fmt::Debug for FittedFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedFace")
            .field("point_size", &self.point_size)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .field("line_height", &self.line_height)
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Widest wrapped line and line count of `text` at `max_width`.
pub fn measure_block(face: &dyn Face, text: &str, max_width: u32) -> (u32, usize) {
    let lines = wrap_text(text, max_width, |s| face.measure(s));
    let widest = lines.iter().map(|l| face.measure(l)).max().unwrap_or(0);
    (widest, lines.len())
}

/// Whether the widest wrapped line of `text` fits `target_width`.
pub fn fits_width(face: &dyn Face, text: &str, target_width: u32) -> bool {
    measure_block(face, text, target_width).0 <= target_width
}

/// Whether the wrapped block fits both dimensions of `target`.
pub fn fits_box(face: &dyn Face, text: &str, target: &FitTarget) -> bool {
    let (widest, lines) = measure_block(face, text, target.width);
    let height = lines as i64 * face.metrics().line_height() as i64;
    widest <= target.width && height <= target.height as i64
}

/// Bisect `[MIN_POINT_SIZE, hi]` for the largest size accepted by `feasible`.
fn bisect(
    source: &dyn FaceSource,
    hi: f32,
    feasible: impl Fn(&dyn Face) -> bool,
) -> Option<Box<dyn Face>> {
    let mut lo = MIN_POINT_SIZE;
    let mut hi = hi;
    let mut best = None;
    for _ in 0..SEARCH_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        match source.face_at(mid) {
            Some(face) if feasible(face.as_ref()) => {
                lo = mid;
                best = Some(face);
            }
            // Unbuildable sizes count as too large.
            _ => hi = mid,
        }
    }
    best
}

/// Pick the face for `text` inside `target`.
pub fn solve(
    source: Option<&dyn FaceSource>,
    text: &str,
    target: FitTarget,
    policy: HeightPolicy,
) -> FittedFace {
    let Some(source) = source else {
        return FittedFace::fallback();
    };

    let Some(face) = bisect(source, target.max_point_size, |f| {
        fits_width(f, text, target.width)
    }) else {
        debug!(width = target.width, "no font size fits, using fallback face");
        return FittedFace::fallback();
    };

    if policy == HeightPolicy::AcceptOverflow || fits_box(face.as_ref(), text, &target) {
        return FittedFace::new(face, false);
    }

    let width_only = face.point_size();
    match bisect(source, width_only, |f| fits_box(f, text, &target)) {
        Some(face) => FittedFace::new(face, false),
        None => {
            debug!(
                width = target.width,
                height = target.height,
                "no font size fits the height, drawing at the minimum size"
            );
            let floor = source
                .face_at(MIN_POINT_SIZE)
                .filter(|f| fits_width(f.as_ref(), text, target.width));
            FittedFace::new(floor.unwrap_or(face), false)
        }
    }
}
