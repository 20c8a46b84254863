//! One photo in, one stamped photo out.
//!
//! ```text
//! read bytes ─▶ resolve date ─▶ decode ─▶ fit ─▶ wrap ─▶ place + render
//!                                                              │
//!        exclusive write ◀─ create dirs ◀─ encode (same format) ◀┘
//! ```
//!
//! Requests are built up front by [`requests_for`], which turns a scan
//! [`Plan`] and the `-o` argument into one immutable [`WatermarkRequest`] per
//! photo. Workers only ever see requests; the [`Watermarker`] runner carries
//! no state of its own.

use crate::batch::JobRunner;
use crate::codec::{self, CodecError, Decoded, OutputFormat, Quality};
use crate::date::resolve_date;
use crate::fit::{self, FitTarget, FittedFace, HeightPolicy};
use crate::font::FaceSource;
use crate::layout::{self, Bounds, TextStyle};
use crate::naming::{self, DEFAULT_SUFFIX};
use crate::scan::Plan;
use crate::wrap::wrap_text;
use image::RgbaImage;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Job panicked: {0}")]
    Panicked(String),
}

/// Knobs shared by every job of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StampSettings {
    /// Margin as a percentage of the shorter image side.
    pub margin_percent: f32,
    /// Width of the text block as a percentage of the image width.
    pub width_percent: u32,
    /// Height of the text block as a percentage of the image height.
    pub height_percent: u32,
    pub height_policy: HeightPolicy,
    pub suffix: String,
    pub quality: Quality,
    pub rename_to_date: bool,
}

impl Default for StampSettings {
    fn default() -> Self {
        Self {
            margin_percent: 2.0,
            width_percent: 30,
            height_percent: 25,
            height_policy: HeightPolicy::default(),
            suffix: DEFAULT_SUFFIX.to_string(),
            quality: Quality::default(),
            rename_to_date: false,
        }
    }
}

/// Where a job's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Exactly this file (collisions still get numbered).
    File(PathBuf),
    /// A generated name inside this directory.
    Directory(PathBuf),
}

/// Everything a worker needs for one photo.
#[derive(Clone)]
pub struct WatermarkRequest {
    pub source: PathBuf,
    pub destination: Destination,
    pub settings: Arc<StampSettings>,
    pub font: Option<Arc<dyn FaceSource>>,
}

impl fmt::Debug for WatermarkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkRequest")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("settings", &self.settings)
            .field("font", &self.font.is_some())
            .finish()
    }
}

/// How the `-o` argument was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// No `-o`: write next to each source.
    Alongside,
    Directory(PathBuf),
    File(PathBuf),
}

/// An existing directory, or a path ending in a separator, is a directory.
pub fn output_target(output: Option<&Path>) -> OutputTarget {
    match output {
        None => OutputTarget::Alongside,
        Some(path) if path.is_dir() || ends_with_separator(path) => {
            OutputTarget::Directory(path.to_path_buf())
        }
        Some(path) => OutputTarget::File(path.to_path_buf()),
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .ends_with(std::path::is_separator)
}

fn alongside(source: &Path) -> Destination {
    Destination::Directory(source.parent().unwrap_or(Path::new("")).to_path_buf())
}

/// One request per planned source, in plan order.
pub fn requests_for(
    plan: &Plan,
    target: &OutputTarget,
    settings: Arc<StampSettings>,
    font: Option<Arc<dyn FaceSource>>,
) -> Vec<WatermarkRequest> {
    let request = |source: &Path, destination| WatermarkRequest {
        source: source.to_path_buf(),
        destination,
        settings: Arc::clone(&settings),
        font: font.clone(),
    };

    match plan {
        Plan::Single(source) => {
            let destination = match target {
                OutputTarget::Alongside => alongside(source),
                OutputTarget::Directory(dir) => Destination::Directory(dir.clone()),
                OutputTarget::File(file) => Destination::File(file.clone()),
            };
            vec![request(source.as_path(), destination)]
        }
        Plan::Tree { root, files } => {
            if let OutputTarget::File(file) = target {
                warn!(
                    output = %file.display(),
                    "output is not a directory, writing next to each source instead"
                );
            }
            files
                .iter()
                .map(|source| {
                    let destination = match target {
                        OutputTarget::Directory(out) => {
                            Destination::Directory(naming::mirror_dir(root, source, out))
                        }
                        OutputTarget::Alongside | OutputTarget::File(_) => alongside(source),
                    };
                    request(source.as_path(), destination)
                })
                .collect()
        }
    }
}

/// Margin in pixels: a percentage of the shorter side, rounded.
pub fn margin_px(width: u32, height: u32, margin_percent: f32) -> u32 {
    let shorter = width.min(height) as f32;
    (shorter * margin_percent / 100.0).round().max(0.0) as u32
}

/// The box the date has to fit for an image of this size.
pub fn fit_target(width: u32, height: u32, margin: u32, settings: &StampSettings) -> FitTarget {
    let target_width = (width as u64 * settings.width_percent as u64 / 100) as u32;
    let by_percent = (height as u64 * settings.height_percent as u64 / 100) as u32;
    let inside_margins = height.saturating_sub(margin.saturating_mul(2));
    FitTarget::new(target_width, by_percent.min(inside_margins), width as f32)
}

/// Draw `text` onto `raster` in the bottom-right corner.
pub fn stamp(
    raster: &mut RgbaImage,
    text: &str,
    font: Option<&dyn FaceSource>,
    settings: &StampSettings,
) -> FittedFace {
    let (width, height) = raster.dimensions();
    let margin = margin_px(width, height, settings.margin_percent);
    let target = fit_target(width, height, margin, settings);
    let fitted = fit::solve(font, text, target, settings.height_policy);
    let face = fitted.face();

    let lines = wrap_text(text, target.width, |s| face.measure(s));
    let placed = layout::place(&lines, face, Bounds { width, height }, margin);
    layout::render(
        raster,
        &placed,
        face,
        &TextStyle::for_line_height(fitted.line_height),
    );
    fitted
}

fn output_path(request: &WatermarkRequest, date: &str, format: OutputFormat) -> PathBuf {
    match &request.destination {
        Destination::File(path) => path.clone(),
        Destination::Directory(dir) => {
            let settings = &request.settings;
            let name = if settings.rename_to_date {
                naming::date_file_name(date, &request.source, format)
            } else {
                naming::watermarked_file_name(&request.source, &settings.suffix, format)
            };
            dir.join(name)
        }
    }
}

/// Run one request to completion and return the written path.
pub fn watermark(request: &WatermarkRequest) -> Result<PathBuf, WatermarkError> {
    let source = &request.source;
    let bytes = fs::read(source).map_err(|e| WatermarkError::Read {
        path: source.clone(),
        source: e,
    })?;

    let date = resolve_date(&bytes, source);
    let Decoded { mut raster, format } = codec::decode(&bytes)?;
    let fitted = stamp(
        &mut raster,
        &date.text,
        request.font.as_deref(),
        &request.settings,
    );
    debug!(
        path = %source.display(),
        point_size = fitted.point_size,
        fallback = fitted.fallback,
        "stamped"
    );
    let encoded = codec::encode(&raster, format, request.settings.quality)?;

    let candidate = output_path(request, &date.text, format);
    if let Some(parent) = candidate.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WatermarkError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let (path, mut file) =
        naming::create_unique(&candidate).map_err(|e| WatermarkError::Write {
            path: candidate.clone(),
            source: e,
        })?;
    if let Err(e) = file.write_all(&encoded) {
        drop(file);
        let _ = fs::remove_file(&path);
        return Err(WatermarkError::Write { path, source: e });
    }
    Ok(path)
}

/// The production [`JobRunner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Watermarker;

impl JobRunner for Watermarker {
    fn run(&self, request: &WatermarkRequest) -> Result<PathBuf, WatermarkError> {
        watermark(request)
    }
}
