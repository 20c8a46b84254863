//! Output file names and collision handling.
//!
//! ## Names
//!
//! - `IMG_0042.jpg` → `IMG_0042_watermarked.jpg` (suffix before the extension)
//! - with rename-to-date: `2021-07-04 10:20:30` → `2021-07-04_10_20_30.jpg`
//!
//! ## Collisions
//!
//! Existing files are never silently replaced while a free name can be
//! found: `name.jpg`, then `name_1.jpg`, `name_2.jpg`, … up to
//! [`MAX_UNIQUE_ATTEMPTS`]. Past that the plain candidate is used and
//! overwritten. [`create_unique`] claims the name with an exclusive create,
//! so two workers racing for the same name end up with different files.

use crate::codec::OutputFormat;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SUFFIX: &str = "_watermarked";
/// File stem used when a date filters down to nothing.
pub const PLACEHOLDER_NAME: &str = "photo";
pub const MAX_UNIQUE_ATTEMPTS: u32 = 1000;
/// How often [`create_unique`] re-scans after losing a race.
const CREATE_RETRIES: u32 = 8;

fn extension_for(source: &Path, format: OutputFormat) -> String {
    source
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format.extension().to_string())
}

/// `<stem><suffix>.<ext>`, keeping the source extension as written.
pub fn watermarked_file_name(source: &Path, suffix: &str, format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| PLACEHOLDER_NAME.to_string());
    format!("{stem}{suffix}.{}", extension_for(source, format))
}

/// Map every character outside `[A-Za-z0-9-_.]` to `_`.
pub fn sanitize_stem(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File name built from a resolved date, e.g. `2021-07-04_10_20_30.jpg`.
pub fn date_file_name(date: &str, source: &Path, format: OutputFormat) -> String {
    let mut stem = sanitize_stem(date.trim());
    if stem.is_empty() {
        stem = PLACEHOLDER_NAME.to_string();
    }
    format!("{stem}.{}", extension_for(source, format))
}

/// Directory under `output_root` mirroring where `source` sits below `input_root`.
///
/// Sources outside `input_root` land directly in `output_root`.
pub fn mirror_dir(input_root: &Path, source: &Path, output_root: &Path) -> PathBuf {
    let parent = source.parent().unwrap_or(Path::new(""));
    match parent.strip_prefix(input_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.to_path_buf(),
    }
}

/// `dir/stem_<n>.ext` for `dir/stem.ext`.
fn numbered(candidate: &Path, n: u32) -> PathBuf {
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match candidate.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    candidate.with_file_name(name)
}

/// First of `candidate`, `stem_1.ext`, `stem_2.ext`, … that does not exist.
///
/// Gives up after [`MAX_UNIQUE_ATTEMPTS`] numbered names and returns
/// `candidate` unchanged.
pub fn unique_path(candidate: &Path) -> PathBuf {
    if !candidate.exists() {
        return candidate.to_path_buf();
    }
    (1..=MAX_UNIQUE_ATTEMPTS)
        .map(|n| numbered(candidate, n))
        .find(|p| !p.exists())
        .unwrap_or_else(|| candidate.to_path_buf())
}

/// Create a new file at the first free name for `candidate`.
///
/// The file is opened with `create_new`, so a name is only handed out once
/// even when several workers ask for it at the same moment.
pub fn create_unique(candidate: &Path) -> io::Result<(PathBuf, File)> {
    for _ in 0..CREATE_RETRIES {
        let path = unique_path(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    debug!(path = %candidate.display(), "no free name left, overwriting");
    let file = File::create(candidate)?;
    Ok((candidate.to_path_buf(), file))
}
