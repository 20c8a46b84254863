//! Discovery of the photos a run will stamp.
//!
//! A file argument is a single job. A directory argument is walked in sorted
//! order and every supported photo becomes a job:
//!
//! ```text
//! photos/                 plan(photos, recursive = true)
//! ├── a.jpg          ──▶  photos/a.jpg
//! ├── notes.txt           (skipped: extension)
//! ├── .trip/
//! │   └── c.jpg      ──▶  photos/.trip/c.jpg
//! └── sub/
//!     └── b.PNG      ──▶  photos/sub/b.PNG
//! ```
//!
//! Without `recursive` only the top level is considered. Dot-prefixed names
//! are ordinary entries. Entries the walk cannot read are logged and
//! skipped; only an unreadable root is an error.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read input {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Extensions picked up from directories, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// What a run will process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The input was a file.
    Single(PathBuf),
    /// The input was a directory; `files` are in discovery order.
    Tree { root: PathBuf, files: Vec<PathBuf> },
}

impl Plan {
    pub fn sources(&self) -> &[PathBuf] {
        match self {
            Plan::Single(path) => std::slice::from_ref(path),
            Plan::Tree { files, .. } => files,
        }
    }
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Build the job list for `root`.
///
/// A file root is taken as-is, whatever its extension: the user named it.
pub fn plan(root: &Path, recursive: bool) -> Result<Plan, ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Ok(Plan::Single(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(ScanError::Walk(e)),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() && entry.path().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(Plan::Tree {
        root: root.to_path_buf(),
        files,
    })
}
