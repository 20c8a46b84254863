//! Capture-date resolution.
//!
//! The stamped text comes from the first source that yields a value:
//!
//! 1. EXIF `DateTimeOriginal`
//! 2. EXIF `DateTime`
//! 3. file modification time, local time zone
//! 4. the current time
//!
//! The chain never fails. EXIF dates are stored as `YYYY:MM:DD HH:MM:SS`;
//! [`normalize_exif_date`] turns the date separators into dashes and leaves
//! everything else alone.

use chrono::{DateTime, Local};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Layout of dates built from timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Exif,
    Modified,
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub text: String,
    pub source: DateSource,
}

/// Resolve the date to stamp on the image at `path`, whose contents are `bytes`.
pub fn resolve_date(bytes: &[u8], path: &Path) -> ResolvedDate {
    let (raw, source) = if let Some(text) = exif_date(bytes) {
        (text, DateSource::Exif)
    } else if let Some(text) = modified_date(path) {
        (text, DateSource::Modified)
    } else {
        (format_local(Local::now()), DateSource::Now)
    };
    let text = normalize_exif_date(&raw);
    debug!(path = %path.display(), ?source, date = %text, "resolved capture date");
    ResolvedDate { text, source }
}

/// `DateTimeOriginal`, else `DateTime`, from the EXIF block in `bytes`.
pub fn exif_date(bytes: &[u8]) -> Option<String> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .find_map(|tag| ascii_field(&exif, tag))
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let raw = values.first()?;
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!text.is_empty()).then(|| text.to_string())
}

/// The file's modification time, formatted in the local time zone.
pub fn modified_date(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(format_local(DateTime::<Local>::from(modified)))
}

pub fn format_local(time: DateTime<Local>) -> String {
    time.format(DATE_FORMAT).to_string()
}

/// Rewrite `YYYY:MM:DD...` to `YYYY-MM-DD...`.
///
/// Only the separators at bytes 4 and 7 change, and only when the date
/// fields around them are digits. Anything else is returned unchanged.
pub fn normalize_exif_date(s: &str) -> String {
    let b = s.as_bytes();
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    if b.len() >= 10 && b[4] == b':' && b[7] == b':' && digits(0..4) && digits(5..7) && digits(8..10)
    {
        format!("{}-{}-{}", &s[..4], &s[5..7], &s[8..])
    } else {
        s.to_string()
    }
}
