//! # datestamp
//!
//! Stamps the capture date onto photographs, bottom-right, white text with a
//! dark outline, sized to fit. Works on one file or a whole directory tree,
//! writing a stamped copy next to each photo or into a mirrored output tree.
//!
//! # Per-Photo Pipeline
//!
//! ```text
//! bytes ─▶ date (EXIF / mtime / now) ─▶ decode ─▶ fit size ─▶ wrap ─▶ render ─▶ encode ─▶ file
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Turns the input argument into a [`scan::Plan`]: one file or a sorted walk |
//! | [`pipeline`] | Builds one [`pipeline::WatermarkRequest`] per photo and runs it |
//! | [`batch`] | Worker pool with bounded queues, per-job results and cancellation |
//! | [`date`] | Capture date resolution and EXIF date normalisation |
//! | [`codec`] | JPEG/PNG decode to RGBA and encode back in the same format |
//! | [`fit`] | Bisection search for the largest font size that fits |
//! | [`wrap`] | Greedy word wrap with per-character breaking |
//! | [`layout`] | Bottom-right placement and outline + fill rendering |
//! | [`font`] | Face abstraction over `ab_glyph` fonts and a built-in bitmap face |
//! | [`naming`] | Output names, directory mirroring and collision-free creation |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`output`] | CLI outcome lines and summary |
//!
//! # Design Decisions
//!
//! ## Sizing Never Fails
//!
//! A missing font, a font that cannot be scaled, or an image too narrow for
//! any size all fall back to a fixed 7×13 bitmap face. A block that is too
//! tall at every size is drawn at the smallest size instead. A photo only
//! fails when it cannot be read, decoded or written.
//!
//! ## Immutable Requests
//!
//! Everything a job needs is resolved before the batch starts and frozen in
//! its request. Workers share the parsed font and settings behind `Arc`s and
//! own their raster outright, so no locking is needed anywhere in the
//! per-photo path.
//!
//! ## Exclusive Output Creation
//!
//! Output files are claimed with `create_new`. Two photos that map to the
//! same output name (`a.jpg` and `a.JPG`, or two photos taken in the same
//! second with rename-to-date) get `name.jpg` and `name_1.jpg` regardless of
//! which worker gets there first.

pub mod batch;
pub mod codec;
pub mod config;
pub mod date;
pub mod fit;
pub mod font;
pub mod layout;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod wrap;

#[cfg(test)]
pub(crate) mod test_helpers;
