//! Error types for the pagexml2ds library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`ExportError`] — **Fatal/construction**: the run cannot proceed at all
//!   (source path missing, unreadable archive, invalid window configuration).
//!   Returned as `Err(ExportError)` from constructors and top-level entry
//!   points.
//!
//! * [`SkipReason`] — **Skip-level**: a single page, region, line, or window
//!   could not be exported (missing image, degenerate crop, empty text). The
//!   unit is counted as skipped and the run continues; no skip-level
//!   condition ever aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagexml2ds library.
///
/// Per-unit failures use [`SkipReason`] and are tallied in
/// [`crate::export::RunStats`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Source path was not found on disk.
    #[error("source not found: '{path}'\nExpected a ZIP archive or a directory of PAGE XML files.")]
    SourceNotFound { path: PathBuf },

    /// The source archive could not be opened or read.
    #[error("failed to read archive '{path}': {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Filesystem error while enumerating or reading a source file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Window configuration rejected at exporter construction.
    #[error("invalid window configuration: overlap ({overlap}) must be less than window size ({window_size})")]
    InvalidWindowConfig { window_size: usize, overlap: usize },

    /// Any other builder validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal reason a single export unit was skipped.
///
/// Skips are logged and counted; processing always continues with the next
/// unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// No local image matched the declared filename and the remote fallback
    /// (if any) failed.
    #[error("no image found")]
    NoImage,

    /// Image bytes were located but could not be decoded.
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    /// The polygon was empty, so there is nothing to crop.
    #[error("no coordinates to crop")]
    NoCoordinates,

    /// The clamped bounding box had zero or negative extent.
    #[error("degenerate crop box ({min_x}, {min_y}, {max_x}, {max_y})")]
    DegenerateCrop {
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
    },

    /// The crop was valid but narrower than the configured minimum.
    #[error("crop width {width} below minimum {min_width}")]
    BelowMinWidth { width: u32, min_width: u32 },

    /// The unit carries no text and empty units are not allowed.
    #[error("empty text")]
    EmptyText,
}
