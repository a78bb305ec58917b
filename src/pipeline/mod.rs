//! I/O stages feeding the exporters.
//!
//! ```text
//! source ──▶ image
//! (locate bytes)  (decode + orient)
//! ```
//!
//! 1. [`source`] — enumerate a ZIP archive or directory tree, read raw file
//!    bytes, and locate a page's image (local candidates first, remote URL
//!    fallback last)
//! 2. [`image`]  — decode image bytes to RGB with EXIF-orientation
//!    correction; the remote fetch with its fixed timeout also lives here,
//!    as the pipeline's only network operation
//!
//! All work is synchronous and sequential per page; laziness comes from the
//! pull-based record iterator in [`crate::export`], which keeps peak memory
//! at roughly one page image.

pub mod image;
pub mod source;
