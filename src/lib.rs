//! # pagexml2ds
//!
//! Convert PAGE XML layout exports (Transkribus and friends) into flattened,
//! machine-learning-ready records: image crops paired with transcribed text.
//!
//! ## Why this crate?
//!
//! Annotation platforms export one XML document per scanned page, describing
//! regions, lines, polygons, and reading order — a shape that no training
//! pipeline consumes directly. This crate parses those documents into a
//! typed model, maps them onto the page images via polygon cropping, and
//! emits flat records at the granularity a model actually trains on: whole
//! pages, regions, single lines, or sliding windows of consecutive lines.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ZIP / folder
//!  │
//!  ├─ 1. Source   enumerate project subtrees, read raw bytes
//!  ├─ 2. Decode   UTF-8 → detection → single-byte fallbacks
//!  ├─ 3. Parse    PAGE XML → Page / Region / Line with reading order
//!  ├─ 4. Locate   page image (local candidates, then remote URL)
//!  ├─ 5. Crop     clamped bounding boxes, optional polygon mask
//!  └─ 6. Emit     lazy record stream + processed/skipped summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagexml2ds::{DataSource, ExportConfig, ExportMode, Exporter, LayoutParser};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = DataSource::open("export.zip")?;
//!     let parser = LayoutParser::default();
//!     let pages = parser.parse_source(&source)?;
//!
//!     let config = ExportConfig::builder().mode(ExportMode::Line).build()?;
//!     let exporter = Exporter::new(source, config)?;
//!     for record in exporter.export(&pages) {
//!         // feed into a dataset writer
//!         let _ = record.image();
//!     }
//!     exporter.log_summary();
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagexml2ds` binary (clap + anyhow + tracing-subscriber + indicatif + rand) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagexml2ds = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod window;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder, ExportMode};
pub use error::{ExportError, SkipReason};
pub use export::{Exporter, Record, RunStats};
pub use model::{Line, Page, Polygon, Region};
pub use parser::{decode_bytes, LayoutParser, DEFAULT_NAMESPACE};
pub use pipeline::source::DataSource;
