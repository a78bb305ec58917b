//! Typed in-memory model of a parsed layout page.
//!
//! A [`Page`] owns its [`Region`]s, each region owns its [`Line`]s, and a
//! line refers back to its region by id string only — the tree has no cyclic
//! references. All three types are created once by the parser and immutable
//! afterwards; the exporters only read them.

use serde::Serialize;

/// An ordered polygon as integer pixel coordinates.
///
/// Either empty (the source element carried no usable `points` attribute) or
/// a list of at least one `(x, y)` pair. Cropping requires three or more
/// points; anything smaller is handled as a graceful skip, never a panic.
pub type Polygon = Vec<(i32, i32)>;

/// One transcribed text line within a region.
#[derive(Debug, Clone, Serialize)]
pub struct Line {
    /// Element id, unique within the owning region.
    pub id: String,
    /// Transcription, if the line carries a `TextEquiv/Unicode` annotation.
    /// `None` means "no annotation"; `Some("")` means "annotated as blank".
    pub text: Option<String>,
    /// Outline polygon of the line.
    pub coords: Polygon,
    /// Baseline polyline, when present.
    pub baseline: Option<Polygon>,
    /// Position in the region's reading sequence. 0 when unspecified.
    pub reading_order: u32,
    /// Id of the owning region (back-reference by value, not ownership).
    pub region_id: String,
}

/// A contiguous layout area (paragraph, heading, …) with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    /// Element id, unique within the page.
    pub id: String,
    /// Free-form type tag from the source document, "paragraph" by default.
    pub region_type: String,
    /// Outline polygon of the region.
    pub coords: Polygon,
    /// Lines in reading order (stable sort; ties keep document order).
    pub lines: Vec<Line>,
    /// Position in the page's reading sequence, from the page-level
    /// reading-order table. 0 for regions absent from that table.
    pub reading_order: u32,
    /// Region-level transcription annotation. This is *not* derived from the
    /// lines: a region whose lines carry text but which has no region-level
    /// annotation has `full_text == None`.
    pub full_text: Option<String>,
}

/// One parsed layout document: the unit of work for every export mode.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Declared image filename. May be empty.
    pub image_filename: String,
    /// Declared image width in pixels, 0 when absent or unparseable.
    pub image_width: u32,
    /// Declared image height in pixels, 0 when absent or unparseable.
    pub image_height: u32,
    /// Remote image URL, used as a fallback when no local image is found.
    pub image_url: Option<String>,
    /// Regions in reading order (stable sort; ties keep document order).
    pub regions: Vec<Region>,
    /// The raw XML source, retained verbatim for the raw export mode.
    pub xml_content: String,
    /// Logical grouping key derived from the source directory layout.
    pub project_name: String,
}

impl Page {
    /// Total number of lines across all regions.
    pub fn line_count(&self) -> usize {
        self.regions.iter().map(|r| r.lines.len()).sum()
    }
}
