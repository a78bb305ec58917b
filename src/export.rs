//! Export assemblers: parsed pages → lazy stream of flat records.
//!
//! One [`Exporter`] serves all five modes; [`crate::config::ExportMode`]
//! selects which unit each record represents. The variants differ only in
//! what they crop and which fields they emit, so they share the same
//! locate/load/crop primitives and dispatch to one function each.
//!
//! ## Laziness
//!
//! [`Exporter::export`] returns a pull-based iterator. The image for page
//! N+1 is not located, fetched, or decoded until every record of page N has
//! been consumed, which bounds peak memory to roughly one page image plus
//! one crop. Counters accumulate during iteration and are read afterwards
//! via [`Exporter::stats`].

use crate::config::{ExportConfig, ExportMode};
use crate::error::{ExportError, SkipReason};
use crate::geometry;
use crate::model::{Page, Polygon};
use crate::pipeline::image::load_rgb;
use crate::pipeline::source::DataSource;
use crate::window::sliding_windows;
use image::RgbImage;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many failed-image samples the summary prints.
const SUMMARY_FAILURE_SAMPLES: usize = 5;

// ── Records ──────────────────────────────────────────────────────────────

/// Raw mode: full page image plus the verbatim XML source.
#[derive(Debug, Clone, Serialize)]
pub struct RawRecord {
    #[serde(skip)]
    pub image: RgbImage,
    pub xml: String,
    pub filename: String,
    pub project: String,
}

/// Text mode: full page image plus newline-joined region texts.
#[derive(Debug, Clone, Serialize)]
pub struct TextRecord {
    #[serde(skip)]
    pub image: RgbImage,
    pub text: String,
    pub filename: String,
    pub project: String,
}

/// Region mode: cropped region image plus region metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RegionRecord {
    #[serde(skip)]
    pub image: RgbImage,
    pub text: String,
    pub region_type: String,
    pub region_id: String,
    pub reading_order: u32,
    pub filename: String,
    pub project: String,
}

/// Line mode: cropped line image plus line and owning-region metadata.
#[derive(Debug, Clone, Serialize)]
pub struct LineRecord {
    #[serde(skip)]
    pub image: RgbImage,
    pub text: String,
    pub line_id: String,
    pub line_reading_order: u32,
    pub region_id: String,
    pub region_reading_order: u32,
    pub region_type: String,
    pub filename: String,
    pub project: String,
}

/// Window mode: bounding-box crop over a group of consecutive lines.
#[derive(Debug, Clone, Serialize)]
pub struct WindowRecord {
    #[serde(skip)]
    pub image: RgbImage,
    pub text: String,
    /// Actual number of lines in this window (the trailing window may be
    /// shorter than the configured size).
    pub window_size: usize,
    pub window_index: usize,
    /// Comma-joined ids of the window's lines.
    pub line_ids: String,
    /// Comma-joined reading orders of the window's lines.
    pub line_reading_orders: String,
    pub region_id: String,
    pub region_reading_order: u32,
    pub region_type: String,
    pub filename: String,
    pub project: String,
}

/// One flat output record, tagged by export mode.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Record {
    Raw(RawRecord),
    Text(TextRecord),
    Region(RegionRecord),
    Line(LineRecord),
    Window(WindowRecord),
}

impl Record {
    /// The record's image, whatever the mode.
    pub fn image(&self) -> &RgbImage {
        match self {
            Record::Raw(r) => &r.image,
            Record::Text(r) => &r.image,
            Record::Region(r) => &r.image,
            Record::Line(r) => &r.image,
            Record::Window(r) => &r.image,
        }
    }

    /// Consume the record, returning its image.
    pub fn into_image(self) -> RgbImage {
        match self {
            Record::Raw(r) => r.image,
            Record::Text(r) => r.image,
            Record::Region(r) => r.image,
            Record::Line(r) => r.image,
            Record::Window(r) => r.image,
        }
    }
}

// ── Run statistics ───────────────────────────────────────────────────────

/// Counters accumulated over one export run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Records successfully emitted.
    pub processed: usize,
    /// Units skipped for any skip-level reason.
    pub skipped: usize,
    /// `(source, error)` pairs for images that were found but failed to load.
    pub failed_images: Vec<(String, String)>,
}

// ── Exporter ─────────────────────────────────────────────────────────────

/// Assembles flat records from parsed pages and a data source.
#[derive(Debug)]
pub struct Exporter {
    config: ExportConfig,
    source: DataSource,
    stats: Rc<RefCell<RunStats>>,
}

impl Exporter {
    /// Create an exporter, validating the window configuration.
    ///
    /// Invalid window parameters are a construction-level error here, not a
    /// per-window condition during iteration.
    pub fn new(source: DataSource, config: ExportConfig) -> Result<Self, ExportError> {
        if config.window_size == 0 {
            return Err(ExportError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if config.overlap >= config.window_size {
            return Err(ExportError::InvalidWindowConfig {
                window_size: config.window_size,
                overlap: config.overlap,
            });
        }
        Ok(Self {
            config,
            source,
            stats: Rc::new(RefCell::new(RunStats::default())),
        })
    }

    /// Lazily produce one record per unit of the configured mode.
    ///
    /// Pages are processed strictly in order; nothing for a page is loaded
    /// until the consumer pulls its first record. Input pages are never
    /// mutated.
    pub fn export<'a>(&'a self, pages: &'a [Page]) -> impl Iterator<Item = Record> + 'a {
        info!(
            "exporting {} pages in {} mode",
            pages.len(),
            self.config.mode
        );
        pages.iter().flat_map(move |page| self.page_records(page))
    }

    /// Snapshot of the counters accumulated so far.
    pub fn stats(&self) -> RunStats {
        self.stats.borrow().clone()
    }

    /// Log the end-of-run summary: counts plus up to five failure samples.
    pub fn log_summary(&self) {
        let stats = self.stats.borrow();
        info!(
            "processing summary: {} successfully processed, {} skipped",
            stats.processed, stats.skipped
        );
        if !stats.failed_images.is_empty() {
            warn!("failed images:");
            for (source, error) in stats.failed_images.iter().take(SUMMARY_FAILURE_SAMPLES) {
                warn!("  {source}: {error}");
            }
            if stats.failed_images.len() > SUMMARY_FAILURE_SAMPLES {
                warn!(
                    "  ... and {} more",
                    stats.failed_images.len() - SUMMARY_FAILURE_SAMPLES
                );
            }
        }
    }

    // ── Per-page dispatch ────────────────────────────────────────────────

    fn page_records<'a>(&'a self, page: &'a Page) -> Box<dyn Iterator<Item = Record> + 'a> {
        let Some(image) = self.load_page_image(page) else {
            return Box::new(std::iter::empty());
        };

        match self.config.mode {
            ExportMode::Raw => Box::new(std::iter::once(self.raw_record(page, &image))),
            ExportMode::Text => Box::new(std::iter::once(self.text_record(page, &image))),
            ExportMode::Region => self.region_records(page, image),
            ExportMode::Line => self.line_records(page, image),
            ExportMode::Window => self.window_records(page, image),
        }
    }

    fn raw_record(&self, page: &Page, image: &RgbImage) -> Record {
        self.stats.borrow_mut().processed += 1;
        Record::Raw(RawRecord {
            image: image.clone(),
            xml: page.xml_content.clone(),
            filename: page.image_filename.clone(),
            project: page.project_name.clone(),
        })
    }

    fn text_record(&self, page: &Page, image: &RgbImage) -> Record {
        // Regions are already in reading order; regions without a (non-blank)
        // region-level annotation are excluded from the page text.
        let text = page
            .regions
            .iter()
            .filter_map(|r| r.full_text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        self.stats.borrow_mut().processed += 1;
        Record::Text(TextRecord {
            image: image.clone(),
            text,
            filename: page.image_filename.clone(),
            project: page.project_name.clone(),
        })
    }

    fn region_records<'a>(
        &'a self,
        page: &'a Page,
        image: Rc<RgbImage>,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        Box::new(page.regions.iter().filter_map(move |region| {
            let has_text = region.full_text.as_deref().is_some_and(|t| !t.is_empty());
            if !has_text && !self.config.allow_empty {
                self.skip(format_args!("region {}", region.id), &SkipReason::EmptyText);
                return None;
            }

            match geometry::crop_polygon(
                &image,
                &region.coords,
                self.config.mask,
                self.config.min_width,
            ) {
                Ok(crop) => {
                    self.stats.borrow_mut().processed += 1;
                    Some(Record::Region(RegionRecord {
                        image: crop,
                        text: region.full_text.clone().unwrap_or_default(),
                        region_type: region.region_type.clone(),
                        region_id: region.id.clone(),
                        reading_order: region.reading_order,
                        filename: page.image_filename.clone(),
                        project: page.project_name.clone(),
                    }))
                }
                Err(reason) => {
                    self.skip(format_args!("region {}", region.id), &reason);
                    None
                }
            }
        }))
    }

    fn line_records<'a>(
        &'a self,
        page: &'a Page,
        image: Rc<RgbImage>,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        Box::new(page.regions.iter().flat_map(move |region| {
            let image = Rc::clone(&image);
            region.lines.iter().filter_map(move |line| {
                let has_text = line.text.as_deref().is_some_and(|t| !t.is_empty());
                if !has_text && !self.config.allow_empty {
                    self.skip(format_args!("line {}", line.id), &SkipReason::EmptyText);
                    return None;
                }

                match geometry::crop_polygon(
                    &image,
                    &line.coords,
                    self.config.mask,
                    self.config.min_width,
                ) {
                    Ok(crop) => {
                        self.stats.borrow_mut().processed += 1;
                        Some(Record::Line(LineRecord {
                            image: crop,
                            text: line.text.clone().unwrap_or_default(),
                            line_id: line.id.clone(),
                            line_reading_order: line.reading_order,
                            region_id: line.region_id.clone(),
                            region_reading_order: region.reading_order,
                            region_type: region.region_type.clone(),
                            filename: page.image_filename.clone(),
                            project: page.project_name.clone(),
                        }))
                    }
                    Err(reason) => {
                        self.skip(format_args!("line {}", line.id), &reason);
                        None
                    }
                }
            })
        }))
    }

    fn window_records<'a>(
        &'a self,
        page: &'a Page,
        image: Rc<RgbImage>,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        Box::new(page.regions.iter().flat_map(move |region| {
            let image = Rc::clone(&image);
            let windows =
                sliding_windows(&region.lines, self.config.window_size, self.config.overlap);

            windows
                .into_iter()
                .enumerate()
                .filter_map(move |(window_index, window)| {
                    let polygons: Vec<&Polygon> = window
                        .iter()
                        .map(|l| &l.coords)
                        .filter(|c| !c.is_empty())
                        .collect();
                    if polygons.is_empty() {
                        self.skip(
                            format_args!("window {window_index} in region {}", region.id),
                            &SkipReason::NoCoordinates,
                        );
                        return None;
                    }

                    let rect = geometry::enclosing_rect(&polygons);
                    match geometry::crop_polygon(&image, &rect, self.config.mask, None) {
                        Ok(crop) => {
                            self.stats.borrow_mut().processed += 1;
                            let text = window
                                .iter()
                                .filter_map(|l| l.text.as_deref())
                                .filter(|t| !t.is_empty())
                                .collect::<Vec<_>>()
                                .join("\n");
                            let line_ids = window
                                .iter()
                                .map(|l| l.id.as_str())
                                .collect::<Vec<_>>()
                                .join(", ");
                            let line_reading_orders = window
                                .iter()
                                .map(|l| l.reading_order.to_string())
                                .collect::<Vec<_>>()
                                .join(", ");

                            Some(Record::Window(WindowRecord {
                                image: crop,
                                text,
                                window_size: window.len(),
                                window_index,
                                line_ids,
                                line_reading_orders,
                                region_id: region.id.clone(),
                                region_reading_order: region.reading_order,
                                region_type: region.region_type.clone(),
                                filename: page.image_filename.clone(),
                                project: page.project_name.clone(),
                            }))
                        }
                        Err(reason) => {
                            self.skip(
                                format_args!("window {window_index} in region {}", region.id),
                                &reason,
                            );
                            None
                        }
                    }
                })
        }))
    }

    // ── Shared primitives ────────────────────────────────────────────────

    /// Locate, fetch, and decode the page image. `None` counts as a skip.
    fn load_page_image(&self, page: &Page) -> Option<Rc<RgbImage>> {
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        let Some((label, bytes)) = self.source.find_image_bytes(page, timeout) else {
            warn!(
                "no image found for {} in project {}",
                page.image_filename, page.project_name
            );
            self.stats.borrow_mut().skipped += 1;
            return None;
        };

        match load_rgb(&bytes) {
            Ok(image) => Some(Rc::new(image)),
            Err(e) => {
                warn!("error loading image {label}: {e}");
                let mut stats = self.stats.borrow_mut();
                stats.failed_images.push((label, e));
                stats.skipped += 1;
                None
            }
        }
    }

    fn skip(&self, what: std::fmt::Arguments<'_>, reason: &SkipReason) {
        debug!("skipping {what}: {reason}");
        self.stats.borrow_mut().skipped += 1;
    }
}
