//! Parsing stages: bytes → text → typed pages.
//!
//! ```text
//! source listing ──▶ project ──▶ encoding ──▶ xml
//! (zip/folder)      (grouping)   (decode)     (Page model)
//! ```
//!
//! 1. [`project`]  — group candidate files into logical projects and filter
//!    platform metadata / OS artifacts
//! 2. [`encoding`] — decode raw bytes with the UTF-8 → detection → fallback
//!    chain
//! 3. [`xml`]      — parse one decoded document into a [`crate::model::Page`]
//!
//! Every stage failure is a logged skip; batch parsing always continues with
//! the remaining files.

pub mod encoding;
pub mod project;
pub mod xml;

pub use encoding::decode_bytes;
pub use xml::{LayoutParser, DEFAULT_NAMESPACE};

use crate::model::Page;
use crate::pipeline::source::DataSource;
use tracing::{info, warn};

impl LayoutParser {
    /// Parse every layout document in a source (ZIP archive or directory).
    ///
    /// Files are grouped into projects first; each file is then decoded and
    /// parsed. A file that cannot be read, decoded, or parsed is skipped
    /// with a logged reason and the batch continues.
    ///
    /// # Errors
    /// Only source-level failures (unreadable archive, I/O on the listing)
    /// are fatal; per-file problems never are.
    pub fn parse_source(&self, source: &DataSource) -> Result<Vec<Page>, crate::ExportError> {
        let files = source.list_files()?;
        let projects = project::group_by_project(&files);

        let mut pages = Vec::new();
        for (project_name, project_files) in projects {
            info!(
                "processing project: {project_name} ({} files)",
                project_files.len()
            );
            for path in project_files {
                let raw = match source.read_bytes(&path) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("skipping {path}: {e}");
                        continue;
                    }
                };
                let Some(xml) = decode_bytes(&raw, &path) else {
                    warn!("skipping {path} due to read error");
                    continue;
                };
                match self.parse_page_xml(&xml, &project_name) {
                    Some(page) => pages.push(page),
                    None => warn!("skipping {path}: no recognizable page content"),
                }
            }
        }

        Ok(pages)
    }
}
