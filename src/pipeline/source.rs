//! Source resolution: enumerate and read a ZIP archive or directory tree.
//!
//! Both layouts mirror the annotation platform's export structure: one or
//! more project subtrees, each holding layout XML (usually under `page/`)
//! plus an `images` subdirectory or sibling image files. The archive is
//! reopened per read — pages are processed strictly sequentially, so there
//! is never more than one open handle, and the exporter may hold the source
//! across the whole lazy iteration without pinning archive state.

use crate::error::ExportError;
use crate::model::Page;
use crate::pipeline::image::fetch_remote;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use zip::ZipArchive;

/// A resolved input source for layout XML and images.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A ZIP archive of project subtrees.
    Archive(PathBuf),
    /// A plain directory mirroring the same structure.
    Folder(PathBuf),
}

impl DataSource {
    /// Resolve a path to a source: directories become [`DataSource::Folder`],
    /// files are assumed to be ZIP archives.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let path = path.into();
        if path.is_dir() {
            Ok(DataSource::Folder(path))
        } else if path.is_file() {
            Ok(DataSource::Archive(path))
        } else {
            Err(ExportError::SourceNotFound { path })
        }
    }

    /// List every file in the source as a `/`-separated relative path.
    pub fn list_files(&self) -> Result<Vec<String>, ExportError> {
        match self {
            DataSource::Archive(path) => {
                let archive = self.open_archive(path)?;
                Ok(archive.file_names().map(str::to_owned).collect())
            }
            DataSource::Folder(root) => {
                let mut files = Vec::new();
                collect_files(root, root, &mut files)?;
                Ok(files)
            }
        }
    }

    /// Read one file's raw bytes by its relative path.
    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>, ExportError> {
        match self {
            DataSource::Archive(path) => {
                let mut archive = self.open_archive(path)?;
                let mut entry = archive
                    .by_name(name)
                    .map_err(|source| ExportError::ArchiveRead {
                        path: path.clone(),
                        source,
                    })?;
                let mut contents = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut contents)
                    .map_err(|source| ExportError::Io {
                        path: path.join(name),
                        source,
                    })?;
                Ok(contents)
            }
            DataSource::Folder(root) => {
                let path = root.join(name);
                std::fs::read(&path).map_err(|source| ExportError::Io { path, source })
            }
        }
    }

    /// Locate a page's image and return `(source label, raw bytes)`.
    ///
    /// Candidate paths are tried in order — project root, the project's
    /// `images` subdirectory, the bare filename, and (archives only) any
    /// entry ending with the filename. When nothing local matches and the
    /// page declares a remote URL, that is fetched with `timeout` as a last
    /// resort. `None` means "no image found" and is a skip, never an error.
    pub fn find_image_bytes(&self, page: &Page, timeout: Duration) -> Option<(String, Vec<u8>)> {
        if !page.image_filename.is_empty() {
            let candidates = [
                format!("{}/{}", page.project_name, page.image_filename),
                format!("{}/images/{}", page.project_name, page.image_filename),
                page.image_filename.clone(),
            ];

            match self {
                DataSource::Archive(_) => {
                    if let Ok(names) = self.list_files() {
                        for candidate in &candidates {
                            if names.iter().any(|n| n == candidate) {
                                if let Ok(bytes) = self.read_bytes(candidate) {
                                    return Some((candidate.clone(), bytes));
                                }
                            }
                        }
                        // Fall back to a suffix match anywhere in the archive.
                        if let Some(name) = names
                            .iter()
                            .find(|n| n.ends_with(&page.image_filename))
                            .cloned()
                        {
                            if let Ok(bytes) = self.read_bytes(&name) {
                                return Some((name, bytes));
                            }
                        }
                    }
                }
                DataSource::Folder(root) => {
                    for candidate in &candidates {
                        let full = root.join(candidate);
                        if full.is_file() {
                            if let Ok(bytes) = std::fs::read(&full) {
                                return Some((candidate.clone(), bytes));
                            }
                        }
                    }
                }
            }
        }

        if let Some(url) = page.image_url.as_deref() {
            debug!(
                "no local image for {}, trying remote {url}",
                page.image_filename
            );
            return fetch_remote(url, timeout).map(|bytes| (url.to_owned(), bytes));
        }

        None
    }

    fn open_archive(&self, path: &Path) -> Result<ZipArchive<BufReader<File>>, ExportError> {
        let file = File::open(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ZipArchive::new(BufReader::new(file)).map_err(|source| ExportError::ArchiveRead {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Recursively collect relative `/`-separated file paths under `dir`.
fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<(), ExportError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(rel);
        }
    }

    Ok(())
}
