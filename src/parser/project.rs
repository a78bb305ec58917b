//! Grouping candidate files into logical projects.
//!
//! A "project" is a document collection inferred purely from directory
//! structure. Transkribus exports place layout XML under
//! `<collection>/page/<file>.xml`, so the parent of a directory literally
//! named `page` is the strongest signal; flatter layouts fall back to the
//! second-to-last path segment.

use std::collections::BTreeMap;

/// Platform metadata files excluded from candidate layout files.
const METADATA_BASENAMES: &[&str] = &["mets.xml", "metadata.xml"];

/// Is this a platform metadata file (`mets.xml`, `metadata.xml`)?
///
/// Matched case-insensitively on the basename.
pub fn is_metadata_file(path: &str) -> bool {
    let base = basename(path).to_ascii_lowercase();
    METADATA_BASENAMES.contains(&base.as_str())
}

/// Is this an OS-generated hidden or resource-fork file?
///
/// Covers macOS `__MACOSX` payload directories, `._`-prefixed resource
/// forks, and dot-hidden files.
pub fn is_os_artifact(path: &str) -> bool {
    if path.split('/').any(|part| part == "__MACOSX") {
        return true;
    }
    let base = basename(path);
    base.starts_with("._") || (base.starts_with('.') && base != "." && base != "..")
}

/// The logical project a file belongs to.
///
/// Resolution order:
/// 1. parent of an ancestor directory literally named `page`;
/// 2. the second-to-last path segment;
/// 3. the first (only) segment.
pub fn logical_project_name(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

    if let Some(idx) = parts.iter().position(|&p| p == "page") {
        if idx > 0 {
            return parts[idx - 1].to_owned();
        }
    }
    if parts.len() >= 2 {
        return parts[parts.len() - 2].to_owned();
    }
    parts.first().copied().unwrap_or_default().to_owned()
}

/// Group candidate layout files by project.
///
/// Keeps only `.xml` files that are neither platform metadata nor OS
/// artifacts. The map is ordered by project name so batch runs are
/// deterministic; within a project, input order is preserved.
pub fn group_by_project<S: AsRef<str>>(paths: &[S]) -> BTreeMap<String, Vec<String>> {
    let mut projects: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for path in paths {
        let path = path.as_ref();
        if !path.to_ascii_lowercase().ends_with(".xml")
            || is_metadata_file(path)
            || is_os_artifact(path)
        {
            continue;
        }
        projects
            .entry(logical_project_name(path))
            .or_default()
            .push(path.to_owned());
    }

    projects
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
