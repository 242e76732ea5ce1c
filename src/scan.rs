//! Candidate file enumeration.

use crate::error::ReportError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions considered for classification, compared case-insensitively.
pub const BINARY_EXTENSIONS: &[&str] = &["exe", "dll"];

/// True when the path ends in one of [`BINARY_EXTENSIONS`].
pub fn is_candidate(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.iter().any(|b| ext.eq_ignore_ascii_case(b)))
}

/// List `.exe` and `.dll` files under `root`, sorted by path.
///
/// With `recursive` unset only the top directory is read.
pub fn list_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, ReportError> {
    let walker = WalkDir::new(root).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| ReportError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_candidate(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "listed candidate files");
    Ok(files)
}
