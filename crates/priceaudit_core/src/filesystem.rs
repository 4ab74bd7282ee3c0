use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl DataFile {
    /// File name up to the first `.`, e.g. `7290027600007_001` for
    /// `7290027600007_001.csv`.
    pub fn stem(&self) -> &str {
        first_segment(&self.file_name, '.')
    }
}

/// Every regular file below `dir`, sorted by file name across all nested
/// directories (ties broken by path). A missing directory yields an empty list.
pub fn list_data_files(dir: &Path) -> Result<Vec<DataFile>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "data directory missing; nothing to scan");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(DataFile {
            file_name: entry.file_name().to_string_lossy().to_string(),
            path: entry.into_path(),
        });
    }
    files.sort_by(|left, right| {
        left.file_name
            .cmp(&right.file_name)
            .then_with(|| left.path.cmp(&right.path))
    });
    debug!(dir = %dir.display(), files = files.len(), "listed data files");
    Ok(files)
}

pub fn first_segment(value: &str, separator: char) -> &str {
    value.split(separator).next().unwrap_or(value)
}
