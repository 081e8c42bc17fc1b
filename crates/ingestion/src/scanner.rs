//! Directory listing filtered by a glob pattern.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::Pattern;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{IngestionError, Result};

/// A regular file found in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub len: u64,
    pub mtime: Option<SystemTime>,
}

/// Compile a file name pattern such as `*.txt`.
pub fn compile_pattern(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| IngestionError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// List regular files in `dir` whose file name matches `pattern`.
///
/// Files whose metadata cannot be read are skipped. With `ignore_before`
/// set, files last modified before that instant are left out.
pub async fn scan_directory(
    dir: &Path,
    pattern: &Pattern,
    ignore_before: Option<SystemTime>,
) -> Result<Vec<ScannedFile>> {
    let list_err = |source| IngestionError::DirectoryList {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(list_err)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !pattern.matches(&name) {
            continue;
        }

        let path = entry.path();
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat file, skipping");
                continue;
            }
        };

        if !meta.is_file() {
            continue;
        }

        let mtime = meta.modified().ok();
        if let (Some(cutoff), Some(modified)) = (ignore_before, mtime) {
            if modified < cutoff {
                debug!(path = %path.display(), "File predates startup, ignoring");
                continue;
            }
        }

        files.push(ScannedFile {
            path,
            len: meta.len(),
            mtime,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
