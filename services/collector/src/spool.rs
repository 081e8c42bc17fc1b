//! Writing uniquely named files into spool directories.

use std::path::{Path, PathBuf};

use tokio::fs;

/// Highest suffix probed before giving up.
pub const MAX_SUFFIX: u32 = 9999;

/// Suffix marking a file still being written.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Write `content` to `dir/base`, or `dir/base_<n>` for the first free
/// `n` in `1..=MAX_SUFFIX`. The content is written to a `.partial` file
/// and renamed into place.
///
/// Returns `Ok(None)` when every candidate name is taken.
pub async fn write_unique(
    dir: &Path,
    base: &str,
    content: &[u8],
) -> std::io::Result<Option<PathBuf>> {
    let Some(target) = free_name(dir, base).await? else {
        return Ok(None);
    };

    let partial = dir.join(format!(
        "{}{}",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        PARTIAL_SUFFIX
    ));

    fs::write(&partial, content).await?;
    if let Err(e) = fs::rename(&partial, &target).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    Ok(Some(target))
}

async fn free_name(dir: &Path, base: &str) -> std::io::Result<Option<PathBuf>> {
    let first = dir.join(base);
    if !fs::try_exists(&first).await? {
        return Ok(Some(first));
    }

    for n in 1..=MAX_SUFFIX {
        let candidate = dir.join(format!("{}_{}", base, n));
        if !fs::try_exists(&candidate).await? {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
