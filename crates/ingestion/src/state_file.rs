//! Persisted file tracking state, one `path:length:checksum` line per file.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::file_state::FileState;

/// Serialise tracked states into the state file format.
pub fn render_states<'a>(states: impl IntoIterator<Item = &'a FileState>) -> String {
    let mut out = String::new();
    for state in states {
        out.push_str(&format!(
            "{}:{}:{}\n",
            state.path.display(),
            state.length,
            state.checksum
        ));
    }
    out
}

/// Parse one state line. The path may itself contain `:`, so the line is
/// split on its last two separators.
pub fn parse_state_line(line: &str) -> Option<(PathBuf, u64, u16)> {
    let mut parts = line.trim_end().rsplitn(3, ':');
    let checksum = parts.next()?.trim().parse::<u16>().ok()?;
    let length = parts.next()?.trim().parse::<u64>().ok()?;
    let path = parts.next()?.trim();
    if path.is_empty() {
        return None;
    }
    Some((PathBuf::from(path), length, checksum))
}

/// Load tracked states, skipping malformed lines and files that are gone.
///
/// A missing state file yields an empty list.
pub async fn load_states(state_path: &Path) -> Result<Vec<FileState>> {
    let content = match fs::read_to_string(state_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %state_path.display(), "No state file, starting fresh");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut states = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let Some((path, length, checksum)) = parse_state_line(line) else {
            warn!(line = %line, "Malformed state line, skipping");
            continue;
        };

        match fs::metadata(&path).await {
            Ok(meta) => {
                let mut state = FileState::restored(path, length, checksum);
                state.mtime = meta.modified().ok();
                states.push(state);
            }
            Err(_) => {
                debug!(path = %path.display(), "Tracked file no longer exists");
            }
        }
    }

    info!(path = %state_path.display(), count = states.len(), "Loaded file state");
    Ok(states)
}

/// Write tracked states atomically (temp file, then rename).
pub async fn save_states<'a>(
    state_path: &Path,
    states: impl IntoIterator<Item = &'a FileState>,
) -> Result<()> {
    let content = render_states(states);
    let temp_path = state_path.with_extension("partial");

    let write_err = |source| IngestionError::StateWrite {
        path: state_path.to_path_buf(),
        source,
    };

    fs::write(&temp_path, content.as_bytes())
        .await
        .map_err(write_err)?;
    fs::rename(&temp_path, state_path)
        .await
        .map_err(write_err)?;

    debug!(path = %state_path.display(), "Saved file state");
    Ok(())
}
