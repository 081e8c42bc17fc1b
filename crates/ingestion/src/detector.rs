//! Incremental change detection for files written by a non-atomic writer.
//!
//! A file is only read once its modification time has been stable for
//! two consecutive polls. It is then copied to a private snapshot; if the
//! original changes during the copy the snapshot is thrown away and the
//! protocol starts over. Collecting a snapshot diffs it against the
//! tracked length/checksum so only content not forwarded before is
//! handed on.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use glob::Pattern;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use wmo_common::now_timestamp;

use crate::error::{IngestionError, Result};
use crate::file_state::{file_name_of, ContentChange, FileState};
use crate::scanner::{scan_directory, ScannedFile};

/// Content of a watched file that has not been forwarded yet.
#[derive(Debug, Clone)]
pub struct NewData {
    pub path: PathBuf,
    pub change: ContentChange,
    pub bytes: Bytes,
}

impl NewData {
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// Owner of the FileState table.
pub struct ChangeDetector {
    files: BTreeMap<PathBuf, FileState>,
    snapshot_dir: PathBuf,
    keep_snapshots: bool,
}

impl ChangeDetector {
    /// Create a detector placing snapshots in `snapshot_dir`.
    ///
    /// With `keep_snapshots` collected snapshots are left on disk.
    pub fn new(snapshot_dir: impl Into<PathBuf>, keep_snapshots: bool) -> Self {
        Self {
            files: BTreeMap::new(),
            snapshot_dir: snapshot_dir.into(),
            keep_snapshots,
        }
    }

    /// Seed the table with states restored from the state file.
    pub fn restore(&mut self, states: impl IntoIterator<Item = FileState>) {
        for state in states {
            self.files.insert(state.path.clone(), state);
        }
    }

    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.files.get(path)
    }

    pub fn states(&self) -> impl Iterator<Item = &FileState> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths holding a snapshot that is ready to be collected.
    pub fn pending(&self) -> Vec<PathBuf> {
        self.files
            .values()
            .filter(|s| s.to_be_collected())
            .map(|s| s.path.clone())
            .collect()
    }

    /// Run one poll over `dir`. Returns true when any file has a snapshot
    /// ready to be collected.
    ///
    /// A failure to list the directory is returned and leaves the table
    /// untouched.
    #[instrument(skip(self, dir, pattern, cancel), fields(dir = %dir.display()))]
    pub async fn scan(
        &mut self,
        dir: &Path,
        pattern: &Pattern,
        ignore_before: Option<SystemTime>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let live = scan_directory(dir, pattern, ignore_before).await?;
        self.apply_listing(&live, cancel).await
    }

    /// Update the table from a directory listing.
    pub async fn apply_listing(
        &mut self,
        live: &[ScannedFile],
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let live_paths: BTreeSet<&PathBuf> = live.iter().map(|f| &f.path).collect();

        let gone: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| !live_paths.contains(p))
            .cloned()
            .collect();
        for path in gone {
            debug!(path = %path.display(), "File left the directory, forgetting it");
            if let Some(state) = self.files.remove(&path) {
                self.discard_snapshot(&state).await;
            }
        }

        let mut has_new_data = false;

        for file in live {
            if cancel.is_cancelled() {
                return Err(IngestionError::Cancelled);
            }

            let Some(state) = self.files.get_mut(&file.path) else {
                debug!(path = %file.path.display(), "New file");
                self.files
                    .insert(file.path.clone(), FileState::new(&file.path, file.mtime));
                continue;
            };

            if state.mtime != file.mtime {
                debug!(path = %file.path.display(), "New mtime");
                state.mtime = file.mtime;
                state.reset();
                let stale = state.snapshot.take();
                if let Some(stale) = stale {
                    self.remove_snapshot_file(&stale).await;
                }
            } else if state.seen {
                if !state.collected && state.snapshot.is_none() {
                    debug!(path = %file.path.display(), "mtime stable over two polls");
                    self.take_snapshot(&file.path).await;
                }
            } else {
                state.seen = true;
            }

            if let Some(state) = self.files.get(&file.path) {
                if state.to_be_collected() {
                    info!(
                        path = %state.path.display(),
                        snapshot = ?state.snapshot.as_ref().map(|p| p.display().to_string()),
                        "New data in file"
                    );
                    has_new_data = true;
                }
            }
        }

        Ok(has_new_data)
    }

    /// Copy a stable file to a snapshot and confirm it did not change
    /// while copying.
    async fn take_snapshot(&mut self, path: &Path) {
        let Some(state) = self.files.get(path) else {
            return;
        };
        let old_mtime = state.mtime;
        let target = self
            .snapshot_dir
            .join(format!("{}_{}", state.file_name(), now_timestamp()));

        if let Err(e) = fs::copy(path, &target).await {
            warn!(
                path = %path.display(),
                target = %target.display(),
                error = %e,
                "Cannot copy file, dropping it from the table"
            );
            self.files.remove(path);
            return;
        }

        let current_mtime = match fs::metadata(path).await {
            Ok(meta) => meta.modified().ok(),
            Err(_) => {
                info!(path = %path.display(), "File vanished during copy");
                let _ = fs::remove_file(&target).await;
                self.files.remove(path);
                return;
            }
        };

        if current_mtime != old_mtime {
            debug!(path = %path.display(), "File changed during copy, discarding snapshot");
            let _ = fs::remove_file(&target).await;
            if let Some(state) = self.files.get_mut(path) {
                state.mtime = current_mtime;
                state.reset();
            }
            return;
        }

        if let Some(state) = self.files.get_mut(path) {
            state.snapshot = Some(target);
            state.collected = false;
        }
    }

    /// Read a ready snapshot and return the part not forwarded before.
    ///
    /// Returns `None` when the path is not pending, when the snapshot could
    /// not be read (the entry is reset), or when nothing new was found.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn collect(&mut self, path: &Path) -> Option<NewData> {
        let keep = self.keep_snapshots;
        let state = self.files.get_mut(path)?;
        if !state.to_be_collected() {
            return None;
        }
        let snapshot = state.snapshot.take()?;

        let content = match fs::read(&snapshot).await {
            Ok(content) => content,
            Err(e) => {
                error!(snapshot = %snapshot.display(), error = %e, "Cannot read snapshot");
                if !keep {
                    let _ = fs::remove_file(&snapshot).await;
                }
                state.reset();
                return None;
            }
        };

        if !keep {
            if let Err(e) = fs::remove_file(&snapshot).await {
                warn!(snapshot = %snapshot.display(), error = %e, "Cannot remove snapshot");
            }
        }

        let (change, new_part) = state.diff(&content);
        state.collected = true;

        debug!(change = ?change, new_bytes = new_part.len(), "Collected snapshot");

        if new_part.is_empty() {
            return None;
        }

        Some(NewData {
            path: path.to_path_buf(),
            change,
            bytes: Bytes::copy_from_slice(new_part),
        })
    }

    /// Collect every pending file, stopping early on cancellation.
    pub async fn collect_all(&mut self, cancel: &CancellationToken) -> Vec<NewData> {
        let mut out = Vec::new();
        for path in self.pending() {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(data) = self.collect(&path).await {
                out.push(data);
            }
        }
        out
    }

    async fn discard_snapshot(&self, state: &FileState) {
        if let Some(snapshot) = &state.snapshot {
            self.remove_snapshot_file(snapshot).await;
        }
    }

    async fn remove_snapshot_file(&self, snapshot: &Path) {
        if self.keep_snapshots {
            return;
        }
        if let Err(e) = fs::remove_file(snapshot).await {
            debug!(snapshot = %snapshot.display(), error = %e, "Cannot remove snapshot");
        }
    }
}
