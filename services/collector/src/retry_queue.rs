//! On-disk queue of reports awaiting a resend.
//!
//! Each entry is one file named `kvdata_<decoder>_<timestamp>[_<n>]`
//! holding the decoder key on the first line and the payload after it.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use wmo_common::now_timestamp;

use crate::error::{DeliveryError, Result};
use crate::spool::{write_unique, PARTIAL_SUFFIX};

/// File name prefix of queued entries.
pub const QUEUE_PREFIX: &str = "kvdata_";

/// A report saved for a later send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    pub decoder_key: String,
    pub payload: String,
}

impl PendingDelivery {
    pub fn new(decoder_key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            decoder_key: decoder_key.into(),
            payload: payload.into(),
        }
    }

    /// Parse queue file content. Content without a line break or with an
    /// empty decoder key is malformed.
    pub fn parse(content: &str) -> Option<Self> {
        let (key, payload) = content.split_once('\n')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, payload))
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", self.decoder_key, self.payload)
    }

    /// Queue file base name for this entry at `timestamp`.
    pub fn file_base(&self, timestamp: &str) -> String {
        format!(
            "{}{}_{}",
            QUEUE_PREFIX,
            self.decoder_key.replace(['/', '\\'], "-"),
            timestamp
        )
    }
}

/// Result of reading one queue file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEntry {
    Valid(PendingDelivery),
    Malformed,
}

/// The retry queue directory.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    dir: PathBuf,
}

impl RetryQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an entry under a fresh name.
    pub async fn persist(&self, entry: &PendingDelivery) -> Result<PathBuf> {
        let base = entry.file_base(&now_timestamp());
        let path = write_unique(&self.dir, &base, entry.render().as_bytes())
            .await
            .map_err(|source| DeliveryError::QueueIo {
                path: self.dir.join(&base),
                source,
            })?
            .ok_or_else(|| DeliveryError::NameExhausted(base.clone()))?;

        info!(path = %path.display(), decoder = %entry.decoder_key, "Saved report for resend");
        Ok(path)
    }

    /// Queue files in the order they were written.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let io_err = |source| DeliveryError::QueueIo {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(QUEUE_PREFIX) || name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => files.push(entry.path()),
                _ => continue,
            }
        }

        files.sort_by_cached_key(|path| arrival_order(path));
        Ok(files)
    }

    pub async fn read(&self, path: &Path) -> Result<QueueEntry> {
        let content = fs::read(path)
            .await
            .map_err(|source| DeliveryError::QueueIo {
                path: path.to_path_buf(),
                source,
            })?;
        let content = String::from_utf8_lossy(&content);

        Ok(match PendingDelivery::parse(&content) {
            Some(entry) => QueueEntry::Valid(entry),
            None => QueueEntry::Malformed,
        })
    }

    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed queue file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DeliveryError::QueueIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}

/// Sort key putting queue files in the order they were written:
/// timestamp, then collision suffix, whatever the decoder key.
fn arrival_order(path: &Path) -> (String, u32, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts = name.rsplitn(3, '_');
    let last = parts.next().unwrap_or_default();
    let before = parts.next().unwrap_or_default();

    let (timestamp, suffix) = if is_timestamp(last) {
        (last.to_string(), 0)
    } else {
        match last.parse::<u32>() {
            Ok(n) if is_timestamp(before) => (before.to_string(), n),
            _ => (String::new(), 0),
        }
    };

    (timestamp, suffix, name)
}

/// `YYYYMMDDTHHMMSS`
fn is_timestamp(s: &str) -> bool {
    s.len() == 15
        && s.char_indices()
            .all(|(i, c)| if i == 8 { c == 'T' } else { c.is_ascii_digit() })
}
