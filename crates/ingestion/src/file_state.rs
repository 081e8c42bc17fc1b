//! Per-file tracking metadata.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::checksum::crc_ccitt;

/// Classification of a snapshot against what was forwarded before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChange {
    /// Nothing was tracked before.
    FirstSighting,
    /// The tracked prefix is intact, only the tail is new.
    Appended,
    /// Same or longer content whose prefix no longer matches.
    Overwritten,
    /// Shorter than what was tracked.
    Truncated,
}

/// Tracked state of one watched file.
///
/// `length` and `checksum` describe the content already forwarded. Once
/// `collected` is set they reflect the snapshot, which may lag behind the
/// live file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub path: PathBuf,
    pub length: u64,
    pub checksum: u16,
    pub mtime: Option<SystemTime>,
    pub seen: bool,
    pub collected: bool,
    pub snapshot: Option<PathBuf>,
}

impl FileState {
    /// State for a file seen for the first time.
    pub fn new(path: impl Into<PathBuf>, mtime: Option<SystemTime>) -> Self {
        Self {
            path: path.into(),
            length: 0,
            checksum: 0,
            mtime,
            seen: false,
            collected: false,
            snapshot: None,
        }
    }

    /// State restored from the persisted state file.
    pub fn restored(path: impl Into<PathBuf>, length: u64, checksum: u16) -> Self {
        Self {
            length,
            checksum,
            ..Self::new(path, None)
        }
    }

    /// A snapshot is held whose content has not been diffed yet.
    pub fn to_be_collected(&self) -> bool {
        !self.collected && self.snapshot.is_some()
    }

    /// File name without directory, used for snapshot and spool names.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    /// Forget the stabilisation progress so the protocol starts over.
    pub fn reset(&mut self) {
        self.seen = false;
        self.collected = false;
    }

    /// Compute the part of `content` not yet forwarded and take `content`
    /// as the new reference.
    pub fn diff<'a>(&mut self, content: &'a [u8]) -> (ContentChange, &'a [u8]) {
        let tracked = self.length as usize;

        let (change, new_part) = if self.length == 0 {
            (ContentChange::FirstSighting, content)
        } else if tracked > content.len() {
            (ContentChange::Truncated, content)
        } else if crc_ccitt(&content[..tracked]) == self.checksum {
            (ContentChange::Appended, &content[tracked..])
        } else {
            (ContentChange::Overwritten, content)
        };

        self.length = content.len() as u64;
        self.checksum = crc_ccitt(content);

        (change, new_part)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
