//! Temporary directories laid out like a collector installation.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

/// Source, work and log directories under one temporary root.
///
/// The root is removed when the workspace is dropped.
pub struct TestWorkspace {
    root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        for sub in ["source", "work", "work/tmp", "log"] {
            std::fs::create_dir_all(root.path().join(sub)).expect("create workspace dir");
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.path().join("source")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.path().join("work/tmp")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.path().join("log")
    }

    /// Write a file into the source directory with a fixed mtime.
    pub fn write_source(&self, name: &str, content: &[u8], mtime_secs: i64) -> PathBuf {
        let path = self.source_dir().join(name);
        std::fs::write(&path, content).expect("write source file");
        set_mtime(&path, mtime_secs);
        path
    }

    /// Append to a source file and move its mtime.
    pub fn append_source(&self, name: &str, content: &[u8], mtime_secs: i64) -> PathBuf {
        use std::io::Write;

        let path = self.source_dir().join(name);
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .expect("open source file");
        file.write_all(content).expect("append source file");
        drop(file);
        set_mtime(&path, mtime_secs);
        path
    }

    /// File names in `dir` starting with `prefix`, sorted.
    pub fn files_with_prefix(&self, dir: &Path, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(prefix))
            .collect();
        names.sort();
        names
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Set a file's modification time to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).expect("set mtime");
}

/// `SystemTime` matching [`set_mtime`].
pub fn system_time(secs: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
}
