//! Change detection for bulletin files.
//!
//! Tracks which files in a polled directory hold data that has not been
//! forwarded yet. Files are written by an external, non-atomic writer, so
//! content is only read once it has been stable for two polls and only
//! the part not seen before is handed on.
//!
//! # Architecture
//!
//! - [`scanner`] lists matching regular files
//! - [`detector`] owns the per-file state table and the snapshot protocol
//! - [`state_file`] persists the table across restarts

pub mod checksum;
pub mod detector;
pub mod error;
pub mod file_state;
pub mod scanner;
pub mod state_file;

// Re-exports
pub use checksum::crc_ccitt;
pub use detector::{ChangeDetector, NewData};
pub use error::{IngestionError, Result};
pub use file_state::{ContentChange, FileState};
pub use scanner::{compile_pattern, scan_directory, ScannedFile};
pub use state_file::{load_states, save_states};
