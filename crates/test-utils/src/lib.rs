//! Shared test utilities for the WMO collector workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Bulletin fixtures (framed SYNOP, METAR and BUFR samples)
//! - Temporary workspace directories with controllable mtimes
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, TestWorkspace};
//! ```

pub mod fixtures;
pub mod workspace;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use workspace::*;

/// Concatenate several framed bulletins into one raw input buffer.
///
/// # Usage
///
/// ```ignore
/// use test_utils::{bulletin_stream, wrap_bulletin};
///
/// let raw = bulletin_stream![
///     wrap_bulletin(1, "SMNO01 ENMI 010600\nAAXX 01061\n01001 NIL="),
///     wrap_bulletin(2, "SANO31 ENMI 010620\nMETAR ENGM 010620Z 00000KT="),
/// ];
/// ```
#[macro_export]
macro_rules! bulletin_stream {
    ($($bulletin:expr),* $(,)?) => {{
        let mut raw: Vec<u8> = Vec::new();
        $(
            raw.extend_from_slice(AsRef::<[u8]>::as_ref(&$bulletin));
        )*
        raw
    }};
}
