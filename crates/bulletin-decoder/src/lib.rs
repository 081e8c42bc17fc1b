//! WMO GTS bulletin decoder.
//!
//! Extracts `ZCZC ... NNNN` framed bulletins from noisy input, classifies
//! them by their abbreviated heading and splits them into per-station
//! reports. Binary BUFR payloads are passed on base64 encoded.
//!
//! Decoding never fails as a whole: problems with single bulletins are
//! collected in [`DecodedReports::errors`] and the next bulletin is
//! processed.

mod bufr;
pub mod decoder;
pub mod error;
pub mod framing;
pub mod header;
mod metar;
pub mod reader;
pub mod reports;
mod synop;

pub use bufr::{BUFR_ENCODING, BUFR_LABEL};
pub use decoder::{split, BulletinDecoder};
pub use error::{DecodeError, Result};
pub use framing::{Bulletin, Framer};
pub use header::classify;
pub use reports::{DecodedReports, ReportGroups};
