//! BUFR surface bulletins are passed on whole, base64 encoded together
//! with their start line and header so the receiver can rebuild the
//! bulletin.

use base64::{engine::general_purpose, Engine as _};
use wmo_common::{ReportKey, ReportType};

use crate::error::{DecodeError, Result};
use crate::reports::DecodedReports;

const SIGNATURE: &[u8] = b"BUFR";

/// Grouping label for BUFR payloads.
pub const BUFR_LABEL: &str = "bufr_surface";

/// Transport tag telling the receiver how the payload is encoded.
pub const BUFR_ENCODING: &str = "encoding=base64";

pub(crate) fn split(
    zczc_line: &str,
    header: &str,
    payload: &[u8],
    out: &mut DecodedReports,
) -> Result<()> {
    if !payload.starts_with(SIGNATURE) {
        let head = &payload[..payload.len().min(SIGNATURE.len())];
        return Err(DecodeError::MissingBufrSignature(
            String::from_utf8_lossy(head).into_owned(),
        ));
    }

    let mut message = Vec::with_capacity(zczc_line.len() + header.len() + payload.len() + 2);
    message.extend_from_slice(zczc_line.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(header.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(payload);

    out.push(
        ReportType::BufrSurface,
        ReportKey::tagged(BUFR_LABEL, BUFR_ENCODING),
        general_purpose::STANDARD.encode(&message),
    );
    Ok(())
}
