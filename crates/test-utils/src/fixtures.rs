//! Bulletin fixtures for decoder and pipeline tests.
//!
//! The samples follow the WMO framing used by GTS feeds: a `ZCZC nnn`
//! start line, a `TTAAii CCCC YYGGgg` header, the report text and an
//! `NNNN` end marker preceded by a CR/LF run.

/// Frame `body` (header line plus reports) as one bulletin.
pub fn wrap_bulletin(seq: u32, body: &str) -> Vec<u8> {
    format!("ZCZC {:03}\r\r\n{}\r\r\n\r\nNNNN\r\r\n", seq, body).into_bytes()
}

/// Frame a binary payload under a text header as one bulletin.
pub fn wrap_binary_bulletin(seq: u32, header: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = format!("ZCZC {:03}\r\r\n{}\r\r\n", seq, header).into_bytes();
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\r\n\r\nNNNN\r\r\n");
    out
}

/// SYNOP bulletin with two land stations.
pub const SYNOP_TWO_STATIONS: &str = "SMNO01 ENMI 010600\n\
AAXX 01061\n\
01001 11570 72810 10021 20011 39904 49992 52010=\n\
01003 11460 82511 10015 20003 39860 49960 52005=";

/// SYNOP bulletin with a NIL report between two regular ones.
pub const SYNOP_WITH_NIL: &str = "SMNO01 ENMI 010600\n\
AAXX 01061\n\
01001 11570 72810 10021=\n\
01002 NIL=\n\
01003 11460 82511 10015=";

/// SYNOP bulletin from a mobile land station, which is skipped.
pub const SYNOP_MOBILE: &str = "SMNO02 ENMI 010600\n\
OOXX 01061\n\
AMOB1 99601 70052 46/// /1910=";

/// METAR bulletin with two aerodromes.
pub const METAR_TWO_AIRPORTS: &str = "SANO31 ENMI 010620\n\
METAR ENGM 010620Z 01005KT 9999 FEW030 M02/M05 Q1012 NOSIG=\n\
METAR ENBR 010620Z 16010KT 9999 SCT015 04/02 Q1003=";

/// TEMP bulletin, recognised but not split.
pub const TEMP_SAMPLE: &str = "USNO01 ENMI 010000\n\
TTAA 51001 01001 99012 03456 27008=";

/// Header of a BUFR surface bulletin.
pub const BUFR_HEADER: &str = "ISMD01 ENMI 010600";

/// Minimal BUFR-like payload starting with the section 0 signature.
pub const BUFR_PAYLOAD: &[u8] = b"BUFR\x00\x00\x2a\x04\x00\x01\x02\x037777";

/// Binary payload lacking the `BUFR` signature.
pub const BUFR_BROKEN_PAYLOAD: &[u8] = b"XUFR\x00\x00\x2a\x04";
