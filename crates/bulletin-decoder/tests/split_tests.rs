//! End-to-end splitting tests over framed bulletin streams.

use std::collections::BTreeSet;

use base64::{engine::general_purpose, Engine as _};
use bulletin_decoder::{split, BulletinDecoder, BUFR_ENCODING, BUFR_LABEL};
use test_utils::{
    bulletin_stream, wrap_binary_bulletin, wrap_bulletin, BUFR_BROKEN_PAYLOAD, BUFR_HEADER,
    BUFR_PAYLOAD, METAR_TWO_AIRPORTS, SYNOP_MOBILE, SYNOP_TWO_STATIONS, SYNOP_WITH_NIL,
    TEMP_SAMPLE,
};
use wmo_common::{ReportKey, ReportType};

fn wanted(types: &[ReportType]) -> BTreeSet<ReportType> {
    types.iter().copied().collect()
}

// ============================================================================
// Framing and classification
// ============================================================================

#[test]
fn test_noise_and_nil_yield_nothing() {
    let raw = b"noise\nZCZC 001\r\nSIXX99 ENMI 010000\nAAXX 01001 01001 NIL=\nNNNN\r\r\n";
    let out = split(raw, &wanted(&[ReportType::Synop]));

    assert_eq!(out.report_count(), 0);
    assert_eq!(out.errors, "");
    assert_eq!(out.unmatched.trim(), "noise");
    assert_eq!(out.bulletins, 1);
}

#[test]
fn test_mixed_stream_keeps_only_wanted_types() {
    let raw = bulletin_stream![
        wrap_bulletin(1, SYNOP_TWO_STATIONS),
        wrap_bulletin(2, METAR_TWO_AIRPORTS),
    ];

    let out = split(&raw, &wanted(&[ReportType::Metar]));
    assert!(out.groups(ReportType::Synop).is_none());
    assert_eq!(out.report_count(), 2);
    assert_eq!(out.bulletins, 2);
}

#[test]
fn test_empty_wanted_set_keeps_all_types() {
    let raw = bulletin_stream![
        wrap_bulletin(1, SYNOP_TWO_STATIONS),
        wrap_bulletin(2, METAR_TWO_AIRPORTS),
    ];

    let out = BulletinDecoder::default().split(&raw);
    assert_eq!(out.groups(ReportType::Synop).map(|g| g.len()), Some(1));
    assert_eq!(out.groups(ReportType::Metar).map(|g| g.len()), Some(1));
    assert_eq!(out.report_count(), 4);
}

#[test]
fn test_unknown_header_ignored_silently() {
    let raw = wrap_bulletin(7, "FTNO01 ENMI 010000\nTAF ENGM 0106/0206 VRB03KT=");
    let out = split(&raw, &BTreeSet::new());
    assert!(out.is_empty());
    assert!(!out.has_errors());
}

#[test]
fn test_decoding_is_stateless() {
    let decoder = BulletinDecoder::new(wanted(&[ReportType::Temp]));
    let raw = wrap_bulletin(1, TEMP_SAMPLE);

    let first = decoder.split(&raw);
    let second = decoder.split(&raw);
    assert_eq!(first.errors, "TEMP: not implemented: USNO01 ENMI 010000\n");
    assert_eq!(first, second);
}

// ============================================================================
// SYNOP
// ============================================================================

#[test]
fn test_synop_round_trip_per_station() {
    let raw = wrap_bulletin(42, SYNOP_TWO_STATIONS);
    let out = split(&raw, &wanted(&[ReportType::Synop]));

    let groups = out.groups(ReportType::Synop).unwrap();
    let bodies = &groups[&ReportKey::prefixed("AAXX 01061")];
    assert_eq!(
        bodies,
        &vec![
            "01001 11570 72810 10021 20011 39904 49992 52010=".to_string(),
            "01003 11460 82511 10015 20003 39860 49960 52005=".to_string(),
        ]
    );

    // Label plus bodies reproduce the station text modulo whitespace.
    let rebuilt = format!("AAXX 01061\n{}", bodies.join("\n"));
    let original: String = SYNOP_TWO_STATIONS.splitn(2, '\n').nth(1).unwrap().into();
    assert_eq!(rebuilt, original);
}

#[test]
fn test_synop_nil_and_mobile() {
    let raw = bulletin_stream![
        wrap_bulletin(1, SYNOP_WITH_NIL),
        wrap_bulletin(2, SYNOP_MOBILE),
    ];
    let out = split(&raw, &wanted(&[ReportType::Synop]));

    assert_eq!(out.report_count(), 2);
    let bodies: Vec<_> = out.iter().map(|(_, _, b)| b.to_string()).collect();
    assert_eq!(bodies, vec!["01001 11570 72810 10021=", "01003 11460 82511 10015="]);
}

// ============================================================================
// BUFR
// ============================================================================

#[test]
fn test_bufr_encoded_losslessly() {
    let raw = wrap_binary_bulletin(5, BUFR_HEADER, BUFR_PAYLOAD);
    let out = split(&raw, &wanted(&[ReportType::BufrSurface]));

    let groups = out.groups(ReportType::BufrSurface).unwrap();
    let key = ReportKey::tagged(BUFR_LABEL, BUFR_ENCODING);
    assert!(!key.prepend_label);

    let decoded = general_purpose::STANDARD.decode(&groups[&key][0]).unwrap();
    let mut expected = b"ZCZC 005\nISMD01 ENMI 010600\n".to_vec();
    expected.extend_from_slice(BUFR_PAYLOAD);
    assert_eq!(decoded, expected);
}

#[test]
fn test_bufr_without_signature_does_not_affect_others() {
    let raw = bulletin_stream![
        wrap_binary_bulletin(1, BUFR_HEADER, BUFR_BROKEN_PAYLOAD),
        wrap_binary_bulletin(2, BUFR_HEADER, BUFR_PAYLOAD),
        wrap_bulletin(3, SYNOP_TWO_STATIONS),
    ];
    let out = split(&raw, &BTreeSet::new());

    assert!(out.errors.starts_with("ERROR: can't split bulletin segment[\nISMD01 ENMI 010600"));
    assert!(out.errors.ends_with("]\n"));
    assert_eq!(
        out.groups(ReportType::BufrSurface).map(|g| g.values().map(Vec::len).sum::<usize>()),
        Some(1)
    );
    assert_eq!(out.groups(ReportType::Synop).map(|g| g.len()), Some(1));
}
