//! End-to-end tests of the collection loop over a temporary workspace.

mod common;

use std::sync::Arc;

use collector::{build_loop, CollectionLoop, CollectorConfig, CollectorMetrics, ResponseCode};
use common::ScriptedEndpoint;
use test_utils::{bulletin_stream, wrap_bulletin, TestWorkspace, SYNOP_TWO_STATIONS, TEMP_SAMPLE};
use tokio_util::sync::CancellationToken;

fn config_for(ws: &TestWorkspace, extra: &str) -> CollectorConfig {
    let yaml = format!(
        "source_dir: {}\nwork_dir: {}\nlog_dir: {}\nfile_pattern: \"*.txt\"\nendpoints: [\"http://localhost:8080/obs\"]\n{}",
        ws.source_dir().display(),
        ws.work_dir().display(),
        ws.log_dir().display(),
        extra
    );
    CollectorConfig::from_yaml_str(&yaml).unwrap()
}

async fn make_loop(
    ws: &TestWorkspace,
    extra: &str,
    test_mode: bool,
    endpoint: Arc<ScriptedEndpoint>,
) -> CollectionLoop {
    let config = config_for(ws, extra);
    config.prepare_directories().await.unwrap();
    build_loop(&config, test_mode, endpoint, Arc::new(CollectorMetrics::new()))
        .await
        .unwrap()
}

/// Three polls take a stable file from first sighting to collection.
async fn settle(collection: &mut CollectionLoop, cancel: &CancellationToken) -> usize {
    let mut files = 0;
    for _ in 0..3 {
        files += collection.collect_cycle(cancel).await.files;
    }
    files
}

// ============================================================================
// Forwarding
// ============================================================================

#[tokio::test]
async fn test_new_file_is_forwarded_once() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", &wrap_bulletin(1, SYNOP_TWO_STATIONS), 1_000);
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, endpoint.clone()).await;
    let cancel = CancellationToken::new();

    assert_eq!(settle(&mut collection, &cancel).await, 1);
    assert_eq!(endpoint.calls().len(), 2);

    // Nothing changes, nothing is sent again.
    settle(&mut collection, &cancel).await;
    assert_eq!(endpoint.calls().len(), 2);

    let state = std::fs::read_to_string(ws.work_dir().join("collector_finfo.dat")).unwrap();
    assert!(state.contains("synop.txt:"));
}

#[tokio::test]
async fn test_appended_bulletin_only_sends_new_reports() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", &wrap_bulletin(1, SYNOP_TWO_STATIONS), 1_000);
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, endpoint.clone()).await;
    let cancel = CancellationToken::new();

    settle(&mut collection, &cancel).await;
    ws.append_source(
        "synop.txt",
        &wrap_bulletin(2, "SMNO01 ENMI 010700\nAAXX 01071\n01001 11570 72810 10030="),
        1_060,
    );
    settle(&mut collection, &cancel).await;

    let calls = endpoint.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].1, "AAXX 01071 \n01001 11570 72810 10030=");
}

#[tokio::test]
async fn test_state_survives_restart() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", &wrap_bulletin(1, SYNOP_TWO_STATIONS), 1_000);
    let cancel = CancellationToken::new();

    let first = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, first.clone()).await;
    settle(&mut collection, &cancel).await;
    assert_eq!(first.calls().len(), 2);
    drop(collection);

    let second = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, second.clone()).await;
    settle(&mut collection, &cancel).await;
    assert!(second.calls().is_empty());
}

#[tokio::test]
async fn test_link_down_then_resend() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", &wrap_bulletin(1, SYNOP_TWO_STATIONS), 1_000);
    let endpoint = ScriptedEndpoint::scripted(vec![None], Some(ResponseCode::Ok));
    let mut collection = make_loop(&ws, "", false, endpoint.clone()).await;
    let cancel = CancellationToken::new();

    settle(&mut collection, &cancel).await;
    assert_eq!(endpoint.calls().len(), 1);
    assert_eq!(ws.files_with_prefix(&ws.work_dir(), "kvdata_").len(), 2);

    collection.resend_cycle(&cancel).await;
    assert_eq!(endpoint.calls().len(), 3);
    assert!(ws.files_with_prefix(&ws.work_dir(), "kvdata_").is_empty());
}

// ============================================================================
// Operator output
// ============================================================================

#[tokio::test]
async fn test_decode_errors_are_dumped() {
    let ws = TestWorkspace::new();
    ws.write_source("upper.txt", &wrap_bulletin(1, TEMP_SAMPLE), 1_000);
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "raports: [\"TEMP\"]\n", false, endpoint.clone()).await;

    settle(&mut collection, &CancellationToken::new()).await;

    let dumps = ws.files_with_prefix(&ws.log_dir().join("bulletins"), "datawarn_upper.txt_");
    assert_eq!(dumps.len(), 1);
    assert!(endpoint.calls().is_empty());
}

#[tokio::test]
async fn test_text_outside_bulletins_is_dumped_without_errors() {
    let ws = TestWorkspace::new();
    let raw = bulletin_stream![
        b"noise\n".to_vec(),
        wrap_bulletin(1, SYNOP_TWO_STATIONS),
    ];
    ws.write_source("synop.txt", &raw, 1_000);
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, endpoint.clone()).await;

    settle(&mut collection, &CancellationToken::new()).await;

    let bulletins = ws.log_dir().join("bulletins");
    let dumps = ws.files_with_prefix(&bulletins, "unmatched_synop.txt_");
    assert_eq!(dumps.len(), 1);
    let dump = std::fs::read_to_string(bulletins.join(&dumps[0])).unwrap();
    assert!(dump.contains("noise"));

    assert!(ws.files_with_prefix(&bulletins, "datawarn_").is_empty());
    assert_eq!(endpoint.calls().len(), 2);
}

#[tokio::test]
async fn test_test_mode_writes_files_instead_of_sending() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", &wrap_bulletin(1, SYNOP_TWO_STATIONS), 1_000);
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", true, endpoint.clone()).await;

    settle(&mut collection, &CancellationToken::new()).await;

    assert!(endpoint.calls().is_empty());
    let dumps = ws.files_with_prefix(&ws.work_dir(), "WMORaport_synop.txt_");
    assert_eq!(dumps.len(), 1);
    let dump = std::fs::read_to_string(ws.work_dir().join(&dumps[0])).unwrap();
    assert!(dump.contains("<<AAXX 01061>>"));
    assert_eq!(ws.files_with_prefix(&ws.work_dir(), "synop.txt_").len(), 1);
}

#[tokio::test]
async fn test_run_forever_stops_on_cancel() {
    let ws = TestWorkspace::new();
    let endpoint = ScriptedEndpoint::always(ResponseCode::Ok);
    let mut collection = make_loop(&ws, "", false, endpoint).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    collection.run_forever(cancel).await.unwrap();
    assert!(ws.work_dir().join("collector_finfo.dat").exists());
}
