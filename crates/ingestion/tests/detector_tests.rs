//! Integration tests for the change detector snapshot protocol.

use ingestion::{
    compile_pattern, crc_ccitt, load_states, save_states, ChangeDetector, ContentChange,
    FileState,
};
use test_utils::{set_mtime, TestWorkspace};
use tokio_util::sync::CancellationToken;

async fn poll(detector: &mut ChangeDetector, ws: &TestWorkspace) -> bool {
    let pattern = compile_pattern("*.txt").unwrap();
    detector
        .scan(&ws.source_dir(), &pattern, None, &CancellationToken::new())
        .await
        .unwrap()
}

// ============================================================================
// Stabilisation
// ============================================================================

#[tokio::test]
async fn test_stable_file_gets_exactly_one_snapshot() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"AAXX 01061\n01001 NIL=\n", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);

    // First sighting, then the mtime is confirmed, then it is copied.
    assert!(!poll(&mut detector, &ws).await);
    assert!(!poll(&mut detector, &ws).await);
    assert!(poll(&mut detector, &ws).await);

    assert_eq!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").len(), 1);
    assert_eq!(detector.pending().len(), 1);

    // Polling again without collecting does not copy a second time.
    assert!(poll(&mut detector, &ws).await);
    assert_eq!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").len(), 1);
}

#[tokio::test]
async fn test_mtime_change_before_stabilisation_blocks_forwarding() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"part one", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);

    assert!(!poll(&mut detector, &ws).await);
    assert!(!poll(&mut detector, &ws).await);

    ws.append_source("synop.txt", b" part two", 1_005);
    assert!(!poll(&mut detector, &ws).await);
    assert!(detector.pending().is_empty());
    assert!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").is_empty());

    let state = detector.get(&ws.source_dir().join("synop.txt")).unwrap();
    assert!(!state.seen);
    assert!(!state.collected);
}

#[tokio::test]
async fn test_mtime_change_discards_pending_snapshot() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"first", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    assert_eq!(detector.pending().len(), 1);

    ws.append_source("synop.txt", b" second", 1_010);
    assert!(!poll(&mut detector, &ws).await);
    assert!(detector.pending().is_empty());
    assert!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").is_empty());
}

#[tokio::test]
async fn test_failed_snapshot_copy_drops_entry() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"content", 1_000);
    let mut detector = ChangeDetector::new(ws.root().join("no-snapshot-dir"), false);

    assert!(!poll(&mut detector, &ws).await);
    assert!(!poll(&mut detector, &ws).await);
    assert!(detector.get(&path).unwrap().seen);

    // The copy fails, so the file is forgotten instead of held.
    assert!(!poll(&mut detector, &ws).await);
    assert!(detector.get(&path).is_none());
    assert!(detector.pending().is_empty());

    // The next poll picks it up again as a new file.
    assert!(!poll(&mut detector, &ws).await);
    let state = detector.get(&path).unwrap();
    assert!(!state.seen);
    assert!(!state.collected);
}

// ============================================================================
// Collection
// ============================================================================

#[tokio::test]
async fn test_collect_appended_part_only() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"AAAA", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    let first = detector.collect_all(&cancel).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].change, ContentChange::FirstSighting);
    assert_eq!(&first[0].bytes[..], b"AAAA");
    assert!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").is_empty());

    ws.append_source("synop.txt", b"BBBB", 1_020);
    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    let second = detector.collect_all(&cancel).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].change, ContentChange::Appended);
    assert_eq!(&second[0].bytes[..], b"BBBB");

    let state = detector.get(&path).unwrap();
    assert!(state.collected);
    assert_eq!(state.length, 8);
    assert_eq!(state.checksum, crc_ccitt(b"AAAABBBB"));
}

#[tokio::test]
async fn test_collect_rewritten_file_forwards_everything() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"old content", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    detector.collect_all(&cancel).await;

    ws.write_source("synop.txt", b"brand new content", 1_030);
    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    let data = detector.collect_all(&cancel).await;
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].change, ContentChange::Overwritten);
    assert_eq!(&data[0].bytes[..], b"brand new content");
}

#[tokio::test]
async fn test_touch_without_new_content_forwards_nothing() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"same", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    assert_eq!(detector.collect_all(&cancel).await.len(), 1);

    set_mtime(&path, 1_040);
    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    assert!(detector.collect_all(&cancel).await.is_empty());
    assert!(detector.get(&path).unwrap().collected);
}

#[tokio::test]
async fn test_debug_keeps_snapshots() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"content", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), true);

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    detector.collect_all(&CancellationToken::new()).await;
    assert_eq!(ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_").len(), 1);
}

#[tokio::test]
async fn test_unreadable_snapshot_resets_entry() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"content", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);

    for _ in 0..3 {
        poll(&mut detector, &ws).await;
    }
    for name in ws.files_with_prefix(&ws.tmp_dir(), "synop.txt_") {
        std::fs::remove_file(ws.tmp_dir().join(name)).unwrap();
    }

    assert!(detector.collect(&path).await.is_none());
    let state = detector.get(&path).unwrap();
    assert!(!state.seen);
    assert!(!state.collected);
    assert!(state.snapshot.is_none());
}

// ============================================================================
// Table maintenance
// ============================================================================

#[tokio::test]
async fn test_removed_file_is_forgotten() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"content", 1_000);
    ws.write_source("ignored.dat", b"content", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);

    poll(&mut detector, &ws).await;
    assert_eq!(detector.len(), 1);

    std::fs::remove_file(&path).unwrap();
    poll(&mut detector, &ws).await;
    assert!(detector.is_empty());
}

#[tokio::test]
async fn test_listing_failure_leaves_table_untouched() {
    let ws = TestWorkspace::new();
    ws.write_source("synop.txt", b"content", 1_000);
    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);
    poll(&mut detector, &ws).await;

    let pattern = compile_pattern("*").unwrap();
    let result = detector
        .scan(
            &ws.root().join("missing"),
            &pattern,
            None,
            &CancellationToken::new(),
        )
        .await;
    assert!(result.is_err());
    assert_eq!(detector.len(), 1);
}

#[tokio::test]
async fn test_restored_state_skips_already_forwarded_content() {
    let ws = TestWorkspace::new();
    let path = ws.write_source("synop.txt", b"0123456789ABC", 1_000);
    let state_path = ws.work_dir().join("collector_finfo.dat");

    save_states(
        &state_path,
        &[FileState::restored(&path, 10, crc_ccitt(b"0123456789"))],
    )
    .await
    .unwrap();

    let mut detector = ChangeDetector::new(ws.tmp_dir(), false);
    detector.restore(load_states(&state_path).await.unwrap());

    // Loaded entries carry the live mtime, so one poll marks them seen.
    assert!(!poll(&mut detector, &ws).await);
    assert!(poll(&mut detector, &ws).await);

    let data = detector.collect_all(&CancellationToken::new()).await;
    assert_eq!(data.len(), 1);
    assert_eq!(&data[0].bytes[..], b"ABC");
}
