//! Shared types must cross threads.

fn assert_sync_send<T: Sync + Send>() {}

#[test]
fn test_registry_types_are_sync_send() {
    assert_sync_send::<mimeo_core::Registry>();
    assert_sync_send::<mimeo_core::MimeEntry>();
    assert_sync_send::<mimeo_core::MediaType>();
    assert_sync_send::<mimeo_core::FilenamePattern>();
    assert_sync_send::<mimeo_core::Signature>();
}

#[test]
fn test_area_and_db_are_sync_send() {
    assert_sync_send::<mimeo_core::Area>();
    assert_sync_send::<mimeo_core::EntryCache>();
    assert_sync_send::<mimeo_core::MimeDb>();
}

#[test]
fn test_errors_are_sync_send() {
    assert_sync_send::<mimeo_core::MimeError>();
    assert_sync_send::<mimeo_core::ConfigError>();
}

#[test]
fn test_concurrent_lookups_share_entries() {
    use std::sync::Arc;

    let db = mimeo_core::MimeDb::new();
    let area = db.default_area();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let area = Arc::clone(&area);
            std::thread::spawn(move || area.resolve_path("song.ogg").map(|e| e.media_type()))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.iter().all(|r| r == &results[0]));
    assert!(results[0].is_some());
}
