// Strategy decision tests over the counting in-memory store

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::support::MemoryStore;
use staticsync::error::SyncError;
use staticsync::gzip;
use staticsync::strategy::{CopyDecision, EtagStrategy, HashStrategy, MetadataStrategy};

fn scratch_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[tokio::test]
async fn test_absent_remote_object_decides_copy() {
    let dir = tempfile::tempdir().unwrap();
    let local = scratch_file(dir.path(), "site.css", b"body { color: red; }");

    let store = Arc::new(MemoryStore::new());
    let strategy = EtagStrategy::new(store.clone(), false);

    let decision = strategy.should_copy_file(&local, "site.css").await.unwrap();
    assert_eq!(decision, CopyDecision::Copy);
    assert_eq!(store.metadata_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_equal_etag_decides_skip() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"hello world";
    let local = scratch_file(dir.path(), "greeting.txt", data);

    let store = Arc::new(MemoryStore::new());
    store.insert_plain("greeting.txt", data);
    let strategy = EtagStrategy::new(store.clone(), false);

    let decision = strategy
        .should_copy_file(&local, "greeting.txt")
        .await
        .unwrap();
    assert_eq!(decision, CopyDecision::Skip);
}

#[tokio::test]
async fn test_changed_content_decides_copy() {
    let dir = tempfile::tempdir().unwrap();
    let local = scratch_file(dir.path(), "app.js", b"console.log(2);");

    let store = Arc::new(MemoryStore::new());
    store.insert_plain("app.js", b"console.log(1);");
    let strategy = EtagStrategy::new(store.clone(), false);

    let decision = strategy.should_copy_file(&local, "app.js").await.unwrap();
    assert_eq!(decision, CopyDecision::Copy);
}

#[tokio::test]
async fn test_multipart_etag_never_matches() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"test content";
    let local = scratch_file(dir.path(), "app.js", data);

    // Composite multipart tags carry a part-count suffix and are not a
    // content md5, so the file re-uploads even with identical bytes
    let store = Arc::new(MemoryStore::new());
    store.insert_with(
        "app.js",
        data,
        Some("\"9473fdd0d880a43c21b7778d34872157-2\""),
        None,
    );
    let strategy = EtagStrategy::new(store.clone(), false);

    let decision = strategy.should_copy_file(&local, "app.js").await.unwrap();
    assert_eq!(decision, CopyDecision::Copy);
}

#[tokio::test]
async fn test_equal_content_md5_metadata_decides_skip() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"hello world";
    let local = scratch_file(dir.path(), "greeting.txt", data);

    let store = Arc::new(MemoryStore::new());
    store.insert_plain("greeting.txt", data);
    let strategy = MetadataStrategy::new(store.clone(), false);

    let decision = strategy
        .should_copy_file(&local, "greeting.txt")
        .await
        .unwrap();
    assert_eq!(decision, CopyDecision::Skip);
}

#[tokio::test]
async fn test_object_without_recorded_md5_recopies() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"hello world";
    let local = scratch_file(dir.path(), "greeting.txt", data);

    let store = Arc::new(MemoryStore::new());
    store.insert_with("greeting.txt", data, Some("\"whatever\""), None);
    let strategy = MetadataStrategy::new(store.clone(), false);

    let remote = strategy.get_remote_file_hash("greeting.txt").await.unwrap();
    assert!(remote.is_none());

    let decision = strategy
        .should_copy_file(&local, "greeting.txt")
        .await
        .unwrap();
    assert_eq!(decision, CopyDecision::Copy);
}

#[tokio::test]
async fn test_malformed_content_md5_is_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let local = scratch_file(dir.path(), "greeting.txt", b"hello world");

    let store = Arc::new(MemoryStore::new());
    store.insert_with("greeting.txt", b"hello world", None, Some("%%%not base64%%%"));
    let strategy = MetadataStrategy::new(store.clone(), false);

    let err = strategy
        .should_copy_file(&local, "greeting.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteLookup { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_transport_failure_is_error_not_copy() {
    let dir = tempfile::tempdir().unwrap();
    let local = scratch_file(dir.path(), "site.css", b"body {}");

    // A failed probe must surface, never be mistaken for an absent object
    let store = Arc::new(MemoryStore::new());
    store.fail_lookups_for("site.css");
    let strategy = EtagStrategy::new(store.clone(), false);

    let err = strategy
        .should_copy_file(&local, "site.css")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteLookup { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_gzip_aware_hashing_matches_compressed_remote() {
    let dir = tempfile::tempdir().unwrap();
    let css = b"body { margin: 0; }";
    let png = b"\x89PNG fake image bytes";
    let local_css = scratch_file(dir.path(), "site.css", css);
    let local_png = scratch_file(dir.path(), "logo.png", png);

    // The remote holds the gzipped css, exactly what an upload with
    // compression enabled would have stored
    let store = Arc::new(MemoryStore::new());
    store.insert_plain("site.css", &gzip::compress(css).unwrap());
    store.insert_plain("logo.png", png);
    let strategy = EtagStrategy::new(store.clone(), true);

    let css_decision = strategy
        .should_copy_file(&local_css, "site.css")
        .await
        .unwrap();
    assert_eq!(css_decision, CopyDecision::Skip);

    // Non-compressible extensions hash their raw bytes even with
    // compression enabled
    let png_decision = strategy
        .should_copy_file(&local_png, "logo.png")
        .await
        .unwrap();
    assert_eq!(png_decision, CopyDecision::Skip);
}
