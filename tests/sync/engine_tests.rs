// Engine tests: idempotence, concurrency equivalence, dry runs, failure
// isolation, and hook causality over the counting in-memory store

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::support::{write_tree, CountingObserver, MemoryStore};
use staticsync::config::{CacheKind, StrategyKind, SyncConfig};
use staticsync::digest::ContentHash;
use staticsync::engine::SyncEngine;
use staticsync::error::SyncError;
use staticsync::gzip;
use staticsync::strategy::{build_strategy, HashStrategy};

fn config(concurrency: usize) -> SyncConfig {
    let mut config = SyncConfig::new(StrategyKind::Etag);
    config.concurrency = concurrency;
    config.cache = CacheKind::None;
    config
}

fn etag_engine(store: &Arc<MemoryStore>, config: SyncConfig) -> SyncEngine {
    let strategy = build_strategy(
        StrategyKind::Etag,
        &CacheKind::None,
        store.clone(),
        config.is_gzipped,
    )
    .unwrap();
    SyncEngine::new(store.clone(), strategy, config)
}

#[tokio::test]
async fn test_first_run_copies_everything_second_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("css/site.css", b"body { margin: 0; }"),
        ("js/app.js", b"console.log(1);"),
        ("robots.txt", b"User-agent: *"),
    ];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let observer = Arc::new(CountingObserver::default());
    let engine = etag_engine(&store, config(1)).with_observer(observer.clone());

    let first = engine.run(entries.clone()).await.unwrap();
    assert_eq!(first.copied_count, 3);
    assert_eq!(first.skipped_count, 0);
    assert!(first.is_success());
    assert_eq!(store.object_count(), 3);

    let second = engine.run(entries).await.unwrap();
    assert_eq!(second.copied_count, 0);
    assert_eq!(second.skipped_count, 3);

    assert_eq!(observer.copied.load(Ordering::SeqCst), 3);
    assert_eq!(observer.skipped.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_only_changed_files_recopy() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("a.css", b"a { color: red; }"),
        ("b.css", b"b { color: blue; }"),
        ("c.css", b"c { color: green; }"),
    ];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let engine = etag_engine(&store, config(1));
    engine.run(entries.clone()).await.unwrap();

    std::fs::write(dir.path().join("b.css"), b"b { color: black; }").unwrap();

    let summary = engine.run(entries).await.unwrap();
    assert_eq!(summary.copied_count, 1);
    assert_eq!(summary.skipped_count, 2);
    assert_eq!(
        store.get("b.css"),
        Some(b"b { color: black; }".to_vec())
    );
}

#[tokio::test]
async fn test_concurrency_levels_agree_on_counts() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("one.css", b"1"),
        ("two.css", b"22"),
        ("three.css", b"333"),
        ("four.css", b"4444"),
        ("five.css", b"55555"),
    ];
    let entries = write_tree(dir.path(), files);

    let sequential_store = Arc::new(MemoryStore::new());
    let parallel_store = Arc::new(MemoryStore::new());
    let sequential = etag_engine(&sequential_store, config(1));
    let parallel = etag_engine(&parallel_store, config(16));

    let first_seq = sequential.run(entries.clone()).await.unwrap();
    let first_par = parallel.run(entries.clone()).await.unwrap();
    assert_eq!(first_seq.copied_count, first_par.copied_count);
    assert_eq!(first_seq.skipped_count, first_par.skipped_count);
    assert_eq!(sequential_store.object_count(), parallel_store.object_count());

    let second_seq = sequential.run(entries.clone()).await.unwrap();
    let second_par = parallel.run(entries).await.unwrap();
    assert_eq!(second_seq.copied_count, 0);
    assert_eq!(second_par.copied_count, 0);
    assert_eq!(second_seq.skipped_count, second_par.skipped_count);
}

#[tokio::test]
async fn test_dry_run_reports_without_uploading() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("a.css", b"a {}"),
        ("b.css", b"b {}"),
        ("c.css", b"c {}"),
    ];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let observer = Arc::new(CountingObserver::default());

    let mut dry = config(1);
    dry.dry_run = true;
    let dry_engine = etag_engine(&store, dry).with_observer(observer.clone());

    let pretended = dry_engine.run(entries.clone()).await.unwrap();
    assert!(pretended.dry_run);
    assert_eq!(pretended.copied_count, 3);
    assert_eq!(store.write_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.object_count(), 0);
    assert_eq!(observer.would_copy.load(Ordering::SeqCst), 3);
    assert_eq!(observer.copied.load(Ordering::SeqCst), 0);

    // The dry-run count matches what a real run then does
    let real = etag_engine(&store, config(1));
    let copied = real.run(entries.clone()).await.unwrap();
    assert_eq!(copied.copied_count, pretended.copied_count);

    let rerun = dry_engine.run(entries).await.unwrap();
    assert_eq!(rerun.copied_count, 0);
    assert_eq!(rerun.skipped_count, 3);
}

#[tokio::test]
async fn test_disabled_engine_never_probes_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[("a.css", b"a {}"), ("b.css", b"b {}")];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let mut disabled = config(1);
    disabled.enabled = false;
    let engine = SyncEngine::passthrough(store.clone(), disabled);

    for _ in 0..2 {
        let summary = engine.run(entries.clone()).await.unwrap();
        assert_eq!(summary.copied_count, 2);
        assert_eq!(summary.skipped_count, 0);
    }

    assert_eq!(store.metadata_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.write_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_failed_upload_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("a.css", b"a {}"),
        ("b.css", b"b {}"),
        ("c.css", b"c {}"),
    ];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    store.fail_writes_for("b.css");
    let engine = etag_engine(&store, config(1));

    let summary = engine.run(entries).await.unwrap();
    assert_eq!(summary.copied_count, 2);
    assert_eq!(summary.skipped_count, 0);
    assert!(!summary.is_success());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].entry.remote_key, "b.css");
    assert!(matches!(
        summary.failures[0].error,
        SyncError::Transfer { .. }
    ));

    assert!(store.get("a.css").is_some());
    assert!(store.get("c.css").is_some());
    assert!(store.get("b.css").is_none());
}

#[tokio::test]
async fn test_failed_lookup_is_recorded_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[("a.css", b"a {}"), ("b.css", b"b {}")];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    store.fail_lookups_for("b.css");
    let engine = etag_engine(&store, config(4));

    let summary = engine.run(entries).await.unwrap();
    assert_eq!(summary.copied_count, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(
        summary.failures[0].error,
        SyncError::RemoteLookup { .. }
    ));
}

#[tokio::test]
async fn test_gzipped_run_stores_compressed_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let css = b"body { margin: 0; padding: 0; }";
    let png = b"\x89PNG fake image bytes";
    let files: &[(&str, &[u8])] = &[("site.css", css), ("logo.png", png)];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let mut gzipped = config(1);
    gzipped.is_gzipped = true;
    let engine = etag_engine(&store, gzipped);

    let first = engine.run(entries.clone()).await.unwrap();
    assert_eq!(first.copied_count, 2);
    assert_eq!(store.get("site.css"), Some(gzip::compress(css).unwrap()));
    assert_eq!(store.get("logo.png"), Some(png.to_vec()));

    // Local hashing digests the same gzipped form, so the rerun skips
    let second = engine.run(entries).await.unwrap();
    assert_eq!(second.copied_count, 0);
    assert_eq!(second.skipped_count, 2);
}

#[tokio::test]
async fn test_memory_cache_answers_the_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("a.css", b"a {}"),
        ("b.css", b"b {}"),
        ("c.css", b"c {}"),
    ];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let strategy = build_strategy(
        StrategyKind::Etag,
        &CacheKind::Memory,
        store.clone(),
        false,
    )
    .unwrap();
    let engine = SyncEngine::new(store.clone(), strategy, config(1));

    let first = engine.run(entries.clone()).await.unwrap();
    assert_eq!(first.copied_count, 3);
    assert_eq!(store.metadata_calls.load(Ordering::SeqCst), 3);

    // Post-copy hooks populated the cache, so the rerun decides without
    // another probe
    let second = engine.run(entries).await.unwrap();
    assert_eq!(second.skipped_count, 3);
    assert_eq!(store.metadata_calls.load(Ordering::SeqCst), 3);
}

/// Delegating strategy that counts how often each hook fires
struct HookSpy {
    inner: Arc<dyn HashStrategy>,
    post_copies: AtomicUsize,
    skips: AtomicUsize,
}

#[async_trait]
impl HashStrategy for HookSpy {
    fn hashes_gzipped_content(&self) -> bool {
        self.inner.hashes_gzipped_content()
    }

    async fn get_remote_file_hash(
        &self,
        remote_key: &str,
    ) -> Result<Option<ContentHash>, SyncError> {
        self.inner.get_remote_file_hash(remote_key).await
    }

    async fn post_copy_hook(&self, local_path: &Path, remote_key: &str) -> Result<(), SyncError> {
        self.post_copies.fetch_add(1, Ordering::SeqCst);
        self.inner.post_copy_hook(local_path, remote_key).await
    }

    async fn on_skip_hook(&self, local_path: &Path, remote_key: &str) {
        self.skips.fetch_add(1, Ordering::SeqCst);
        self.inner.on_skip_hook(local_path, remote_key).await;
    }
}

#[tokio::test]
async fn test_hooks_fire_exactly_once_per_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &[u8])] = &[("site.css", b"body {}")];
    let entries = write_tree(dir.path(), files);

    let store = Arc::new(MemoryStore::new());
    let inner =
        build_strategy(StrategyKind::Etag, &CacheKind::None, store.clone(), false).unwrap();
    let spy = Arc::new(HookSpy {
        inner,
        post_copies: AtomicUsize::new(0),
        skips: AtomicUsize::new(0),
    });
    let engine = SyncEngine::new(store.clone(), spy.clone(), config(1));

    let first = engine.run(entries.clone()).await.unwrap();
    assert_eq!(first.copied_count, 1);
    assert_eq!(spy.post_copies.load(Ordering::SeqCst), 1);
    assert_eq!(spy.skips.load(Ordering::SeqCst), 0);

    let second = engine.run(entries).await.unwrap();
    assert_eq!(second.skipped_count, 1);
    assert_eq!(spy.post_copies.load(Ordering::SeqCst), 1);
    assert_eq!(spy.skips.load(Ordering::SeqCst), 1);
}
