//! Sync orchestration.
//!
//! The engine applies the configured strategy's copy-or-skip decision to a
//! batch of entries, dispatches uploads over a bounded worker pool, fires
//! the lifecycle hooks, and aggregates counts. Entries are independent:
//! one failure is recorded and the rest of the batch keeps going. `run`
//! returns only once every dispatched unit has finished.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::gzip;
use crate::store::ObjectStore;
use crate::strategy::{CopyDecision, HashStrategy};

/// One unit of work: a local file and the remote key it lands under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub local_path: PathBuf,
    pub remote_key: String,
}

impl FileEntry {
    pub fn new(local_path: impl Into<PathBuf>, remote_key: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
        }
    }
}

/// A per-entry failure recorded without aborting the batch
#[derive(Debug)]
pub struct EntryFailure {
    pub entry: FileEntry,
    pub error: SyncError,
}

/// Counts and failures aggregated across one run.
///
/// `copied_count` includes would-copies when the run was a dry run.
/// Failed entries appear in neither count.
#[derive(Debug)]
pub struct RunSummary {
    pub copied_count: usize,
    pub skipped_count: usize,
    pub failures: Vec<EntryFailure>,
    pub dry_run: bool,
    pub cancelled: bool,
}

impl RunSummary {
    /// True when every processed entry succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Caller-supplied observation points, invoked synchronously after the
/// corresponding lifecycle event. Callbacks run on worker tasks and must
/// not block; they cannot affect control flow.
pub trait SyncObserver: Send + Sync {
    /// A file was uploaded and its post-copy hook has run
    fn file_copied(&self, _entry: &FileEntry) {}

    /// A dry run decided this file would upload
    fn file_would_copy(&self, _entry: &FileEntry) {}

    /// A file was skipped and its skip hook has run
    fn file_skipped(&self, _entry: &FileEntry) {}
}

/// Cooperative cancellation shared between the caller and a running batch.
///
/// Cancelling stops new entries from dispatching; units already in flight
/// run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Applies copy-or-skip decisions to batches of entries and uploads what
/// needs uploading.
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
    strategy: Option<Arc<dyn HashStrategy>>,
    config: SyncConfig,
    observer: Option<Arc<dyn SyncObserver>>,
    cancel: CancelHandle,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        strategy: Arc<dyn HashStrategy>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            strategy: Some(strategy),
            config,
            observer: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Engine without a decision layer, for runs with the comparison
    /// disabled: every entry uploads unconditionally
    pub fn passthrough(store: Arc<dyn ObjectStore>, config: SyncConfig) -> Self {
        Self {
            store,
            strategy: None,
            config,
            observer: None,
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle the caller can use to request cancellation mid-run
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Process a batch to completion.
    ///
    /// Fatal configuration trouble (a missing strategy while the decision
    /// layer is enabled) aborts before any entry is touched. Everything
    /// per-entry lands in the summary's failure list instead.
    pub async fn run(&self, entries: Vec<FileEntry>) -> Result<RunSummary, SyncError> {
        let strategy = match (&self.strategy, self.config.enabled) {
            (Some(strategy), true) => Some(Arc::clone(strategy)),
            (None, true) => {
                return Err(SyncError::Configuration {
                    message: "no hash strategy selected".to_string(),
                })
            }
            // Disabled runs upload everything without consulting a
            // strategy, even when one was built
            (_, false) => None,
        };

        let ctx = Arc::new(RunContext {
            store: Arc::clone(&self.store),
            strategy,
            dry_run: self.config.dry_run,
            is_gzipped: self.config.is_gzipped,
            observer: self.observer.clone(),
            copied: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        });

        if entries.is_empty() {
            return Ok(self.summarize(&ctx));
        }

        let workers = self.config.effective_concurrency();

        if workers <= 1 {
            // Strictly sequential; no pool, no spawning
            for entry in entries {
                if self.cancel.is_cancelled() {
                    break;
                }
                ctx.process_entry(entry).await;
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut handles = Vec::with_capacity(entries.len());

            for entry in entries {
                if self.cancel.is_cancelled() {
                    break;
                }

                // Blocks dispatch once `workers` units are in flight
                let permit = semaphore.clone().acquire_owned().await;
                let ctx = Arc::clone(&ctx);
                let tracked = entry.clone();

                handles.push((
                    tracked,
                    tokio::spawn(async move {
                        let _permit = permit;
                        ctx.process_entry(entry).await;
                    }),
                ));
            }

            for (entry, handle) in handles {
                if let Err(e) = handle.await {
                    ctx.record_failure(EntryFailure {
                        error: SyncError::Transfer {
                            key: entry.remote_key.clone(),
                            reason: format!("worker panicked: {}", e),
                        },
                        entry,
                    });
                }
            }
        }

        Ok(self.summarize(&ctx))
    }

    fn summarize(&self, ctx: &RunContext) -> RunSummary {
        RunSummary {
            copied_count: ctx.copied.load(Ordering::SeqCst),
            skipped_count: ctx.skipped.load(Ordering::SeqCst),
            failures: ctx.take_failures(),
            dry_run: self.config.dry_run,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

/// Everything a worker needs, shared across units of one run
struct RunContext {
    store: Arc<dyn ObjectStore>,
    strategy: Option<Arc<dyn HashStrategy>>,
    dry_run: bool,
    is_gzipped: bool,
    observer: Option<Arc<dyn SyncObserver>>,
    copied: AtomicUsize,
    skipped: AtomicUsize,
    failures: Mutex<Vec<EntryFailure>>,
}

impl RunContext {
    /// Entry point for one unit of work; never lets an error escape past
    /// the failure list
    async fn process_entry(&self, entry: FileEntry) {
        if let Err(error) = self.sync_one(&entry).await {
            tracing::debug!(key = %entry.remote_key, error = %error, "entry failed");
            self.record_failure(EntryFailure { entry, error });
        }
    }

    async fn sync_one(&self, entry: &FileEntry) -> Result<(), SyncError> {
        let decision = match &self.strategy {
            Some(strategy) => {
                strategy
                    .should_copy_file(&entry.local_path, &entry.remote_key)
                    .await?
            }
            None => CopyDecision::Copy,
        };

        match decision {
            CopyDecision::Copy if self.dry_run => {
                tracing::debug!(key = %entry.remote_key, "would copy");
                self.copied.fetch_add(1, Ordering::SeqCst);
                if let Some(observer) = &self.observer {
                    observer.file_would_copy(entry);
                }
            }
            CopyDecision::Copy => {
                self.upload(entry).await?;
                self.copied.fetch_add(1, Ordering::SeqCst);

                if let Some(strategy) = &self.strategy {
                    if let Err(e) = strategy
                        .post_copy_hook(&entry.local_path, &entry.remote_key)
                        .await
                    {
                        // Hook trouble never rolls back a completed copy
                        tracing::warn!(key = %entry.remote_key, error = %e, "post-copy hook failed");
                    }
                }

                if let Some(observer) = &self.observer {
                    observer.file_copied(entry);
                }
            }
            CopyDecision::Skip => {
                if let Some(strategy) = &self.strategy {
                    strategy
                        .on_skip_hook(&entry.local_path, &entry.remote_key)
                        .await;
                }
                self.skipped.fetch_add(1, Ordering::SeqCst);

                if let Some(observer) = &self.observer {
                    observer.file_skipped(entry);
                }
            }
        }

        Ok(())
    }

    async fn upload(&self, entry: &FileEntry) -> Result<(), SyncError> {
        let data = tokio::fs::read(&entry.local_path)
            .await
            .map_err(|e| SyncError::local_read(e, "reading", entry.local_path.clone()))?;

        let data = if self.is_gzipped && gzip::is_compressible(&entry.local_path) {
            gzip::compress(&data)
                .map_err(|e| SyncError::local_read(e, "gzipping", entry.local_path.clone()))?
        } else {
            data
        };

        self.store.write_bytes(&entry.remote_key, data).await
    }

    fn record_failure(&self, failure: EntryFailure) {
        let mut failures = match self.failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        failures.push(failure);
    }

    fn take_failures(&self) -> Vec<EntryFailure> {
        let mut failures = match self.failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *failures)
    }
}
