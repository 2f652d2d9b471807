//! staticsync: hash-comparison uploads for static asset trees
//!
//! Uploads a local directory to S3, GCS, or a filesystem mirror, skipping
//! every file whose content the target already holds. The comparison
//! strategy, worker count, and lookup cache are all picked per run.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use staticsync::collect;
use staticsync::config::{
    CacheKind, FileConfig, StrategyKind, SyncConfig, SyncSection, TargetSection,
    DEFAULT_CONCURRENCY,
};
use staticsync::engine::{FileEntry, RunSummary, SyncEngine, SyncObserver};
use staticsync::error::SyncError;
use staticsync::store::{GcsStore, MirrorStore, ObjectStore, S3Store};
use staticsync::strategy::build_strategy;

#[derive(Parser)]
#[command(name = "staticsync")]
#[command(version)]
#[command(about = "Hash-comparison uploads for static asset trees")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a directory, skipping files the target already has
    Push(PushArgs),
}

#[derive(Args)]
struct PushArgs {
    /// Local directory to upload
    source: PathBuf,

    /// Comparison strategy (etag, metadata, mirror)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Number of parallel uploads
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Decide and report without uploading anything
    #[arg(long)]
    dry_run: bool,

    /// Upload everything without comparing hashes
    #[arg(long)]
    disable: bool,

    /// Gzip compressible files before hashing and upload
    #[arg(long)]
    gzip: bool,

    /// Prefix prepended to every remote key
    #[arg(short, long)]
    prefix: Option<String>,

    /// Lookup cache: none, memory, or a file path
    #[arg(long)]
    cache: Option<String>,

    /// TOML file with [sync] and [target] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target backend (s3, gcs, mirror)
    #[arg(long)]
    backend: Option<String>,

    /// Bucket name for the s3 and gcs backends
    #[arg(long)]
    bucket: Option<String>,

    /// Region for the s3 backend
    #[arg(long)]
    region: Option<String>,

    /// Custom endpoint for s3-compatible targets
    #[arg(long)]
    endpoint: Option<String>,

    /// Service account file for the gcs backend
    #[arg(long)]
    credential_file: Option<String>,

    /// Destination directory for the mirror backend
    #[arg(long)]
    mirror_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over the verbose flag
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Push(args) => run_push(args).await,
    };

    match result {
        Ok(summary) => {
            print_report(&summary);
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run_push(args: PushArgs) -> Result<RunSummary> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path).context("loading config file")?,
        None => FileConfig::default(),
    };

    let config = merge_config(&args, &file.sync)?;
    let store = build_store(&args, &file.target)?;
    tracing::info!(destination = %store.kind().display(), "syncing to target");

    let entries = collect::collect_entries(&args.source, config.key_prefix.as_deref())?;
    tracing::info!(count = entries.len(), "collected local files");

    let engine = if config.enabled {
        let strategy = build_strategy(
            config.strategy,
            &config.cache,
            Arc::clone(&store),
            config.is_gzipped,
        )?;
        SyncEngine::new(store, strategy, config)
    } else {
        SyncEngine::passthrough(store, config)
    };
    let engine = engine.with_observer(Arc::new(ConsoleReporter));

    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight uploads");
            cancel.cancel();
        }
    });

    Ok(engine.run(entries).await?)
}

/// Flags win over the config file; file values win over defaults
fn merge_config(args: &PushArgs, file: &SyncSection) -> Result<SyncConfig, SyncError> {
    let enabled = if args.disable {
        false
    } else {
        file.enabled.unwrap_or(true)
    };

    let strategy = match args.strategy.as_deref().or(file.strategy.as_deref()) {
        Some(name) => name.parse::<StrategyKind>()?,
        None if enabled => {
            return Err(SyncError::Configuration {
                message: "no strategy configured (pass --strategy or set sync.strategy)"
                    .to_string(),
            })
        }
        // Disabled runs never consult the strategy, so the choice does
        // not matter here
        None => StrategyKind::Etag,
    };

    let cache = match args.cache.as_deref().or(file.cache.as_deref()) {
        Some(name) => name.parse::<CacheKind>()?,
        None => CacheKind::Memory,
    };

    let mut config = SyncConfig::new(strategy);
    config.concurrency = args
        .concurrency
        .or(file.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    config.enabled = enabled;
    config.dry_run = args.dry_run;
    config.is_gzipped = args.gzip || file.gzip.unwrap_or(false);
    config.cache = cache;
    config.key_prefix = args.prefix.clone().or_else(|| file.key_prefix.clone());
    Ok(config)
}

fn build_store(args: &PushArgs, target: &TargetSection) -> Result<Arc<dyn ObjectStore>, SyncError> {
    let backend = args
        .backend
        .as_deref()
        .or(target.backend.as_deref())
        .ok_or_else(|| SyncError::Configuration {
            message: "no target backend configured (expected s3, gcs, or mirror)".to_string(),
        })?;

    match backend {
        "s3" => {
            let bucket = args
                .bucket
                .as_deref()
                .or(target.bucket.as_deref())
                .ok_or_else(|| SyncError::Configuration {
                    message: "s3 backend needs a bucket".to_string(),
                })?;
            let region = args
                .region
                .as_deref()
                .or(target.region.as_deref())
                .unwrap_or("us-east-1");
            let endpoint = args.endpoint.as_deref().or(target.endpoint.as_deref());
            Ok(Arc::new(S3Store::new(bucket, region, endpoint)?))
        }
        "gcs" => {
            let bucket = args
                .bucket
                .as_deref()
                .or(target.bucket.as_deref())
                .ok_or_else(|| SyncError::Configuration {
                    message: "gcs backend needs a bucket".to_string(),
                })?;
            let store = match args
                .credential_file
                .as_deref()
                .or(target.credential_file.as_deref())
            {
                Some(path) => GcsStore::from_service_account(bucket, path)?,
                None => GcsStore::new(bucket, None)?,
            };
            Ok(Arc::new(store))
        }
        "mirror" => {
            let root = args
                .mirror_root
                .clone()
                .or_else(|| target.mirror_root.clone())
                .ok_or_else(|| SyncError::Configuration {
                    message: "mirror backend needs a destination root".to_string(),
                })?;
            Ok(Arc::new(MirrorStore::new(root)))
        }
        other => Err(SyncError::Configuration {
            message: format!("unknown backend '{}' (expected s3, gcs, or mirror)", other),
        }),
    }
}

/// Prints the per-file dry-run lines; everything else stays on tracing
struct ConsoleReporter;

impl SyncObserver for ConsoleReporter {
    fn file_copied(&self, entry: &FileEntry) {
        tracing::debug!(key = %entry.remote_key, "copied");
    }

    fn file_would_copy(&self, entry: &FileEntry) {
        println!("Pretending to copy '{}'", entry.local_path.display());
    }

    fn file_skipped(&self, entry: &FileEntry) {
        tracing::debug!(key = %entry.remote_key, "skipped");
    }
}

/// One-line run total, `N static file(s) copied. M skipped.`
///
/// Dry runs use the same wording; the per-file "Pretending to copy" lines
/// are what marks the run as a rehearsal.
fn summary_line(summary: &RunSummary) -> String {
    let files = if summary.copied_count == 1 {
        "static file"
    } else {
        "static files"
    };
    format!(
        "{} {} copied. {} skipped.",
        summary.copied_count, files, summary.skipped_count
    )
}

fn print_report(summary: &RunSummary) {
    for failure in &summary.failures {
        eprintln!("{} {}", "failed:".red().bold(), failure.error);
    }

    let line = summary_line(summary);

    if summary.is_success() {
        println!("{}", line.green());
    } else {
        let failed = summary.failures.len();
        println!("{}", line.yellow());
        println!(
            "{}",
            format!(
                "{} upload{} failed.",
                failed,
                if failed == 1 { "" } else { "s" }
            )
            .red()
        );
    }

    if summary.cancelled {
        println!("{}", "Cancelled before all files were processed.".yellow());
    }
}
